use std::path::Path;
use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{MetricExporter, SpanExporter};
use opentelemetry_sdk::{Resource, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_opentelemetry::MetricsLayer;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

const SERVICE_NAME: &str = "campus-kb";

fn get_resource() -> Resource {
    static RESOURCE: OnceLock<Resource> = OnceLock::new();
    RESOURCE
        .get_or_init(|| Resource::builder().with_service_name(SERVICE_NAME).build())
        .clone()
}

fn init_traces() -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder().with_http().build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

fn init_metrics() -> anyhow::Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder().with_http().build()?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

// `RUST_LOG` when set, `info` otherwise
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// Logs go to stderr and, with `log_dir`, to a daily rolling file. Traces and
/// metrics are exported over OTLP only when `OTEL_EXPORTER_OTLP_ENDPOINT` is
/// set. Keep the returned guard alive until the program exits.
pub fn init_tracing_subscriber(log_dir: Option<&Path>) -> anyhow::Result<OtelGuard> {
    let providers = if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        Some((init_traces()?, init_metrics()?))
    } else {
        None
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", SERVICE_NAME));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Exporters talk HTTP through reqwest/hyper; keep their own events out of
    // the export pipeline.
    let otel_filter = || {
        let base = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(format!("{},hyper=off,reqwest=off,opentelemetry=off", base))
    };
    let metrics_layer = providers
        .as_ref()
        .map(|(_, meter_provider)| MetricsLayer::new(meter_provider.clone()).with_filter(otel_filter()));
    let trace_layer = providers.as_ref().map(|(tracer_provider, _)| {
        OpenTelemetryLayer::new(tracer_provider.tracer(SERVICE_NAME)).with_filter(otel_filter())
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(metrics_layer)
        .with(trace_layer)
        .try_init()?;

    Ok(OtelGuard {
        providers,
        _file_guard: file_guard,
    })
}

pub struct OtelGuard {
    providers: Option<(SdkTracerProvider, SdkMeterProvider)>,
    _file_guard: Option<WorkerGuard>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some((tracer_provider, meter_provider)) = self.providers.take() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}
