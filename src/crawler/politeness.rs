//! Per-host request spacing shared by every crawl session of a run

use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{Instrument, debug_span};
use url::Url;

/// Keyed rate limiter allowing one request per host per period
///
/// Sessions for different seeds may target the same host; the limiter keeps
/// their combined request rate at or below one request per `min_spacing`.
#[derive(Clone)]
pub struct HostLimiter {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl HostLimiter {
    /// Limit every host to one request per `min_spacing`; a zero spacing disables limiting
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            limiter: Quota::with_period(min_spacing).map(|quota| Arc::new(RateLimiter::keyed(quota))),
        }
    }

    /// Wait until a request to the host of `url` is permitted
    pub async fn until_ready(&self, url: &Url) {
        let (Some(limiter), Some(host)) = (&self.limiter, url.host_str()) else {
            return;
        };
        let key = host.to_ascii_lowercase();
        limiter
            .until_key_ready(&key)
            .instrument(debug_span!("host_limiter", host = %key))
            .await;
    }
}

impl std::fmt::Debug for HostLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostLimiter")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}
