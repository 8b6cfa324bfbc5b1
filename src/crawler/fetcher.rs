//! Single bounded-time HTTP GET used by the crawler and the PDF pipeline

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;

use crate::crawler::error::FetchError;

/// Receiving side of a cancellation flag; `true` means stop
pub type CancelSignal = watch::Receiver<bool>;

/// Create a cancellation sender and the signal handed to fetchers
pub fn cancel_channel() -> (watch::Sender<bool>, CancelSignal) {
    watch::channel(false)
}

/// HTTP fetcher with a fixed timeout and user agent
///
/// The fetcher never retries; every failure is returned to the caller as a
/// [`FetchError`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    cancel: Option<CancelSignal>,
}

impl Fetcher {
    /// Create a fetcher sending `user_agent` and giving up after `timeout`
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cancel: None,
        })
    }

    /// Abort in-flight and future fetches once `cancel` flips to `true`
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fetch the raw body of `url`
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        if self.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let request = async {
            let response = self.client.get(parsed).send().await?.error_for_status()?;
            let body = response.bytes().await?;
            Ok::<_, FetchError>(body.to_vec())
        };

        let body = match &self.cancel {
            Some(cancel) => {
                let mut cancel = cancel.clone();
                tokio::select! {
                    result = request => result?,
                    _ = wait_for_cancel(&mut cancel) => return Err(FetchError::Cancelled),
                }
            }
            None => request.await?,
        };

        debug!("Fetched {} bytes", body.len());
        Ok(body)
    }

    /// Fetch `url` and decode the body as UTF-8, replacing invalid sequences
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

async fn wait_for_cancel(cancel: &mut CancelSignal) {
    // A dropped sender can never cancel.
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new("test-agent", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_text_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", "test-agent")
            .with_status(200)
            .with_body("<html><body>hello</body></html>")
            .create_async()
            .await;

        let body = fetcher()
            .fetch_text(&format!("{}/page", server.url()))
            .await
            .unwrap();

        assert!(body.contains("hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_typed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let result = fetcher()
            .fetch_bytes(&format!("{}/missing", server.url()))
            .await;

        assert!(matches!(result, Err(FetchError::Status(404))));
    }

    #[tokio::test]
    async fn test_invalid_urls_are_rejected() {
        let fetcher = fetcher();
        assert!(matches!(
            fetcher.fetch_bytes("not a url").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch_bytes("ftp://example.com/file").await,
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_fetcher_does_not_send() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let (tx, rx) = cancel_channel();
        let fetcher = fetcher().with_cancel(rx);
        tx.send(true).unwrap();

        let result = fetcher.fetch_bytes(&format!("{}/page", server.url())).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_aborts_request_in_flight() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/slow")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(b"too late")
            })
            .create_async()
            .await;

        let (tx, rx) = cancel_channel();
        let fetcher = fetcher().with_cancel(rx);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let start = std::time::Instant::now();
        let result = fetcher.fetch_bytes(&format!("{}/slow", server.url())).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
