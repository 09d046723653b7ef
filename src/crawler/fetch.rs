//! Page fetching for the crawler

use std::time::Duration;

use reqwest::Client;

use super::CrawlError;

/// User agent announced to crawled sites.
pub const USER_AGENT: &str = "DocScoutBot/1.0";

/// HTTP client wrapper used by the crawler.
///
/// Keeps its own reqwest client so the per-page fetch timeout stays
/// independent from the much longer LLM completion timeout.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Fetch a page and return its HTML body.
    ///
    /// Any non-2xx status is an error; the crawler treats those pages
    /// the same as network failures and moves on.
    pub async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("<html><body>hello</body></html>")
            .create_async()
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5));
        let html = fetcher.fetch(&format!("{}/page", server.url())).await.unwrap();
        assert!(html.contains("hello"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5));
        let err = fetcher
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Status { status: 404, .. }));
    }
}
