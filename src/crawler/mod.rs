//! Documentation site crawler
//!
//! Breadth-first crawl of a documentation site starting from one URL.
//! Each page contributes a `### Page: <url>` block of readable text to a
//! single accumulated document, which downstream summarization treats as
//! the site's content. The crawl stays on the start URL's origin and
//! prefers links whose paths look like documentation.

mod content;
mod fetch;
mod links;

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::text::truncate_chars;

pub use fetch::{PageFetcher, USER_AGENT};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid start URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Crawl limits and timeouts.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of pages attempted (failed fetches count too).
    pub max_pages: usize,
    /// Character cap on the accumulated document.
    pub max_content_len: usize,
    /// Pages with this much readable text or less are skipped.
    pub min_page_text_len: usize,
    /// How many documentation-looking links each page may enqueue.
    pub priority_fanout: usize,
    /// How many other same-origin links each page may enqueue.
    pub other_fanout: usize,
    /// Per-page fetch timeout.
    pub fetch_timeout: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_content_len: 50_000,
            min_page_text_len: 200,
            priority_fanout: 20,
            other_fanout: 5,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Breadth-first documentation crawler.
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: PageFetcher,
}

impl Crawler {
    pub fn new(config: CrawlerConfig) -> Self {
        let fetcher = PageFetcher::new(config.fetch_timeout);
        Self { config, fetcher }
    }

    /// Crawl a site and return the accumulated document text.
    ///
    /// A URL is marked visited before it is fetched, so a page is never
    /// attempted twice even when many pages link to it. Fetch and parse
    /// failures skip the page without aborting the crawl; callers decide
    /// whether the accumulated text is substantial enough to use.
    pub async fn crawl(&self, start_url: &str) -> Result<String, CrawlError> {
        let base = Url::parse(start_url)?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(start_url.to_string());

        let mut content = String::new();

        while let Some(url) = queue.pop_front() {
            if visited.len() >= self.config.max_pages {
                break;
            }
            if !visited.insert(url.clone()) {
                continue;
            }

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(err) => {
                    debug!(url = %url, error = %err, "skipping page");
                    continue;
                }
            };

            let text = content::extract_text(&html);
            if text.chars().count() > self.config.min_page_text_len {
                content.push_str(&format!("\n\n### Page: {}\n{}\n", url, text));
            }

            // Thin pages still contribute their links.
            let (priority, other): (Vec<_>, Vec<_>) = links::extract_links(&html, &base)
                .into_iter()
                .filter(|link| !visited.contains(link))
                .partition(|link| links::is_priority(link));

            queue.extend(priority.into_iter().take(self.config.priority_fanout));
            queue.extend(other.into_iter().take(self.config.other_fanout));
        }

        let content = truncate_chars(&content, self.config.max_content_len).to_string();
        info!(
            pages = visited.len(),
            chars = content.chars().count(),
            "crawl finished"
        );

        Ok(content)
    }
}
