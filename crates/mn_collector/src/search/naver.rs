use async_trait::async_trait;
use mn_core::config::MAX_PAGE_SIZE;
use mn_core::{ArticleCandidate, Error, NaverConfig, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use super::utils::{published_at_or_now, strip_markup};
use super::NewsSearch;

const SOURCE_LABEL: &str = "네이버뉴스";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: String,
    #[serde(default, rename = "pubDate")]
    pub_date: String,
}

impl SearchItem {
    fn into_candidate(self, source: &str) -> ArticleCandidate {
        ArticleCandidate {
            title: strip_markup(&self.title),
            description: strip_markup(&self.description),
            url: self.link,
            source: source.to_string(),
            published_at: published_at_or_now(&self.pub_date),
        }
    }
}

/// Client for the Naver news search API, sorted by date.
pub struct NaverNewsClient {
    client: Client,
    config: NaverConfig,
}

impl NaverNewsClient {
    pub fn new(config: NaverConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Fetches one page, surfacing failures as errors.
    pub async fn search(&self, query: &str, display: u32, start: u32) -> Result<Vec<ArticleCandidate>> {
        let display = display.clamp(1, MAX_PAGE_SIZE);
        let start = start.max(1);

        let response = self
            .client
            .get(&self.config.base_url)
            .header("X-Naver-Client-Id", &self.config.client_id)
            .header("X-Naver-Client-Secret", &self.config.client_secret)
            .query(&[
                ("query", query.to_string()),
                ("display", display.to_string()),
                ("start", start.to_string()),
                ("sort", "date".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let page: SearchResponse = response.json().await?;
        Ok(page
            .items
            .into_iter()
            .map(|item| item.into_candidate(SOURCE_LABEL))
            .collect())
    }
}

impl fmt::Debug for NaverNewsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaverNewsClient")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl NewsSearch for NaverNewsClient {
    fn source(&self) -> &str {
        SOURCE_LABEL
    }

    async fn fetch(&self, query: &str, page_size: u32, start: u32) -> Vec<ArticleCandidate> {
        match self.search(query, page_size, start).await {
            Ok(candidates) => {
                debug!("🔍 '{}' start={} returned {} items", query, start, candidates.len());
                candidates
            }
            Err(e) => {
                warn!("⚠️ Search for '{}' (start={}) failed: {}", query, start, e);
                Vec::new()
            }
        }
    }
}
