use async_trait::async_trait;
use mn_core::config::MAX_PAGE_SIZE;
use mn_core::ArticleCandidate;
use std::collections::HashSet;
use tracing::info;

pub mod naver;

pub use naver::NaverNewsClient;

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Label recorded as the source of every candidate
    fn source(&self) -> &str;

    /// One page of results for `query`, newest first.
    ///
    /// Transport and upstream failures are logged and come back as an empty
    /// page, so callers cannot tell them apart from the end of the results.
    async fn fetch(&self, query: &str, page_size: u32, start: u32) -> Vec<ArticleCandidate>;
}

/// Fetches the first page of every query with an even share of
/// `max_articles`, stopping once the budget is reached. Results are
/// deduplicated by URL, keeping the first occurrence.
pub async fn collect_bounded(
    search: &dyn NewsSearch,
    queries: &[String],
    max_articles: usize,
) -> Vec<ArticleCandidate> {
    if max_articles == 0 || queries.is_empty() {
        return Vec::new();
    }

    let per_query = (max_articles / queries.len()).clamp(1, MAX_PAGE_SIZE as usize) as u32;
    let mut collected: Vec<ArticleCandidate> = Vec::new();

    for query in queries {
        let page = search.fetch(query, per_query, 1).await;
        collected.extend(page);
        if collected.len() >= max_articles {
            break;
        }
    }

    let total = collected.len();
    let mut seen = HashSet::new();
    collected.retain(|candidate| seen.insert(candidate.url.clone()));
    collected.truncate(max_articles);

    info!(
        "📰 Collected {} articles ({} before URL dedup) from {}",
        collected.len(),
        total,
        search.source()
    );
    collected
}

/// Text normalization shared by search backends
pub(crate) mod utils {
    use chrono::{DateTime, Utc};
    use lazy_static::lazy_static;
    use regex::Regex;
    use tracing::warn;

    lazy_static! {
        static ref TAG_RE: Regex = Regex::new(r"<.*?>").unwrap();
    }

    /// Best-effort tag removal followed by decoding of the handful of entities
    /// the upstream emits. Malformed or nested markup can leave fragments behind.
    pub fn strip_markup(text: &str) -> String {
        let stripped = TAG_RE.replace_all(text, "");
        if !stripped.contains('&') {
            return stripped.into_owned();
        }
        stripped
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
    }

    /// Parses an RFC 2822 date such as `Mon, 21 Jan 2025 12:00:00 +0900`.
    /// The weekday token is ignored.
    pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        let without_weekday = match raw.split_once(',') {
            Some((_, rest)) => rest.trim(),
            None => raw,
        };
        DateTime::parse_from_rfc2822(without_weekday)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Falls back to the current time when the date cannot be parsed. The
    /// substitute skews recency for that article.
    pub fn published_at_or_now(raw: &str) -> DateTime<Utc> {
        parse_pub_date(raw).unwrap_or_else(|| {
            warn!("⚠️ Failed to parse publication date {:?}, using current time", raw);
            Utc::now()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::utils;
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn candidate(url: &str, title: &str) -> ArticleCandidate {
        ArticleCandidate {
            title: title.to_string(),
            description: String::new(),
            url: url.to_string(),
            source: "test".to_string(),
            published_at: Utc::now(),
        }
    }

    /// Serves pre-scripted pages keyed by (query, start) and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedSearch {
        pages: HashMap<(String, u32), Vec<ArticleCandidate>>,
        requests: Mutex<Vec<(String, u32, u32)>>,
    }

    impl ScriptedSearch {
        pub(crate) fn with_page(mut self, query: &str, start: u32, page: Vec<ArticleCandidate>) -> Self {
            self.pages.insert((query.to_string(), start), page);
            self
        }

        pub(crate) fn requests(&self) -> Vec<(String, u32, u32)> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn starts_for(&self, query: &str) -> Vec<u32> {
            self.requests()
                .into_iter()
                .filter(|(q, _, _)| q == query)
                .map(|(_, _, start)| start)
                .collect()
        }
    }

    #[async_trait]
    impl NewsSearch for ScriptedSearch {
        fn source(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self, query: &str, page_size: u32, start: u32) -> Vec<ArticleCandidate> {
            self.requests
                .lock()
                .unwrap()
                .push((query.to_string(), page_size, start));
            self.pages
                .get(&(query.to_string(), start))
                .cloned()
                .unwrap_or_default()
        }
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(|q| q.to_string()).collect()
    }

    fn page(prefix: &str, n: usize) -> Vec<ArticleCandidate> {
        (0..n)
            .map(|i| candidate(&format!("https://news.example.com/{}/{}", prefix, i), "병원"))
            .collect()
    }

    #[tokio::test]
    async fn test_budget_is_split_evenly() {
        let search = ScriptedSearch::default()
            .with_page("의료", 1, page("a", 2))
            .with_page("병원", 1, page("b", 2));

        let collected =
            collect_bounded(&search, &queries(&["의료", "병원", "건강", "질병"]), 10).await;

        assert_eq!(collected.len(), 4);
        let sizes: Vec<u32> = search.requests().iter().map(|(_, size, _)| *size).collect();
        assert_eq!(sizes, vec![2, 2, 2, 2]);
    }

    #[tokio::test]
    async fn test_page_size_is_capped() {
        let search = ScriptedSearch::default();
        collect_bounded(&search, &queries(&["의료"]), 500).await;
        assert_eq!(search.requests(), vec![("의료".to_string(), 100, 1)]);

        let search = ScriptedSearch::default();
        collect_bounded(&search, &queries(&["의료", "병원", "건강"]), 2).await;
        assert!(search.requests().iter().all(|(_, size, _)| *size == 1));
    }

    #[tokio::test]
    async fn test_stops_once_budget_reached() {
        let search = ScriptedSearch::default()
            .with_page("의료", 1, page("a", 5))
            .with_page("병원", 1, page("b", 5))
            .with_page("건강", 1, page("c", 5));

        let collected = collect_bounded(&search, &queries(&["의료", "병원", "건강"]), 8).await;

        assert_eq!(search.requests().len(), 2);
        assert_eq!(collected.len(), 8);
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_occurrence() {
        let search = ScriptedSearch::default()
            .with_page(
                "의료",
                1,
                vec![candidate("u1", "first"), candidate("u2", "two")],
            )
            .with_page(
                "병원",
                1,
                vec![candidate("u1", "second"), candidate("u3", "three")],
            );

        let collected = collect_bounded(&search, &queries(&["의료", "병원"]), 100).await;

        let urls: Vec<&str> = collected.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["u1", "u2", "u3"]);
        assert_eq!(collected[0].title, "first");
    }

    #[tokio::test]
    async fn test_zero_budget_fetches_nothing() {
        let search = ScriptedSearch::default();
        assert!(collect_bounded(&search, &queries(&["의료"]), 0).await.is_empty());
        assert!(collect_bounded(&search, &[], 10).await.is_empty());
        assert!(search.requests().is_empty());
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(utils::strip_markup("<b>서울대병원</b> 암 치료"), "서울대병원 암 치료");
        assert_eq!(
            utils::strip_markup("&quot;신약&quot; 승인 &amp; 출시"),
            "\"신약\" 승인 & 출시"
        );
        assert_eq!(utils::strip_markup("plain"), "plain");
        // Entities are decoded after tag removal, so escaped markup survives as text.
        assert_eq!(utils::strip_markup("&lt;b&gt;x&lt;/b&gt;"), "<b>x</b>");
        // Unclosed tags are left alone.
        assert_eq!(utils::strip_markup("a < b <i"), "a < b <i");
    }

    #[test]
    fn test_parse_pub_date() {
        let parsed = utils::parse_pub_date("Tue, 21 Jan 2025 12:00:00 +0900").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 21, 3, 0, 0).unwrap());

        // Inconsistent weekday is tolerated.
        let parsed = utils::parse_pub_date("Mon, 21 Jan 2025 12:00:00 +0900").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 21, 3, 0, 0).unwrap());

        assert!(utils::parse_pub_date("yesterday").is_none());
        assert!(utils::parse_pub_date("").is_none());
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        let before = Utc::now();
        let published = utils::published_at_or_now("not a date");
        let after = Utc::now();
        assert!(before <= published && published <= after);
    }
}
