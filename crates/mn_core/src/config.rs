use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::types::Category;
use crate::{Error, Result};

pub const NAVER_NEWS_URL: &str = "https://openapi.naver.com/v1/search/news.json";

/// Upstream limits: at most 100 items per request, `start` at most 1000.
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_START: u32 = 1000;

const MEDICAL_KEYWORDS: &[&str] = &[
    "의료", "병원", "의사", "간호사", "환자", "질병", "치료", "약", "수술", "건강", "보건",
    "코로나", "COVID", "백신", "진료", "암", "당뇨", "고혈압", "의학", "한의학", "약국", "제약",
    "신약", "임상", "진단", "검사", "의료기기",
];

const CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (
        Category::ProviderDispute,
        &[
            "의정갈등", "의사파업", "의료파업", "전공의", "레지던트", "의대증원", "의료계", "의협",
            "대한의사협회", "집단휴진", "수련병원",
        ],
    ),
    (
        Category::Hospital,
        &["병원", "의원", "요양", "진료", "의사", "간호사", "응급실", "입원"],
    ),
    (
        Category::Pharma,
        &["제약", "신약", "약", "의약품", "바이오", "임상", "임상시험"],
    ),
    (
        Category::Policy,
        &["보건복지부", "의료정책", "건강보험", "의료법", "의료개혁", "복지부"],
    ),
    (
        Category::Disease,
        &["질병", "암", "당뇨", "고혈압", "코로나", "COVID", "감염", "바이러스", "독감"],
    ),
    (
        Category::Research,
        &["연구", "논문", "학회", "의학", "의료기술", "진단", "치료법"],
    ),
];

const DEFAULT_QUERIES: &[&str] = &["의료", "병원", "건강", "질병", "치료", "신약"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Keyword tables for the classifier. Category order is significant: the
/// first category reached wins a tie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub medical_keywords: Vec<String>,
    pub categories: Vec<CategoryKeywords>,
    #[serde(default = "default_fallback")]
    pub fallback: Category,
}

fn default_fallback() -> Category {
    Category::Other
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            medical_keywords: strings(MEDICAL_KEYWORDS),
            categories: CATEGORY_TABLE
                .iter()
                .map(|(category, keywords)| CategoryKeywords {
                    category: *category,
                    keywords: strings(keywords),
                })
                .collect(),
            fallback: default_fallback(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.medical_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(Error::Config("empty medical keyword".to_string()));
        }
        let mut seen = HashSet::new();
        for entry in &self.categories {
            if !seen.insert(entry.category) {
                return Err(Error::Config(format!(
                    "category {} listed twice",
                    entry.category.slug()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// One request per query in live mode.
    pub live_queries: Vec<String>,
    pub backfill_queries: Vec<String>,
    pub max_articles: usize,
    pub page_size: u32,
    /// Highest `start` offset the upstream accepts.
    pub max_start: u32,
    /// Pause between backfill pages.
    pub page_delay: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            live_queries: strings(DEFAULT_QUERIES),
            backfill_queries: strings(DEFAULT_QUERIES),
            max_articles: 100,
            page_size: MAX_PAGE_SIZE,
            max_start: MAX_START,
            page_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
pub struct NaverConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl NaverConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let config = Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: NAVER_NEWS_URL.to_string(),
        };
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(Error::Config(
                "NAVER_CLIENT_ID and NAVER_CLIENT_SECRET must both be set".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;
        self.base_url = url.to_string();
        Ok(self)
    }
}

impl std::fmt::Debug for NaverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NaverConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_table_order() {
        let config = ClassifierConfig::default();
        assert_eq!(config.medical_keywords.len(), 27);
        let order: Vec<Category> = config.categories.iter().map(|c| c.category).collect();
        assert_eq!(
            order,
            vec![
                Category::ProviderDispute,
                Category::Hospital,
                Category::Pharma,
                Category::Policy,
                Category::Disease,
                Category::Research,
            ]
        );
        assert_eq!(config.fallback, Category::Other);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trips_through_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        let json = r#"{
            "medical_keywords": ["병원", "암"],
            "categories": [
                { "category": "disease", "keywords": ["암"] },
                { "category": "hospital", "keywords": ["병원"] }
            ]
        }"#;
        std::fs::write(&path, json).unwrap();

        let config = ClassifierConfig::from_json_file(&path).unwrap();
        assert_eq!(config.medical_keywords, vec!["병원", "암"]);
        assert_eq!(config.categories[0].category, Category::Disease);
        assert_eq!(config.fallback, Category::Other);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let mut config = ClassifierConfig::default();
        config.categories.push(CategoryKeywords {
            category: Category::Pharma,
            keywords: vec!["약".to_string()],
        });
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_naver_config_validation() {
        assert!(NaverConfig::new("", "secret").is_err());
        let config = NaverConfig::new("id", "secret").unwrap();
        assert_eq!(config.base_url, NAVER_NEWS_URL);
        assert!(config.clone().with_base_url("not a url").is_err());
        let local = config.with_base_url("http://127.0.0.1:9999/v1/search/news.json").unwrap();
        assert_eq!(local.base_url, "http://127.0.0.1:9999/v1/search/news.json");
        assert!(!format!("{:?}", local).contains("\"secret\""));
    }
}
