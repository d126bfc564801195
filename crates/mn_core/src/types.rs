use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A normalized, unclassified search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleCandidate {
    pub title: String,
    pub description: String,
    /// Identity key for deduplication.
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// Medical categories, in no particular order. Tie-break order lives in the
/// classifier's keyword table, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Disputes between the medical profession and government (의정갈등).
    ProviderDispute,
    Hospital,
    Pharma,
    Policy,
    Disease,
    Research,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::ProviderDispute,
        Category::Hospital,
        Category::Pharma,
        Category::Policy,
        Category::Disease,
        Category::Research,
        Category::Other,
    ];

    /// Label used for display and persistence.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ProviderDispute => "의정갈등",
            Category::Hospital => "병원",
            Category::Pharma => "제약",
            Category::Policy => "정책",
            Category::Disease => "질병",
            Category::Research => "연구",
            Category::Other => "기타",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Category::ProviderDispute => "provider-dispute",
            Category::Hospital => "hospital",
            Category::Pharma => "pharma",
            Category::Policy => "policy",
            Category::Disease => "disease",
            Category::Research => "research",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts either the label or the slug.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("Unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_medical: bool,
    /// `None` when the article is not medical.
    pub category: Option<Category>,
    /// Always within `[0.0, 1.0]`.
    pub confidence_score: f64,
    pub matched_keywords: Vec<String>,
}

impl ClassificationResult {
    pub fn not_medical() -> Self {
        Self {
            is_medical: false,
            category: None,
            confidence_score: 0.0,
            matched_keywords: Vec::new(),
        }
    }

    pub fn category_label(&self) -> &'static str {
        self.category.map(|c| c.label()).unwrap_or("none")
    }
}

/// The unit handed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedArticle {
    #[serde(flatten)]
    pub candidate: ArticleCandidate,
    #[serde(flatten)]
    pub classification: ClassificationResult,
}

impl ClassifiedArticle {
    pub fn new(candidate: ArticleCandidate, classification: ClassificationResult) -> Self {
        Self {
            candidate,
            classification,
        }
    }

    pub fn url(&self) -> &str {
        &self.candidate.url
    }
}

/// Identity assigned by the sink on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleId(pub i64);

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: ArticleId,
    #[serde(flatten)]
    pub article: ClassifiedArticle,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_label_and_slug() {
        assert_eq!("병원".parse::<Category>().unwrap(), Category::Hospital);
        assert_eq!("Pharma".parse::<Category>().unwrap(), Category::Pharma);
        assert_eq!(
            "provider-dispute".parse::<Category>().unwrap(),
            Category::ProviderDispute
        );
        assert!("cardiology".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_label_for_non_medical() {
        let result = ClassificationResult::not_medical();
        assert_eq!(result.category_label(), "none");
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_classified_article_serializes_flat() {
        let article = ClassifiedArticle::new(
            ArticleCandidate {
                title: "서울대병원 암 치료".to_string(),
                description: String::new(),
                url: "https://news.example.com/1".to_string(),
                source: "네이버뉴스".to_string(),
                published_at: Utc::now(),
            },
            ClassificationResult {
                is_medical: true,
                category: Some(Category::Disease),
                confidence_score: 1.0,
                matched_keywords: vec!["병원".to_string(), "암".to_string()],
            },
        );

        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["url"], "https://news.example.com/1");
        assert_eq!(value["category"], "disease");
        assert_eq!(value["is_medical"], true);
    }
}
