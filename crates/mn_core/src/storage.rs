use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::types::{ArticleId, Category, ClassificationResult, ClassifiedArticle, StoredArticle};
use crate::Result;

/// The two operations the collection pipeline needs from persistence.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Returns true if an article with this URL is already stored
    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Store an article and return the identity assigned to it
    async fn insert(&self, article: &ClassifiedArticle) -> Result<ArticleId>;
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub category: Option<Category>,
    pub medical_only: bool,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ArticleFilter {
    pub fn medical() -> Self {
        Self {
            medical_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, article: &ClassifiedArticle) -> bool {
        let classification = &article.classification;
        let published = article.candidate.published_at;

        if self.medical_only && !classification.is_medical {
            return false;
        }
        if self.category.is_some() && classification.category != self.category {
            return false;
        }
        if self.published_after.is_some_and(|after| published < after) {
            return false;
        }
        if self.published_before.is_some_and(|before| published > before) {
            return false;
        }
        true
    }
}

/// Read side of the article store.
#[async_trait]
pub trait ArticleRepository: ArticleSink {
    /// Articles matching `filter`, newest first
    async fn find_articles(&self, filter: &ArticleFilter) -> Result<Vec<StoredArticle>>;

    /// Replace the classification fields of a stored article
    async fn update_classification(
        &self,
        id: ArticleId,
        classification: &ClassificationResult,
    ) -> Result<()>;

    /// Number of medical articles per category
    async fn category_counts(&self) -> Result<BTreeMap<Category, usize>>;
}
