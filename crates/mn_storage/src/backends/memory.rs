use async_trait::async_trait;
use chrono::Utc;
use mn_core::{
    ArticleFilter, ArticleId, ArticleRepository, ArticleSink, Category, ClassificationResult,
    ClassifiedArticle, Error, Result, StoredArticle,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::StorageBackend;

#[derive(Default)]
pub struct MemoryStore {
    articles: Vec<StoredArticle>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists_by_url(&self, url: &str) -> bool {
        self.articles.iter().any(|a| a.article.url() == url)
    }

    pub fn insert(&mut self, article: &ClassifiedArticle) -> Result<ArticleId> {
        if self.exists_by_url(article.url()) {
            return Err(Error::DuplicateUrl(article.url().to_string()));
        }
        self.next_id += 1;
        let id = ArticleId(self.next_id);
        self.articles.push(StoredArticle {
            id,
            article: article.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    pub fn find_articles(&self, filter: &ArticleFilter) -> Vec<StoredArticle> {
        let mut articles = self
            .articles
            .iter()
            .filter(|stored| filter.matches(&stored.article))
            .cloned()
            .collect::<Vec<_>>();
        articles.sort_by(|a, b| {
            b.article
                .candidate
                .published_at
                .cmp(&a.article.candidate.published_at)
        });
        if let Some(limit) = filter.limit {
            articles.truncate(limit);
        }
        articles
    }

    pub fn update_classification(&mut self, id: ArticleId, classification: &ClassificationResult) -> Result<()> {
        let stored = self
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::Storage(format!("No article with id {}", id)))?;
        stored.article.classification = classification.clone();
        Ok(())
    }

    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for stored in &self.articles {
            let classification = &stored.article.classification;
            if let (true, Some(category)) = (classification.is_medical, classification.category) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(_location: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleSink for InMemoryStorage {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        Ok(self.store.read().await.exists_by_url(url))
    }

    async fn insert(&self, article: &ClassifiedArticle) -> Result<ArticleId> {
        self.store.write().await.insert(article)
    }
}

#[async_trait]
impl ArticleRepository for InMemoryStorage {
    async fn find_articles(&self, filter: &ArticleFilter) -> Result<Vec<StoredArticle>> {
        Ok(self.store.read().await.find_articles(filter))
    }

    async fn update_classification(
        &self,
        id: ArticleId,
        classification: &ClassificationResult,
    ) -> Result<()> {
        self.store.write().await.update_classification(id, classification)
    }

    async fn category_counts(&self) -> Result<BTreeMap<Category, usize>> {
        Ok(self.store.read().await.category_counts())
    }
}
