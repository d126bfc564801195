pub mod config;
pub mod error;
pub mod storage;
pub mod summary;
pub mod types;

pub use config::{ClassifierConfig, CollectorConfig, NaverConfig};
pub use error::{Error, Result};
pub use storage::{ArticleFilter, ArticleRepository, ArticleSink};
pub use summary::{BackfillWindow, ReclassifySummary, RunSummary};
pub use types::{
    ArticleCandidate, ArticleId, Category, ClassificationResult, ClassifiedArticle, StoredArticle,
};
