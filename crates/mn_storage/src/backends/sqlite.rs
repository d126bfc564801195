use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mn_core::{
    ArticleCandidate, ArticleFilter, ArticleId, ArticleRepository, ArticleSink, Category,
    ClassificationResult, ClassifiedArticle, Error, Result, StoredArticle,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::StorageBackend;

const DEFAULT_DB_PATH: &str = "articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        source TEXT NOT NULL,
        published_at TEXT NOT NULL,
        is_medical INTEGER NOT NULL,
        category TEXT,
        keywords TEXT NOT NULL,
        confidence_score REAL NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_category_published
        ON articles (category, published_at)
    "#,
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

/// Timestamps are stored as second-precision RFC 3339 in UTC so that string
/// comparison orders them chronologically.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date {}: {}", raw, e)))
}

pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    fn row_to_article(row: &SqliteRow) -> Result<StoredArticle> {
        let get_err = db_error("Failed to read article row");

        let keywords: String = row.try_get("keywords").map_err(&get_err)?;
        let matched_keywords: Vec<String> = serde_json::from_str(&keywords)?;
        let category = row
            .try_get::<Option<String>, _>("category")
            .map_err(&get_err)?
            .map(|c| c.parse::<Category>())
            .transpose()?;
        let published_at: String = row.try_get("published_at").map_err(&get_err)?;
        let created_at: String = row.try_get("created_at").map_err(&get_err)?;

        Ok(StoredArticle {
            id: ArticleId(row.try_get("id").map_err(&get_err)?),
            article: ClassifiedArticle::new(
                ArticleCandidate {
                    title: row.try_get("title").map_err(&get_err)?,
                    description: row.try_get("description").map_err(&get_err)?,
                    url: row.try_get("url").map_err(&get_err)?,
                    source: row.try_get("source").map_err(&get_err)?,
                    published_at: parse_timestamp(&published_at)?,
                },
                ClassificationResult {
                    is_medical: row.try_get("is_medical").map_err(&get_err)?,
                    category,
                    confidence_score: row.try_get("confidence_score").map_err(&get_err)?,
                    matched_keywords,
                },
            ),
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable at the given path (default ./articles.db)"
    }

    async fn open(location: Option<&str>) -> Result<Self> {
        let path = PathBuf::from(location.unwrap_or(DEFAULT_DB_PATH));
        Self::new_with_path(&path).await
    }
}

#[async_trait]
impl ArticleSink for SQLiteStorage {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to check article url"))?;
        Ok(row.is_some())
    }

    async fn insert(&self, article: &ClassifiedArticle) -> Result<ArticleId> {
        let candidate = &article.candidate;
        let classification = &article.classification;
        let keywords = serde_json::to_string(&classification.matched_keywords)?;

        let result = sqlx::query(
            r#"
            INSERT INTO articles
            (url, title, description, source, published_at, is_medical, category, keywords, confidence_score, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&candidate.url)
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(&candidate.source)
        .bind(format_timestamp(candidate.published_at))
        .bind(classification.is_medical)
        .bind(classification.category.map(|c| c.label()))
        .bind(keywords)
        .bind(classification.confidence_score)
        .bind(format_timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .map_or(false, |db| db.is_unique_violation());
            if unique {
                Error::DuplicateUrl(candidate.url.clone())
            } else {
                Error::Database(format!("Failed to store article: {}", e))
            }
        })?;

        Ok(ArticleId(result.last_insert_rowid()))
    }
}

#[async_trait]
impl ArticleRepository for SQLiteStorage {
    async fn find_articles(&self, filter: &ArticleFilter) -> Result<Vec<StoredArticle>> {
        let category = filter.category.map(|c| c.label());
        let after = filter.published_after.map(format_timestamp);
        let before = filter.published_before.map(format_timestamp);
        // SQLite treats a negative LIMIT as no limit.
        let limit = filter
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        let rows = sqlx::query(
            r#"
            SELECT * FROM articles
            WHERE (? = 0 OR is_medical = 1)
              AND (? IS NULL OR category = ?)
              AND (? IS NULL OR published_at >= ?)
              AND (? IS NULL OR published_at <= ?)
            ORDER BY published_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(filter.medical_only)
        .bind(category)
        .bind(category)
        .bind(after.as_deref())
        .bind(after.as_deref())
        .bind(before.as_deref())
        .bind(before.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to query articles"))?;

        rows.iter().map(Self::row_to_article).collect()
    }

    async fn update_classification(
        &self,
        id: ArticleId,
        classification: &ClassificationResult,
    ) -> Result<()> {
        let keywords = serde_json::to_string(&classification.matched_keywords)?;
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET is_medical = ?, category = ?, keywords = ?, confidence_score = ?
            WHERE id = ?
            "#,
        )
        .bind(classification.is_medical)
        .bind(classification.category.map(|c| c.label()))
        .bind(keywords)
        .bind(classification.confidence_score)
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update article"))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!("No article with id {}", id)));
        }
        Ok(())
    }

    async fn category_counts(&self) -> Result<BTreeMap<Category, usize>> {
        let rows = sqlx::query(
            r#"
            SELECT category, COUNT(*) AS total FROM articles
            WHERE is_medical = 1 AND category IS NOT NULL
            GROUP BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to count categories"))?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let label: String = row.try_get("category").map_err(db_error("Failed to read category"))?;
            let total: i64 = row.try_get("total").map_err(db_error("Failed to read count"))?;
            counts.insert(label.parse::<Category>()?, total as usize);
        }
        Ok(counts)
    }
}
