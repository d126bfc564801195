use async_trait::async_trait;
use mn_core::{ArticleRepository, Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: ArticleRepository + Sized + 'static {
    /// Hint shown when the backend cannot be opened
    fn get_error_message() -> &'static str;

    /// Open the backend at `location`, or at its default location
    async fn open(location: Option<&str>) -> Result<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

async fn open_backend<T: StorageBackend>(location: Option<&str>) -> Result<Arc<dyn ArticleRepository>> {
    let storage = T::open(location)
        .await
        .map_err(|e| Error::Storage(format!("{} ({})", T::get_error_message(), e)))?;
    Ok(Arc::new(storage))
}

/// Opens the storage backend named `kind` ("memory" or "sqlite").
pub async fn create_storage(kind: &str, location: Option<&str>) -> Result<Arc<dyn ArticleRepository>> {
    let kind: StorageKind = kind.parse()?;
    let storage = match kind {
        StorageKind::Memory => open_backend::<InMemoryStorage>(location).await?,
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => open_backend::<SQLiteStorage>(location).await?,
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(Error::Config(
                "mn_storage was built without the `sqlite` feature".to_string(),
            ))
        }
    };
    info!("🏦 Storage backend ready (using {})", kind);
    Ok(storage)
}
