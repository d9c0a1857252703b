//! Operator-visible warning banner.
//!
//! The warning is a single string cached in memory and persisted wholesale
//! to `<data_root>/warning.txt`. Writes must go through the orchestrator's
//! mutation queue; the cache is only updated after a successful write.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::fs;

/// Durable storage for the warning text
#[async_trait]
pub trait WarningPersistence: Send + Sync {
    /// Read the stored warning. `None` if nothing has been stored yet.
    async fn load(&self) -> io::Result<Option<String>>;

    /// Replace the stored warning with `text`
    async fn store(&self, text: &str) -> io::Result<()>;
}

/// File-backed warning persistence
#[derive(Debug, Clone)]
pub struct FileWarningPersistence {
    path: PathBuf,
}

impl FileWarningPersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl WarningPersistence for FileWarningPersistence {
    async fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn store(&self, text: &str) -> io::Result<()> {
        fs::write(&self.path, text).await
    }
}

/// Cached warning backed by a persistence layer
pub struct WarningStore {
    persistence: Arc<dyn WarningPersistence>,
    current: RwLock<String>,
}

impl WarningStore {
    pub fn new(persistence: Arc<dyn WarningPersistence>) -> Self {
        Self {
            persistence,
            current: RwLock::new(String::new()),
        }
    }

    /// Load the stored warning into the cache, trimming whitespace.
    ///
    /// A missing warning loads as the empty string.
    pub async fn load(&self) -> io::Result<String> {
        let text = self
            .persistence
            .load()
            .await?
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = text.clone();
        Ok(text)
    }

    /// Current cached warning
    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist `text` and, on success, adopt it. Returns the previous warning.
    ///
    /// On failure the cache is left unchanged.
    pub async fn persist(&self, text: &str) -> io::Result<String> {
        self.persistence.store(text).await?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::replace(&mut *current, text.to_string()))
    }
}
