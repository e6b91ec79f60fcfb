//! State store — the key/value seam between the controller and its storage
//!
//! The controller never touches a database directly: it reads and writes
//! named string values through [`StateStore`]. [`SqliteStore`] backs the
//! server; [`MemoryStore`] backs tests and the CLI's dry paths.

use async_trait::async_trait;
use persistence::{OptionsRepository, SqlitePool};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

use crate::error::{AutomationError, AutomationResult};

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> AutomationResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> AutomationResult<()>;

    async fn delete(&self, key: &str) -> AutomationResult<()>;

    /// Integer value; missing or unparsable reads as 0
    async fn get_i64(&self, key: &str) -> AutomationResult<i64> {
        Ok(match self.get(key).await? {
            Some(v) => v.trim().parse().unwrap_or_else(|_| {
                warn!(key, value = %v, "Non-numeric option value, reading as 0");
                0
            }),
            None => 0,
        })
    }

    async fn set_i64(&self, key: &str, value: i64) -> AutomationResult<()> {
        self.set(key, &value.to_string()).await
    }
}

/// Decode a JSON option; missing reads as `T::default()`
pub async fn load_json<T>(store: &dyn StateStore, key: &str) -> AutomationResult<T>
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await? {
        Some(v) => Ok(serde_json::from_str(&v)?),
        None => Ok(T::default()),
    }
}

/// Encode a value as JSON and store it under `key`
pub async fn save_json<T>(store: &dyn StateStore, key: &str, value: &T) -> AutomationResult<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    store.set(key, &json).await
}

/// SQLite-backed store over the `options` table
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get(&self, key: &str) -> AutomationResult<Option<String>> {
        Ok(OptionsRepository::new(&self.pool).get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> AutomationResult<()> {
        Ok(OptionsRepository::new(&self.pool).set(key, value).await?)
    }

    async fn delete(&self, key: &str) -> AutomationResult<()> {
        OptionsRepository::new(&self.pool).delete(key).await?;
        Ok(())
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> AutomationResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| AutomationError::Store(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AutomationResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AutomationError::Store(e.to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AutomationResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| AutomationError::Store(e.to_string()))?;
        values.remove(key);
        Ok(())
    }
}
