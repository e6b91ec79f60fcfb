//! Options repository — flat key/value settings store

use crate::DbResult;
use sqlx::SqlitePool;

/// Repository for named settings
pub struct OptionsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OptionsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a setting value, `None` if it was never written
    pub async fn get(&self, name: &str) -> DbResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT option_value FROM options WHERE option_name = ?1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(|(v,)| v))
    }

    /// Insert or update a setting (upsert by option_name)
    pub async fn set(&self, name: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"INSERT INTO options (option_name, option_value)
               VALUES (?1, ?2)
               ON CONFLICT(option_name) DO UPDATE SET
                 option_value = excluded.option_value
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a setting. Returns true if a row was removed.
    pub async fn delete(&self, name: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM options WHERE option_name = ?1")
            .bind(name)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_get_missing_option() {
        let db = Database::in_memory().await.unwrap();
        let repo = OptionsRepository::new(db.pool());
        assert_eq!(repo.get("tradepress_signals_status").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_overwrite() {
        let db = Database::in_memory().await.unwrap();
        let repo = OptionsRepository::new(db.pool());

        repo.set("tradepress_signals_status", "running").await.unwrap();
        repo.set("tradepress_signals_status", "stopped").await.unwrap();

        assert_eq!(
            repo.get("tradepress_signals_status").await.unwrap().as_deref(),
            Some("stopped")
        );
    }

    #[tokio::test]
    async fn test_delete_option() {
        let db = Database::in_memory().await.unwrap();
        let repo = OptionsRepository::new(db.pool());

        repo.set("tradepress_trading_start_time", "1700000000").await.unwrap();
        assert!(repo.delete("tradepress_trading_start_time").await.unwrap());
        assert!(!repo.delete("tradepress_trading_start_time").await.unwrap());
        assert_eq!(repo.get("tradepress_trading_start_time").await.unwrap(), None);
    }
}
