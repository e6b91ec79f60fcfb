//! Scoring directives — named rules with a weight and bullish/bearish notes,
//! persisted as one JSON list in the state store.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AutomationError, AutomationResult};
use crate::store::{load_json, save_json, StateStore};

pub const DIRECTIVES_KEY: &str = "tradepress_scoring_directives";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Slug, e.g. `rsi_divergence`
    pub id: String,
    pub name: String,
    /// Relative weight in the score (0-100)
    pub weight: u8,
    #[serde(default)]
    pub bullish: String,
    #[serde(default)]
    pub bearish: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Directive {
    pub fn validate(&self) -> AutomationResult<()> {
        let id_ok = !self.id.is_empty()
            && self
                .id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !id_ok {
            return Err(AutomationError::InvalidDirective(format!(
                "id must be a non-empty lowercase slug, got {:?}",
                self.id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(AutomationError::InvalidDirective("name is empty".into()));
        }
        if self.weight > 100 {
            return Err(AutomationError::InvalidDirective(format!(
                "weight {} outside 0-100",
                self.weight
            )));
        }
        Ok(())
    }
}

/// Directive list operations over a state store
pub struct DirectiveBook<'a> {
    store: &'a dyn StateStore,
}

impl<'a> DirectiveBook<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AutomationResult<Vec<Directive>> {
        load_json(self.store, DIRECTIVES_KEY).await
    }

    /// Insert or replace by id; returns the saved list
    pub async fn save(&self, directive: Directive) -> AutomationResult<Vec<Directive>> {
        directive.validate()?;

        let mut directives = self.list().await?;
        match directives.iter_mut().find(|d| d.id == directive.id) {
            Some(existing) => *existing = directive.clone(),
            None => directives.push(directive.clone()),
        }
        save_json(self.store, DIRECTIVES_KEY, &directives).await?;

        info!(id = %directive.id, weight = directive.weight, "Directive saved");
        Ok(directives)
    }

    /// Returns true if a directive with `id` existed
    pub async fn delete(&self, id: &str) -> AutomationResult<bool> {
        let mut directives = self.list().await?;
        let before = directives.len();
        directives.retain(|d| d.id != id);
        if directives.len() == before {
            return Ok(false);
        }
        save_json(self.store, DIRECTIVES_KEY, &directives).await?;
        info!(id, "Directive deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directive(id: &str, weight: u8) -> Directive {
        Directive {
            id: id.to_string(),
            name: "RSI Divergence".to_string(),
            weight,
            bullish: "RSI below 30 with higher lows".to_string(),
            bearish: "RSI above 70 with lower highs".to_string(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_empty_by_default() {
        let store = MemoryStore::new();
        assert!(DirectiveBook::new(&store).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_upserts_by_id() {
        let store = MemoryStore::new();
        let book = DirectiveBook::new(&store);

        book.save(directive("rsi_divergence", 20)).await.unwrap();
        book.save(directive("volume_surge", 10)).await.unwrap();
        let list = book.save(directive("rsi_divergence", 35)).await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "rsi_divergence");
        assert_eq!(list[0].weight, 35);
        assert_eq!(book.list().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid() {
        let store = MemoryStore::new();
        let book = DirectiveBook::new(&store);

        for bad in [directive("", 10), directive("Has Space", 10), directive("ok", 101)] {
            let err = book.save(bad).await.unwrap_err();
            assert!(matches!(err, AutomationError::InvalidDirective(_)));
        }
        let mut unnamed = directive("ok", 10);
        unnamed.name = "  ".into();
        assert!(book.save(unnamed).await.is_err());
        assert!(book.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let book = DirectiveBook::new(&store);
        book.save(directive("volume_surge", 10)).await.unwrap();

        assert!(book.delete("volume_surge").await.unwrap());
        assert!(!book.delete("volume_surge").await.unwrap());
        assert!(book.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_enabled_defaults_true_when_absent() {
        let d: Directive =
            serde_json::from_str(r#"{"id":"macd","name":"MACD","weight":5}"#).unwrap();
        assert!(d.enabled);
        assert!(d.bullish.is_empty());
    }
}
