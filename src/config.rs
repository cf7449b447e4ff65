use crate::core::ConfigError;
use serde::{Deserialize, Serialize};

/// Shared page size; also the backend's value-in-set ceiling.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Natural ordering of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub field: String,
    pub descending: bool,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            field: "updated_at".to_string(),
            descending: true,
        }
    }
}

/// Per-entity cache and ordering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub capacity: usize,
    pub order: OrderConfig,
}

impl EntityConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: OrderConfig::default(),
        }
    }

    /// Set the natural ordering field
    pub fn order_by(mut self, field: &str, descending: bool) -> Self {
        self.order = OrderConfig {
            field: field.to_string(),
            descending,
        };
        self
    }
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Data-access configuration surfaced to repositories.
///
/// # Examples
///
/// ```
/// use deckstore::DataConfig;
///
/// let config = DataConfig::new()
///     .page_size(10)
///     .deck_capacity(30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Page size for range queries and chunk size for id-set lookups
    pub page_size: usize,

    pub decks: EntityConfig,

    pub subdecks: EntityConfig,

    pub flashcards: EntityConfig,

    /// Session summaries order by completion time, newest first
    pub session_summaries: EntityConfig,
}

impl DataConfig {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            decks: EntityConfig::new(100),
            subdecks: EntityConfig::new(100),
            flashcards: EntityConfig::new(300),
            session_summaries: EntityConfig::new(50).order_by("completed_at", true),
        }
    }

    /// Parse a JSON document; omitted keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the shared page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the deck cache capacity
    pub fn deck_capacity(mut self, capacity: usize) -> Self {
        self.decks.capacity = capacity;
        self
    }

    /// Set the subdeck cache capacity
    pub fn subdeck_capacity(mut self, capacity: usize) -> Self {
        self.subdecks.capacity = capacity;
        self
    }

    /// Set the flashcard cache capacity
    pub fn flashcard_capacity(mut self, capacity: usize) -> Self {
        self.flashcards.capacity = capacity;
        self
    }

    /// Set the session summary cache capacity
    pub fn session_summary_capacity(mut self, capacity: usize) -> Self {
        self.session_summaries.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }

        for (entity, config) in [
            ("decks", &self.decks),
            ("subdecks", &self.subdecks),
            ("flashcards", &self.flashcards),
            ("session_summaries", &self.session_summaries),
        ] {
            if config.capacity < self.page_size {
                return Err(ConfigError::CapacityBelowPageSize {
                    entity: entity.to_string(),
                    capacity: config.capacity,
                    page_size: self.page_size,
                });
            }
        }
        Ok(())
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DataConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.decks.order.field, "updated_at");
        assert_eq!(config.session_summaries.order.field, "completed_at");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_keeps_defaults_for_missing_keys() {
        let config = DataConfig::from_json_str(r#"{"page_size": 5, "decks": {"capacity": 20}}"#)
            .unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.decks.capacity, 20);
        assert!(config.decks.order.descending);
        assert_eq!(config.flashcards.capacity, 300);
    }

    #[test]
    fn test_validate_rejects_small_capacity() {
        let err = DataConfig::new().page_size(10).deck_capacity(4).validate();
        assert_eq!(
            err,
            Err(ConfigError::CapacityBelowPageSize {
                entity: "decks".into(),
                capacity: 4,
                page_size: 10
            })
        );
        assert_eq!(
            DataConfig::new().page_size(0).validate(),
            Err(ConfigError::ZeroPageSize)
        );
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        assert!(matches!(
            DataConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
