use crate::core::{Document, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A top-level deck. Child subdecks are referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub subdeck_ids: Vec<String>,
    pub card_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: None,
            subdeck_ids: Vec::new(),
            card_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn touched_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }
}

impl Document for Deck {
    const COLLECTION: &'static str = "decks";

    fn id(&self) -> &str {
        &self.id
    }

    fn partition_key(&self) -> &str {
        &self.owner_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(&self.name)),
            "description" => Some(Value::from(self.description.clone())),
            "subdeck_ids" => Some(Value::from(self.subdeck_ids.clone())),
            "card_count" => Some(Value::from(self.card_count)),
            "created_at" => Some(Value::from(self.created_at)),
            _ => None,
        }
    }
}
