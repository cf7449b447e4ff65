use crate::core::{Document, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub owner_id: String,
    /// Deck or subdeck the card belongs to
    pub deck_id: String,
    pub front: String,
    pub back: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flashcard {
    pub fn new(
        owner_id: impl Into<String>,
        deck_id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            deck_id: deck_id.into(),
            front: front.into(),
            back: back.into(),
            tags: Vec::new(),
            is_favorite: false,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn touched_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }
}

impl Document for Flashcard {
    const COLLECTION: &'static str = "flashcards";

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
            "deck_id" => Some(Value::from(&self.deck_id)),
            "front" => Some(Value::from(&self.front)),
            "back" => Some(Value::from(&self.back)),
            "tags" => Some(Value::from(self.tags.clone())),
            "is_favorite" => Some(Value::from(self.is_favorite)),
            "archived_at" => Some(Value::from(self.archived_at)),
            "created_at" => Some(Value::from(self.created_at)),
            _ => None,
        }
    }
}
