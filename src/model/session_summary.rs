use crate::core::{Document, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one finished study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub owner_id: String,
    pub deck_id: String,
    pub cards_reviewed: i64,
    pub cards_correct: i64,
    pub completed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(owner_id: impl Into<String>, deck_id: impl Into<String>, reviewed: i64, correct: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            deck_id: deck_id.into(),
            cards_reviewed: reviewed,
            cards_correct: correct.min(reviewed),
            completed_at: now,
            updated_at: now,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.cards_reviewed == 0 {
            0.0
        } else {
            self.cards_correct as f64 / self.cards_reviewed as f64
        }
    }
}

impl Document for SessionSummary {
    const COLLECTION: &'static str = "session_summaries";

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
            "cards_reviewed" => Some(Value::from(self.cards_reviewed)),
            "cards_correct" => Some(Value::from(self.cards_correct)),
            "accuracy" => Some(Value::from(self.accuracy())),
            "completed_at" => Some(Value::from(self.completed_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_handles_empty_session() {
        let empty = SessionSummary::new("u", "d", 0, 0);
        assert_eq!(empty.accuracy(), 0.0);
        let half = SessionSummary::new("u", "d", 10, 5);
        assert!((half.accuracy() - 0.5).abs() < f64::EPSILON);
    }
}
