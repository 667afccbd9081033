//! Excuse types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored excuse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excuse {
    pub id: String,
    pub text: String,
    pub category: String,
    pub language: String,
    pub severity: String,
    /// Seed files may omit the timestamp; it then reads as the Unix epoch
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// Seed files may omit the rating
    #[serde(default)]
    pub rating: i32,
}

impl Excuse {
    pub fn new(
        id: String,
        text: String,
        category: String,
        language: String,
        severity: String,
    ) -> Self {
        Self {
            id,
            text,
            category,
            language,
            severity,
            created_at: Utc::now(),
            rating: 0,
        }
    }

    /// Apply a rating change. The counter is unbounded in practice but
    /// saturates at the integer limits.
    pub fn apply_rating(&mut self, delta: i32) {
        self.rating = self.rating.saturating_add(delta);
    }
}

/// Excuse creation request. A missing or null `text` is reported as a
/// validation failure, not a decoding one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewExcuse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Rating request: upvote adds one, downvote subtracts one
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingRequest {
    pub upvote: bool,
}

impl RatingRequest {
    pub fn delta(&self) -> i32 {
        if self.upvote {
            1
        } else {
            -1
        }
    }
}
