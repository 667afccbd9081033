//! Storage trait for persistence

use crate::{seed, Excuse, Result, Stats};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::Path;

/// Optional exact-match filters, compared case-insensitively.
/// `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcuseFilter {
    pub category: Option<String>,
    pub language: Option<String>,
    pub severity: Option<String>,
}

impl ExcuseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.language.is_none() && self.severity.is_none()
    }

    /// Check an excuse against every supplied filter
    pub fn matches(&self, excuse: &Excuse) -> bool {
        fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
            wanted
                .as_deref()
                .map(|w| w.to_lowercase() == actual.to_lowercase())
                .unwrap_or(true)
        }

        field_matches(&self.category, &excuse.category)
            && field_matches(&self.language, &excuse.language)
            && field_matches(&self.severity, &excuse.severity)
    }
}

/// Listing order: rating descending, then newest first, then id so that
/// fully tied records still come back in a stable order.
pub fn rank_order(a: &Excuse, b: &Excuse) -> Ordering {
    b.rating
        .cmp(&a.rating)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Excuse store
#[async_trait]
pub trait ExcuseStore: Send + Sync {
    /// Uniformly random excuse from the whole store.
    /// An empty store yields `Ok(None)`, never an error.
    async fn get_random_excuse(&self) -> Result<Option<Excuse>>;

    /// Matching excuses in [`rank_order`], at most `limit` of them.
    async fn list_excuses(&self, filter: &ExcuseFilter, limit: usize) -> Result<Vec<Excuse>>;

    /// Persist a new excuse. Fails with `DuplicateId` if the id is taken.
    async fn create_excuse(&self, excuse: &Excuse) -> Result<()>;

    /// Atomically add `delta` to the rating. Fails with `NotFound` for an
    /// unknown id.
    async fn rate_excuse(&self, id: &str, delta: i32) -> Result<()>;

    async fn get_stats(&self) -> Result<Stats>;

    /// Bulk-load records, returning how many were written. Duplicate
    /// handling is backend specific.
    async fn import_excuses(&self, excuses: Vec<Excuse>) -> Result<usize>;

    /// Load a seed file and import its records
    async fn load_seed(&self, path: &Path) -> Result<usize> {
        let excuses = seed::read_seed_file(path).await?;
        self.import_excuses(excuses).await
    }
}
