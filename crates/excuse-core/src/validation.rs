//! Validation policy: allow-lists, limit parsing, ID generation and the
//! day boundary used by statistics.

use crate::{Excuse, ExcuseError, ExcuseFilter, NewExcuse, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allow-lists and limit settings. These vary between deployments and are
/// loaded from configuration; they cannot be changed through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub categories: Vec<String>,
    pub languages: Vec<String>,
    pub severities: Vec<String>,
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_category: String,
    pub default_language: String,
    pub default_severity: String,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        fn owned(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }

        Self {
            categories: owned(&["work", "family", "tech", "urgent", "general"]),
            languages: owned(&["ru", "en", "es", "fr"]),
            severities: owned(&["low", "medium", "high", "critical"]),
            default_limit: 10,
            max_limit: 100,
            default_category: "general".to_string(),
            default_language: "ru".to_string(),
            default_severity: "medium".to_string(),
        }
    }
}

fn allowed(list: &[String], value: &str) -> Option<String> {
    let value = value.trim().to_lowercase();
    list.iter()
        .any(|item| item.to_lowercase() == value)
        .then_some(value)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

impl ValidationPolicy {
    /// Returns the normalized (lowercase) category
    pub fn validate_category(&self, category: &str) -> Result<String> {
        allowed(&self.categories, category)
            .ok_or_else(|| ExcuseError::InvalidInput("Invalid category".to_string()))
    }

    pub fn validate_language(&self, language: &str) -> Result<String> {
        allowed(&self.languages, language)
            .ok_or_else(|| ExcuseError::InvalidInput("Invalid language".to_string()))
    }

    pub fn validate_severity(&self, severity: &str) -> Result<String> {
        allowed(&self.severities, severity)
            .ok_or_else(|| ExcuseError::InvalidInput("Invalid severity".to_string()))
    }

    /// Build a storage filter from raw query values. Empty values count as
    /// absent.
    pub fn filter(
        &self,
        category: Option<&str>,
        language: Option<&str>,
        severity: Option<&str>,
    ) -> Result<ExcuseFilter> {
        Ok(ExcuseFilter {
            category: present(category)
                .map(|c| self.validate_category(c))
                .transpose()?,
            language: present(language)
                .map(|l| self.validate_language(l))
                .transpose()?,
            severity: present(severity)
                .map(|s| self.validate_severity(s))
                .transpose()?,
        })
    }

    /// Missing, non-numeric, negative or zero values fall back to the
    /// default; larger values are clamped to the maximum.
    pub fn parse_limit(&self, raw: Option<&str>) -> usize {
        match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            Some(n) if n > 0 => (n as u64).min(self.max_limit as u64) as usize,
            _ => self.default_limit.min(self.max_limit),
        }
    }

    /// Turn a creation request into a new excuse with a fresh id
    pub fn build_excuse(&self, req: NewExcuse) -> Result<Excuse> {
        let text = req.text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(ExcuseError::InvalidInput("Text is required".to_string()));
        }

        let or_default = |value: Option<String>, default: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let category =
            self.validate_category(&or_default(req.category, &self.default_category))?;
        let language =
            self.validate_language(&or_default(req.language, &self.default_language))?;
        let severity =
            self.validate_severity(&or_default(req.severity, &self.default_severity))?;

        Ok(Excuse::new(
            generate_id(),
            text.to_string(),
            category,
            language,
            severity,
        ))
    }
}

/// Collision-resistant excuse id backed by a random v4 UUID
pub fn generate_id() -> String {
    format!("exc_{}", uuid::Uuid::new_v4().simple())
}

/// UTC midnight of the given instant's date
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}
