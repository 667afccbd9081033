//! Statistics types

use serde::{Deserialize, Serialize};

/// Qualitative label derived from the number of excuses created today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcrastinationLevel {
    Low,
    Medium,
    High,
    Critical,
    Apocalyptic,
}

impl ProcrastinationLevel {
    pub fn from_daily_count(excuses_today: i64) -> Self {
        match excuses_today {
            n if n > 20 => ProcrastinationLevel::Apocalyptic,
            n if n > 10 => ProcrastinationLevel::Critical,
            n if n > 5 => ProcrastinationLevel::High,
            n if n > 2 => ProcrastinationLevel::Medium,
            _ => ProcrastinationLevel::Low,
        }
    }
}

impl std::fmt::Display for ProcrastinationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcrastinationLevel::Low => write!(f, "low"),
            ProcrastinationLevel::Medium => write!(f, "medium"),
            ProcrastinationLevel::High => write!(f, "high"),
            ProcrastinationLevel::Critical => write!(f, "critical"),
            ProcrastinationLevel::Apocalyptic => write!(f, "apocalyptic"),
        }
    }
}

/// Aggregate statistics, recomputed on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_excuses: i64,
    pub most_popular_category: Option<String>,
    pub excuses_today: i64,
    pub global_procrastination_level: ProcrastinationLevel,
}

impl Stats {
    pub fn new(
        total_excuses: i64,
        most_popular_category: Option<String>,
        excuses_today: i64,
    ) -> Self {
        Self {
            total_excuses,
            most_popular_category,
            excuses_today,
            global_procrastination_level: ProcrastinationLevel::from_daily_count(excuses_today),
        }
    }
}
