//! In-memory excuse store guarded by a single reader/writer lock

use async_trait::async_trait;
use chrono::Utc;
use excuse_core::ports::storage::rank_order;
use excuse_core::validation::start_of_day;
use excuse_core::{Excuse, ExcuseError, ExcuseFilter, ExcuseStore, Result, Stats};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::debug;

/// Excuses keyed by id. Every operation holds the lock for its whole
/// duration; reads share it, writes take it exclusively.
pub struct MemoryStore {
    excuses: RwLock<BTreeMap<String, Excuse>>,
    rng: Mutex<StdRng>,
}

impl MemoryStore {
    /// Create an empty store with a random source seeded from the clock
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            excuses: RwLock::new(BTreeMap::new()),
            rng: Mutex::new(rng),
        }
    }

    fn pick_index(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExcuseStore for MemoryStore {
    async fn get_random_excuse(&self) -> Result<Option<Excuse>> {
        let excuses = self.excuses.read().await;

        if excuses.is_empty() {
            return Ok(None);
        }

        let idx = self.pick_index(excuses.len());
        Ok(excuses.values().nth(idx).cloned())
    }

    async fn list_excuses(&self, filter: &ExcuseFilter, limit: usize) -> Result<Vec<Excuse>> {
        let excuses = self.excuses.read().await;

        let mut matching: Vec<Excuse> = excuses
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(rank_order);
        matching.truncate(limit);

        debug!("Listed {} of {} excuses", matching.len(), excuses.len());
        Ok(matching)
    }

    async fn create_excuse(&self, excuse: &Excuse) -> Result<()> {
        let mut excuses = self.excuses.write().await;

        if excuses.contains_key(&excuse.id) {
            return Err(ExcuseError::DuplicateId(excuse.id.clone()));
        }
        excuses.insert(excuse.id.clone(), excuse.clone());

        Ok(())
    }

    async fn rate_excuse(&self, id: &str, delta: i32) -> Result<()> {
        let mut excuses = self.excuses.write().await;

        let excuse = excuses
            .get_mut(id)
            .ok_or_else(|| ExcuseError::NotFound(id.to_string()))?;
        excuse.apply_rating(delta);

        Ok(())
    }

    async fn get_stats(&self) -> Result<Stats> {
        let excuses = self.excuses.read().await;
        let today = start_of_day(Utc::now());

        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        let mut excuses_today = 0;
        for excuse in excuses.values() {
            *counts.entry(excuse.category.to_lowercase()).or_default() += 1;
            if excuse.created_at >= today {
                excuses_today += 1;
            }
        }

        // BTreeMap iterates in key order, so ties go to the smallest category
        let mut most_popular: Option<(String, i64)> = None;
        for (category, count) in counts {
            if most_popular.as_ref().map_or(true, |(_, best)| count > *best) {
                most_popular = Some((category, count));
            }
        }

        Ok(Stats::new(
            excuses.len() as i64,
            most_popular.map(|(category, _)| category),
            excuses_today,
        ))
    }

    async fn import_excuses(&self, seed: Vec<Excuse>) -> Result<usize> {
        let mut excuses = self.excuses.write().await;

        let count = seed.len();
        for excuse in seed {
            excuses.insert(excuse.id.clone(), excuse);
        }

        Ok(count)
    }
}
