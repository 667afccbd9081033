//! Storage layer
//!
//! Two interchangeable backends behind `ExcuseStore`: an in-memory map and
//! PostgreSQL. Handlers only ever see the trait object.

pub mod db;
pub mod memory;

pub use db::PostgresStore;
pub use memory::MemoryStore;

use crate::config::{AppConfig, BackendKind};
use anyhow::{Context, Result};
use excuse_core::ExcuseStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn ExcuseStore>> {
    let store: Arc<dyn ExcuseStore> = match config.storage.backend {
        BackendKind::Memory => Arc::new(MemoryStore::new()),
        BackendKind::Postgres => Arc::new(
            PostgresStore::connect(&config.database)
                .await
                .context("Failed to initialize PostgreSQL storage")?,
        ),
    };

    Ok(store)
}

/// Load the startup seed. A missing or broken file is logged and skipped so
/// the service still comes up; returns how many records were written.
pub async fn seed_store(store: &dyn ExcuseStore, path: &Path) -> usize {
    match store.load_seed(path).await {
        Ok(count) => {
            info!("Loaded {} excuses from {}", count, path.display());
            count
        }
        Err(e) => {
            warn!("Failed to load excuses from {}: {}", path.display(), e);
            0
        }
    }
}
