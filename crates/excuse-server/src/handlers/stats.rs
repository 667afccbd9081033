//! Statistics handler

use crate::{error::ApiError, AppState};
use axum::{extract::State, Json};
use excuse_core::Stats;
use tracing::debug;

pub async fn get(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    debug!("Stats endpoint accessed");

    let stats = state.store.get_stats().await?;
    Ok(Json(stats))
}
