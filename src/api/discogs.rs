use crate::api::state::AppState;
use crate::error::{AppError, Result};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

/// `GET /discogs`: reads the side-car enrichment file an external Discogs
/// lookup producer drops next to the library, keyed by a hash of the
/// currently-playing asset path. This crate never calls Discogs itself.
pub async fn discogs(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let current = state.publisher.read().await;
    let track_path = current.and_then(|np| np.track).ok_or_else(|| AppError::NotFound("no track currently playing".into()))?;

    let cache_path = state.config.discogs_cache_dir.join(format!("{}.json", hash_asset_path(Path::new(&track_path))));
    let raw = tokio::fs::read(&cache_path)
        .await
        .map_err(|_| AppError::NotFound("no discogs enrichment cached for current track".into()))?;

    let value: serde_json::Value = serde_json::from_slice(&raw).map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(value))
}

fn hash_asset_path(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    hasher.finish()
}
