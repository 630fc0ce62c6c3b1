//! GET /api/admin/users, PATCH /api/admin/users/:id/block

use crate::gate::{CurrentIdentity, RouteParams};
use crate::response::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use storage::User;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockToggle {
    pub is_blocked: bool,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<Vec<User>>, ApiError> {
    current.require()?;
    let users = state.store_task(|s| s.list_users()).await?;
    Ok(Json(users))
}

/// Set the target's blocked flag. Administrator targets are not protected
/// here; only the web client hides the toggle for them.
pub async fn toggle_block(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
    Extension(params): Extension<RouteParams>,
    Json(toggle): Json<BlockToggle>,
) -> Result<Json<User>, ApiError> {
    let admin = current.require()?;
    let id = params.id("id")?;
    let user = state
        .store_task(move |s| s.set_blocked(id, toggle.is_blocked))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!(
        admin_id = admin.id,
        target_id = user.id,
        target_role = %user.role,
        blocked = user.blocked,
        "block status changed"
    );
    Ok(Json(user))
}
