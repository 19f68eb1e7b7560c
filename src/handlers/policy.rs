//! Policy configuration endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::{PolicyKind, SavePolicy};
use crate::session::CreatorSession;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/policy", get(get_policy))
        .route("/api/policy", post(save_policy))
}

async fn get_policy(
    State(state): State<AppState>,
    CreatorSession(creator_id): CreatorSession,
) -> Result<Json<Value>> {
    let conn = state.db.get()?;
    let policy = queries::get_policy(&conn, &creator_id)?;
    Ok(Json(json!({ "policy": policy })))
}

async fn save_policy(
    State(state): State<AppState>,
    CreatorSession(creator_id): CreatorSession,
    Json(input): Json<SavePolicy>,
) -> Result<Json<Value>> {
    if input.policy_id == PolicyKind::Custom {
        if let Some(days) = input.custom_days {
            if days < 0 {
                return Err(AppError::BadRequest(
                    "custom_days must be a non-negative integer".into(),
                ));
            }
        }
    }

    let conn = state.db.get()?;
    let policy = queries::save_policy(&conn, &creator_id, &input)?;
    tracing::info!(
        "creator {} saved policy {}",
        creator_id,
        policy.kind.as_str()
    );
    Ok(Json(json!({ "status": "saved", "policy": policy })))
}
