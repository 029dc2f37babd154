use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "SkillSync API is running",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.app_env,
    }))
}
