pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::rate_limit::rate_limit;
use crate::state::AppState;
use crate::{auth, careers, contact, learning, progress, roadmaps, users};

/// JSON request bodies up to 10 MB.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

fn auth_routes() -> Router<AppState> {
    use auth::handlers::*;
    Router::new()
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        .route("/me", get(handle_me))
}

fn user_routes() -> Router<AppState> {
    use users::handlers::*;
    Router::new()
        .route("/profile", put(handle_update_profile))
        .route("/skills", post(handle_upsert_skill))
        .route("/skills/:skill_id", delete(handle_remove_skill))
        .route("/goals", post(handle_add_goal))
        .route(
            "/goals/:goal_id",
            put(handle_update_goal).delete(handle_delete_goal),
        )
        .route("/progress", put(handle_update_course_progress))
        .route("/stats", get(handle_user_stats))
}

fn career_routes() -> Router<AppState> {
    use careers::handlers::*;
    Router::new()
        .route("/", get(handle_list_careers))
        .route("/recommendations", get(handle_recommendations))
        .route("/categories", get(handle_categories))
        .route("/trending", get(handle_trending))
        .route("/search/:query", get(handle_search))
        .route("/:id", get(handle_get_career))
}

fn learning_routes() -> Router<AppState> {
    use learning::handlers::*;
    Router::new()
        .route("/paths", get(handle_list_paths))
        .route("/paths/:id", get(handle_get_path))
        .route("/paths/:id/rate", post(handle_rate_path))
        .route("/personalized", get(handle_personalized))
        .route("/categories", get(handle_categories))
        .route("/search/:query", get(handle_search))
        .route("/popular", get(handle_popular))
}

fn roadmap_routes() -> Router<AppState> {
    use roadmaps::handlers::*;
    Router::new()
        .route("/", get(handle_list))
        .route("/generate", post(handle_generate))
        .route("/meta/fields", get(handle_fields))
        .route("/meta/popular", get(handle_popular))
        .route("/webhook/n8n-callback", post(handle_callback))
        .route("/:id", get(handle_get).delete(handle_delete))
        .route("/:id/graph", get(handle_graph))
        .route("/:id/progress", put(handle_update_progress))
        .route("/:id/rate", post(handle_rate))
}

fn shared_roadmap_routes() -> Router<AppState> {
    use roadmaps::shared::*;
    Router::new()
        .route("/", get(handle_list_shared))
        .route("/user/:user_id", get(handle_list_owned))
        .route(
            "/:id",
            get(handle_get_shared)
                .put(handle_edit)
                .delete(roadmaps::handlers::handle_delete),
        )
        .route("/:id/mark-helpful", post(handle_mark_helpful))
}

fn progress_routes() -> Router<AppState> {
    use progress::handlers::*;
    Router::new()
        .route("/dashboard", get(handle_dashboard))
        .route("/meta/leaderboard", get(handle_leaderboard))
        .route("/:roadmap_id", get(handle_detail))
        .route("/:roadmap_id/preferences", put(handle_preferences))
        .route("/:roadmap_id/session", post(handle_session))
        .route("/:roadmap_id/achievements", get(handle_achievements))
}

fn contact_routes() -> Router<AppState> {
    use contact::handlers::*;
    Router::new()
        .route("/", post(handle_contact))
        .route("/newsletter", post(handle_newsletter))
        .route("/feedback", post(handle_feedback))
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_handler))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/careers", career_routes())
        .nest("/learning", learning_routes())
        .nest("/roadmaps", roadmap_routes())
        .nest("/roadmaps-advanced", shared_roadmap_routes())
        .nest("/progress", progress_routes())
        .nest("/contact", contact_routes())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
