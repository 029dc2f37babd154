use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{extractor::AuthUser, jwt, password};
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::user::{User, USER_FIELDS};
use crate::state::AppState;
use crate::validation::{is_valid_email, Validator};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub field: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let name = self.name.trim();
        Validator::new()
            .require_non_empty(name, "name", "Name is required")
            .max_len(Some(name), 50, "name", "Name cannot exceed 50 characters")
            .check(is_valid_email(self.email.trim()), "email", "Please provide a valid email")
            .check(
                self.password.chars().count() >= 6,
                "password",
                "Password must be at least 6 characters",
            )
            .one_of(&self.field, USER_FIELDS, "field", "Please select a valid field")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn session_token(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    jwt::issue(user_id, &state.config.jwt_secret, state.config.jwt_expire)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))
}

/// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<AuthResponse>>), AppError> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let password_hash = password::hash(&req.password)?;
    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, field)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(&req.field)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("User already exists with this email".to_string())
        }
        other => AppError::Database(other),
    })?;

    info!("Registered user {}", user.id);
    let token = session_token(&state, user.id)?;
    Ok((
        StatusCode::CREATED,
        envelope::ok_with_message("User registered successfully", AuthResponse { token, user }),
    ))
}

/// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<Envelope<AuthResponse>>, AppError> {
    Validator::new()
        .check(is_valid_email(req.email.trim()), "email", "Please provide a valid email")
        .require_non_empty(&req.password, "password", "Password is required")
        .finish()?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(invalid)?;

    if !password::verify(&req.password, &user.password_hash) {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(AppError::Unauthorized(
            "Account has been deactivated".to_string(),
        ));
    }

    let user: User = sqlx::query_as(
        "UPDATE users SET last_login = $1, updated_at = $1 WHERE id = $2 RETURNING *",
    )
    .bind(Utc::now())
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    let token = session_token(&state, user.id)?;
    Ok(envelope::ok_with_message(
        "Login successful",
        AuthResponse { token, user },
    ))
}

/// GET /api/auth/me
pub async fn handle_me(AuthUser(user): AuthUser) -> Json<Envelope<User>> {
    envelope::ok(user)
}
