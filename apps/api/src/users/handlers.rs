use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{JsonBody, Path};
use crate::models::user::User;
use crate::state::AppState;
use crate::users::profile::{
    remove_skill, upsert_course_progress, upsert_skill, user_stats, CourseProgressInput,
    GoalUpdate, NewGoal, ProfileUpdate, SkillInput, UserStats,
};

/// Writes back every mutable column of the user document.
pub async fn save_user(pool: &PgPool, user: &User) -> Result<User, AppError> {
    let saved = sqlx::query_as(
        r#"
        UPDATE users
        SET name = $2, bio = $3, location = $4, phone = $5, linkedin = $6,
            github = $7, website = $8, skills = $9, goals = $10,
            course_progress = $11, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.bio)
    .bind(&user.location)
    .bind(&user.phone)
    .bind(&user.linkedin)
    .bind(&user.github)
    .bind(&user.website)
    .bind(&user.skills)
    .bind(&user.goals)
    .bind(&user.course_progress)
    .fetch_one(pool)
    .await?;
    Ok(saved)
}

/// PUT /api/users/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<Envelope<Value>>, AppError> {
    update.validate()?;
    update.apply(&mut user);
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Profile updated successfully",
        json!({ "user": user }),
    ))
}

/// POST /api/users/skills
pub async fn handle_upsert_skill(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    JsonBody(input): JsonBody<SkillInput>,
) -> Result<Json<Envelope<Value>>, AppError> {
    input.validate()?;
    upsert_skill(&mut user.skills, input);
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Skill updated successfully",
        json!({ "skills": user.skills }),
    ))
}

/// DELETE /api/users/skills/:skill_id
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Path(skill_id): Path<Uuid>,
) -> Result<Json<Envelope<Value>>, AppError> {
    remove_skill(&mut user.skills, skill_id);
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Skill removed successfully",
        json!({ "skills": user.skills }),
    ))
}

/// POST /api/users/goals
pub async fn handle_add_goal(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    JsonBody(input): JsonBody<NewGoal>,
) -> Result<(StatusCode, Json<Envelope<Value>>), AppError> {
    let goal = input.into_goal(Utc::now())?;
    user.goals.push(goal);
    let user = save_user(&state.db, &user).await?;
    Ok((
        StatusCode::CREATED,
        envelope::ok_with_message("Goal added successfully", json!({ "goals": user.goals })),
    ))
}

/// PUT /api/users/goals/:goal_id
pub async fn handle_update_goal(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Path(goal_id): Path<Uuid>,
    JsonBody(update): JsonBody<GoalUpdate>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let goal = user
        .goals
        .iter_mut()
        .find(|g| g.id == goal_id)
        .ok_or_else(|| AppError::NotFound("Goal not found".to_string()))?;
    update.apply(goal)?;
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Goal updated successfully",
        json!({ "goals": user.goals }),
    ))
}

/// DELETE /api/users/goals/:goal_id
pub async fn handle_delete_goal(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let before = user.goals.len();
    user.goals.retain(|g| g.id != goal_id);
    if user.goals.len() == before {
        return Err(AppError::NotFound("Goal not found".to_string()));
    }
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Goal deleted successfully",
        json!({ "goals": user.goals }),
    ))
}

/// PUT /api/users/progress
pub async fn handle_update_course_progress(
    State(state): State<AppState>,
    AuthUser(mut user): AuthUser,
    JsonBody(input): JsonBody<CourseProgressInput>,
) -> Result<Json<Envelope<Value>>, AppError> {
    input.validate()?;
    upsert_course_progress(&mut user.course_progress, input, Utc::now());
    let user = save_user(&state.db, &user).await?;
    Ok(envelope::ok_with_message(
        "Progress updated successfully",
        json!({ "progress": user.course_progress }),
    ))
}

/// GET /api/users/stats
pub async fn handle_user_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Envelope<Value>>, AppError> {
    let streak: Option<i64> = sqlx::query_scalar(
        "SELECT MAX((stats->>'streakDays')::BIGINT) FROM user_progress WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    let stats: UserStats = user_stats(&user, streak.unwrap_or(0).max(0) as u32);
    Ok(envelope::ok(json!({ "stats": stats })))
}
