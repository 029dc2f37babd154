//! Community side of roadmaps, mounted at `/api/roadmaps-advanced`: browsing
//! shared roadmaps by field, an owner's full list, owner edits and the
//! helpful counter. Shared means public and completed.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::{JsonBody, Path, Query};
use crate::models::roadmap::{Roadmap, RoadmapStatus, RoadmapView};
use crate::pagination::{PageQuery, Pagination};
use crate::roadmaps::store::{
    list_for_owner, mark_helpful, require_roadmap, save_owner_edits, shared_page, view_shared,
};
use crate::state::AppState;
use crate::validation::Validator;

pub const MAX_TAGS: usize = 20;

#[derive(Debug, Serialize)]
pub struct SharedRoadmap {
    #[serde(flatten)]
    pub roadmap: RoadmapView,
    pub helpful: i32,
    pub views: i32,
}

impl From<&Roadmap> for SharedRoadmap {
    fn from(r: &Roadmap) -> Self {
        Self {
            roadmap: RoadmapView::from(r),
            helpful: r.helpful_count,
            views: r.view_count,
        }
    }
}

fn shared(roadmaps: &[Roadmap]) -> Vec<SharedRoadmap> {
    roadmaps.iter().map(SharedRoadmap::from).collect()
}

/// Case-insensitive substring pattern with `LIKE` wildcards escaped, so
/// `C_` matches only a literal `C_`.
pub fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Debug, Default, Deserialize)]
pub struct SharedListQuery {
    pub field: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/roadmaps-advanced?field=
pub async fn handle_list_shared(
    State(state): State<AppState>,
    Query(query): Query<SharedListQuery>,
) -> Result<Json<Envelope<Value>>, AppError> {
    let paging = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let pattern = query
        .field
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(contains_pattern);

    let (roadmaps, total) =
        shared_page(&state.db, pattern.as_deref(), paging.limit(), paging.offset()).await?;

    Ok(envelope::ok(json!({
        "roadmaps": shared(&roadmaps),
        "pagination": Pagination::new(&paging, total, "totalRoadmaps"),
    })))
}

/// GET /api/roadmaps-advanced/:id
pub async fn handle_get_shared(
    State(state): State<AppState>,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Envelope<SharedRoadmap>>, AppError> {
    let roadmap = view_shared(&state.db, &roadmap_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Roadmap not found".to_string()))?;
    Ok(envelope::ok(SharedRoadmap::from(&roadmap)))
}

/// GET /api/roadmaps-advanced/user/:user_id
pub async fn handle_list_owned(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(owner): Path<Uuid>,
) -> Result<Json<Envelope<Vec<SharedRoadmap>>>, AppError> {
    if owner != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to view these roadmaps".to_string(),
        ));
    }
    let roadmaps = list_for_owner(&state.db, owner).await?;
    Ok(envelope::ok(shared(&roadmaps)))
}

/// Owner edits. Absent keys leave the stored value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl RoadmapEdit {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            v.require_non_empty(title, "title", "Title cannot be empty");
        }
        v.max_len(self.title.as_deref(), 200, "title", "Title cannot exceed 200 characters")
            .max_len(
                self.description.as_deref(),
                2000,
                "description",
                "Description cannot exceed 2000 characters",
            );
        if let Some(tags) = &self.tags {
            v.check(tags.len() <= MAX_TAGS, "tags", "At most 20 tags are allowed")
                .check(
                    tags.iter().all(|t| {
                        let t = t.trim();
                        !t.is_empty() && t.chars().count() <= 50
                    }),
                    "tags",
                    "Tags must be 1 to 50 characters",
                );
        }
        v.finish()
    }

    /// Tags are stored trimmed, lowercased and without repeats.
    pub fn apply(&self, roadmap: &mut Roadmap) {
        if let Some(title) = &self.title {
            roadmap.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            roadmap.overview.description = description.trim().to_string();
        }
        if let Some(tags) = &self.tags {
            let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
            for tag in tags.iter().map(|t| t.trim().to_lowercase()) {
                if !normalized.contains(&tag) {
                    normalized.push(tag);
                }
            }
            roadmap.metadata.tags = normalized;
        }
        if let Some(is_public) = self.is_public {
            roadmap.is_public = is_public;
        }
    }
}

/// PUT /api/roadmaps-advanced/:id
pub async fn handle_edit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(roadmap_id): Path<String>,
    JsonBody(edit): JsonBody<RoadmapEdit>,
) -> Result<Json<Envelope<SharedRoadmap>>, AppError> {
    let mut roadmap = require_roadmap(&state.db, &roadmap_id).await?;
    if roadmap.user_id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to update this roadmap".to_string(),
        ));
    }
    // The callback rewrites the overview when generation lands.
    if roadmap.status == RoadmapStatus::Generating.as_str() {
        return Err(AppError::Conflict(
            "Roadmap is still being generated".to_string(),
        ));
    }
    edit.validate()?;
    edit.apply(&mut roadmap);
    let roadmap = save_owner_edits(&state.db, &roadmap).await?;

    info!("Roadmap {} edited by user {}", roadmap_id, user.id);
    Ok(envelope::ok_with_message(
        "Roadmap updated successfully",
        SharedRoadmap::from(&roadmap),
    ))
}

/// POST /api/roadmaps-advanced/:id/mark-helpful
pub async fn handle_mark_helpful(
    State(state): State<AppState>,
    Path(roadmap_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let helpful = mark_helpful(&state.db, &roadmap_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Roadmap not found".to_string()))?;
    Ok(Json(json!({
        "success": true,
        "helpful": helpful,
        "message": "Thank you for the feedback!",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sqlx::PgPool;

    use crate::models::user::User;
    use crate::roadmaps::generation::tests::insert_user;
    use crate::roadmaps::schema::tests::completed_roadmap;
    use crate::roadmaps::store::insert_roadmap;
    use crate::state::tests::test_state;
    use crate::workflow_client::tests::StubGenerator;

    fn state(db: PgPool) -> AppState {
        test_state(db, Arc::new(StubGenerator::new(false)))
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Web"), "%Web%");
        assert_eq!(contains_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_edit_validation() {
        assert!(RoadmapEdit::default().validate().is_ok());
        let edit = RoadmapEdit {
            title: Some("   ".to_string()),
            tags: Some(vec!["ok".to_string(), " ".to_string()]),
            ..Default::default()
        };
        match edit.validate() {
            Err(AppError::InvalidFields(fields)) => {
                let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["title", "tags"]);
            }
            other => panic!("expected InvalidFields, got {other:?}"),
        }
        let crowded = RoadmapEdit {
            tags: Some((0..21).map(|i| format!("t{i}")).collect()),
            ..Default::default()
        };
        assert!(crowded.validate().is_err());
    }

    #[test]
    fn test_edit_applies_only_present_keys() {
        let mut roadmap = completed_roadmap();
        let before = roadmap.title.clone();
        RoadmapEdit {
            description: Some("  Frontend first  ".to_string()),
            tags: Some(vec!["React".to_string(), "react ".to_string(), "css".to_string()]),
            is_public: Some(true),
            ..Default::default()
        }
        .apply(&mut roadmap);

        assert_eq!(roadmap.title, before);
        assert_eq!(roadmap.overview.description, "Frontend first");
        assert_eq!(roadmap.metadata.tags, vec!["react", "css"]);
        assert!(roadmap.is_public);
    }

    async fn stored(db: &PgPool, owner: &User, field: &str, is_public: bool) -> Roadmap {
        let mut roadmap = completed_roadmap();
        roadmap.user_id = owner.id;
        roadmap.roadmap_id = format!("{}-{}", roadmap.roadmap_id, Uuid::new_v4());
        roadmap.field = field.to_string();
        roadmap.is_public = is_public;
        insert_roadmap(db, &roadmap).await.unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn test_listing_shows_only_shared_roadmaps_for_field(db: PgPool) {
        let owner = insert_user(&db).await;
        let web = stored(&db, &owner, "Web Development", true).await;
        stored(&db, &owner, "Web Development", false).await;
        stored(&db, &owner, "Data Science", true).await;

        let query = SharedListQuery {
            field: Some("web".to_string()),
            ..Default::default()
        };
        let Json(body) = handle_list_shared(State(state(db)), Query(query))
            .await
            .unwrap();
        let data = serde_json::to_value(body.data.unwrap()).unwrap();

        let roadmaps = data["roadmaps"].as_array().unwrap();
        assert_eq!(roadmaps.len(), 1);
        assert_eq!(roadmaps[0]["roadmap_json"]["id"], web.roadmap_id.as_str());
        assert_eq!(data["pagination"]["totalRoadmaps"], 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn test_views_and_helpful_count_on_shared_roadmaps(db: PgPool) {
        let owner = insert_user(&db).await;
        let public = stored(&db, &owner, "Web Development", true).await;
        let private = stored(&db, &owner, "Web Development", false).await;
        let state = state(db);

        let Json(first) = handle_get_shared(State(state.clone()), Path(public.roadmap_id.clone()))
            .await
            .unwrap();
        assert_eq!(first.data.unwrap().views, 1);

        for expected in 1..=2 {
            let Json(body) =
                handle_mark_helpful(State(state.clone()), Path(public.roadmap_id.clone()))
                    .await
                    .unwrap();
            assert_eq!(body["helpful"], expected);
        }

        assert!(matches!(
            handle_mark_helpful(State(state.clone()), Path(private.roadmap_id.clone())).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            handle_get_shared(State(state), Path(private.roadmap_id)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL pointing at Postgres"]
    async fn test_only_the_owner_edits_and_lists(db: PgPool) {
        let owner = insert_user(&db).await;
        let stranger = insert_user(&db).await;
        let roadmap = stored(&db, &owner, "Web Development", false).await;
        let state = state(db);

        let edit = || RoadmapEdit {
            title: Some("My Web Path".to_string()),
            is_public: Some(true),
            ..Default::default()
        };
        let denied = handle_edit(
            State(state.clone()),
            AuthUser(stranger.clone()),
            Path(roadmap.roadmap_id.clone()),
            JsonBody(edit()),
        )
        .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        let Json(body) = handle_edit(
            State(state.clone()),
            AuthUser(owner.clone()),
            Path(roadmap.roadmap_id.clone()),
            JsonBody(edit()),
        )
        .await
        .unwrap();
        let edited = body.data.unwrap();
        assert_eq!(edited.roadmap.roadmap_json.title, "My Web Path");
        assert!(edited.roadmap.is_public);
        assert_eq!(edited.roadmap.status, "completed");

        let denied = handle_list_owned(State(state.clone()), AuthUser(stranger), Path(owner.id)).await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
        let Json(own) = handle_list_owned(State(state), AuthUser(owner.clone()), Path(owner.id))
            .await
            .unwrap();
        assert_eq!(own.data.unwrap().len(), 1);
    }
}
