use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::envelope::{self, Envelope};
use crate::errors::AppError;
use crate::extract::JsonBody;
use crate::models::contact::{ContactKind, ContactMessage};
use crate::state::AppState;
use crate::validation::{is_valid_email, Validator};

const NAME_MESSAGE: &str = "Name must be at least 2 characters";
const EMAIL_MESSAGE: &str = "Please provide a valid email";

fn long_enough(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check(long_enough(&self.name, 2), "name", NAME_MESSAGE)
            .check(is_valid_email(self.email.trim()), "email", EMAIL_MESSAGE)
            .require_non_empty(&self.subject, "subject", "Subject is required")
            .check(
                long_enough(&self.message, 10),
                "message",
                "Message must be at least 10 characters",
            )
            .finish()
    }

    fn into_message(self) -> ContactMessage {
        ContactMessage {
            id: Uuid::new_v4(),
            kind: ContactKind::Message.as_str().to_string(),
            name: Some(self.name.trim().to_string()),
            email: normalize_email(&self.email),
            subject: Some(self.subject.trim().to_string()),
            body: Some(self.message.trim().to_string()),
            rating: None,
            category: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub feedback: String,
    pub category: Option<String>,
}

impl FeedbackRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Validator::new()
            .check(long_enough(&self.name, 2), "name", NAME_MESSAGE)
            .check(is_valid_email(self.email.trim()), "email", EMAIL_MESSAGE)
            .check((1..=5).contains(&self.rating), "rating", "Rating must be between 1 and 5")
            .check(
                long_enough(&self.feedback, 10),
                "feedback",
                "Feedback must be at least 10 characters",
            )
            .finish()
    }

    fn into_message(self) -> ContactMessage {
        ContactMessage {
            id: Uuid::new_v4(),
            kind: ContactKind::Feedback.as_str().to_string(),
            name: Some(self.name.trim().to_string()),
            email: normalize_email(&self.email),
            subject: None,
            body: Some(self.feedback.trim().to_string()),
            rating: Some(self.rating as i16),
            category: self.category.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        }
    }
}

async fn insert_message(db: &PgPool, message: &ContactMessage) -> Result<ContactMessage, AppError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO contact_messages (id, kind, name, email, subject, body, rating, category, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(message.id)
    .bind(&message.kind)
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.subject)
    .bind(&message.body)
    .bind(message.rating)
    .bind(&message.category)
    .bind(message.created_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// POST /api/contact
pub async fn handle_contact(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ContactRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    req.validate()?;
    let saved = insert_message(&state.db, &req.into_message()).await?;
    info!("Contact message {} received from {}", saved.id, saved.email);
    Ok(envelope::message_only(
        "Message sent successfully! We'll get back to you soon.",
    ))
}

/// POST /api/contact/newsletter
pub async fn handle_newsletter(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewsletterRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    Validator::new()
        .check(is_valid_email(req.email.trim()), "email", EMAIL_MESSAGE)
        .finish()?;

    let message = ContactMessage {
        id: Uuid::new_v4(),
        kind: ContactKind::Newsletter.as_str().to_string(),
        name: None,
        email: normalize_email(&req.email),
        subject: None,
        body: None,
        rating: None,
        category: None,
        created_at: Utc::now(),
    };
    let saved = insert_message(&state.db, &message).await?;
    info!("Newsletter subscription {} for {}", saved.id, saved.email);
    Ok(envelope::message_only("Successfully subscribed to newsletter!"))
}

/// POST /api/contact/feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<FeedbackRequest>,
) -> Result<Json<Envelope<()>>, AppError> {
    req.validate()?;
    let saved = insert_message(&state.db, &req.into_message()).await?;
    info!(
        "Feedback {} received (rating {:?}, category {:?})",
        saved.id, saved.rating, saved.category
    );
    Ok(envelope::message_only("Thank you for your feedback!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_fields(result: Result<(), AppError>) -> Vec<String> {
        match result {
            Err(AppError::InvalidFields(fields)) => fields.into_iter().map(|f| f.field).collect(),
            Ok(()) => vec![],
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_contact_validation() {
        let ok = ContactRequest {
            name: "Ada".to_string(),
            email: " Ada@Example.com ".to_string(),
            subject: "Hello".to_string(),
            message: "I would like to know more.".to_string(),
        };
        assert!(failed_fields(ok.validate()).is_empty());

        let bad = ContactRequest {
            name: " A ".to_string(),
            email: "ada".to_string(),
            subject: "  ".to_string(),
            message: "short".to_string(),
        };
        assert_eq!(failed_fields(bad.validate()), vec!["name", "email", "subject", "message"]);
    }

    #[test]
    fn test_contact_message_is_normalized() {
        let message = ContactRequest {
            name: " Ada ".to_string(),
            email: " Ada@Example.com ".to_string(),
            subject: "Hello".to_string(),
            message: " I would like to know more. ".to_string(),
        }
        .into_message();
        assert_eq!(message.kind, "message");
        assert_eq!(message.email, "ada@example.com");
        assert_eq!(message.name.as_deref(), Some("Ada"));
        assert_eq!(message.body.as_deref(), Some("I would like to know more."));
    }

    #[test]
    fn test_feedback_validation_and_shape() {
        let bad = FeedbackRequest {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            rating: 7,
            feedback: "meh".to_string(),
            category: None,
        };
        assert_eq!(failed_fields(bad.validate()), vec!["rating", "feedback"]);

        let ok = FeedbackRequest {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            rating: 4,
            feedback: "The roadmap view is great".to_string(),
            category: Some(" ".to_string()),
        };
        assert!(failed_fields(ok.validate()).is_empty());
        let message = ok.into_message();
        assert_eq!(message.kind, "feedback");
        assert_eq!(message.rating, Some(4));
        assert!(message.category.is_none());
    }
}
