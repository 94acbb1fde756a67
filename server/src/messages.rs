//! Conversation messages

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::Message;

/// Message service error
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conversation_id is required")]
    MissingConversation,
    #[error("Message must have content or attachment")]
    Empty,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct SendMessageRequest {
    #[validate(length(max = 255))]
    pub conversation_id: Option<String>,
    #[validate(length(max = 10000))]
    pub content: Option<String>,
    #[validate(length(max = 2048))]
    pub attachment_url: Option<String>,
    #[validate(length(max = 100))]
    pub attachment_type: Option<String>,
    pub recipient_user_id: Option<Uuid>,
}

impl SendMessageRequest {
    /// Conversation id, trimmed; blank counts as missing
    pub fn conversation(&self) -> Result<&str, MessageError> {
        self.conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(MessageError::MissingConversation)
    }

    pub fn has_body(&self) -> bool {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.content) || present(&self.attachment_url)
    }
}

pub struct MessageService {
    pool: PgPool,
}

impl MessageService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Messages of a conversation, oldest first
    pub async fn list(
        &self,
        conversation_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, MessageError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn send(&self, sender_id: Uuid, req: &SendMessageRequest) -> Result<Message, MessageError> {
        let conversation_id = req.conversation()?;
        if !req.has_body() {
            return Err(MessageError::Empty);
        }

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_user_id, content, attachment_url, attachment_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(&req.content)
        .bind(&req.attachment_url)
        .bind(&req.attachment_type)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(message_id = %message.id, conversation_id, "message stored");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_conversation_is_missing() {
        let req = SendMessageRequest {
            conversation_id: Some("   ".into()),
            content: Some("hi".into()),
            ..Default::default()
        };
        assert!(matches!(req.conversation(), Err(MessageError::MissingConversation)));
    }

    #[test]
    fn attachment_alone_is_enough() {
        let req = SendMessageRequest {
            conversation_id: Some("c1".into()),
            attachment_url: Some("/api/uploads/c1/file.png".into()),
            ..Default::default()
        };
        assert!(req.has_body());
        assert_eq!(req.conversation().unwrap(), "c1");
    }

    #[test]
    fn whitespace_content_is_empty() {
        let req = SendMessageRequest {
            conversation_id: Some("c1".into()),
            content: Some("  ".into()),
            ..Default::default()
        };
        assert!(!req.has_body());
    }
}
