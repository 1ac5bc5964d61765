use sqlx::FromRow;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use common::envelope::{StoredMessage, UserId};

use crate::database::Database;

/// A persisted chat message, as sent through the plaintext chat endpoint
#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub created_at: OffsetDateTime,
}

impl Message {
    pub async fn create(
        sender_id: UserId,
        receiver_id: UserId,
        message: &str,
        db: &Database,
    ) -> Result<Message, sqlx::Error> {
        let created_at = OffsetDateTime::now_utc();

        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (sender_id, receiver_id, message, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, sender_id, receiver_id, message, created_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(message)
        .bind(created_at)
        .fetch_one(&**db)
        .await
    }

    /// Both directions of the conversation between `a` and `b`, oldest first
    pub async fn between(a: UserId, b: UserId, db: &Database) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, message, created_at
            FROM messages
            WHERE (sender_id = ?1 AND receiver_id = ?2)
               OR (sender_id = ?2 AND receiver_id = ?1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&**db)
        .await
    }

    pub fn into_stored(self) -> Result<StoredMessage, time::error::Format> {
        Ok(StoredMessage {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            message: self.message,
            created_at: self.created_at.format(&Rfc3339)?,
        })
    }
}
