use async_trait::async_trait;

use common::envelope::{StoredMessage, UserId};
use common::session::{MessageLog, PersistenceError};

use super::models::Message;
use super::Database;

#[async_trait]
impl MessageLog for Database {
    async fn history(&self, a: UserId, b: UserId) -> Result<Vec<StoredMessage>, PersistenceError> {
        let messages = Message::between(a, b, self)
            .await
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        messages
            .into_iter()
            .map(|m| {
                m.into_stored()
                    .map_err(|e| PersistenceError::Provider(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_serves_history() {
        let db = Database::in_memory().await.unwrap();
        Message::create(1, 2, "persisted", &db).await.unwrap();

        let history = db.history(2, 1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "persisted");
        assert_eq!(history[0].sender_id, 1);
    }
}
