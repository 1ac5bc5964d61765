use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use common::envelope::{Identity, UserId};

use crate::database::Database;

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the password itself
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("a user with this email already exists")]
    EmailTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone())
    }

    pub async fn create(
        username: &str,
        email: &str,
        password_hash: &str,
        db: &Database,
    ) -> Result<User, UserError> {
        let created_at = OffsetDateTime::now_utc();

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(&**db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(UserError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(email: &str, db: &Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&**db)
        .await
    }

    /// Every user's public identity, in registration order
    pub async fn list(db: &Database) -> Result<Vec<Identity>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (UserId, String)>(
            r#"
            SELECT id, username
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&**db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, username)| Identity::new(id, username))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let db = Database::in_memory().await.unwrap();
        let user = User::create("alice", "alice@example.com", "$argon2id$fake", &db)
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let found = User::find_by_email("alice@example.com", &db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "$argon2id$fake");

        assert!(User::find_by_email("bob@example.com", &db)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::in_memory().await.unwrap();
        User::create("alice", "same@example.com", "h", &db)
            .await
            .unwrap();
        let result = User::create("alice2", "same@example.com", "h", &db).await;
        assert!(matches!(result, Err(UserError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_list_returns_identities() {
        let db = Database::in_memory().await.unwrap();
        User::create("alice", "a@example.com", "h", &db).await.unwrap();
        User::create("bob", "b@example.com", "h", &db).await.unwrap();

        let users = User::list(&db).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "a@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
