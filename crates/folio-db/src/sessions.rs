//! PostgreSQL implementation of the session token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use folio_core::{defaults, AuthUser, Error, Result, SessionRepository};

/// PostgreSQL-backed session tokens.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Generate a random session token.
    fn generate_token() -> String {
        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..defaults::SESSION_TOKEN_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, user_id: Uuid, expires: DateTime<Utc>) -> Result<String> {
        let token = Self::generate_token();

        sqlx::query(
            "INSERT INTO user_session (session_token, user_id, expires) VALUES ($1, $2, $3)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "sessions",
            op = "create",
            user_id = %user_id,
            expires = %expires,
            "Created session"
        );
        Ok(token)
    }

    async fn find_user(&self, token: &str) -> Result<Option<AuthUser>> {
        // Expired tokens and disabled accounts never resolve.
        let row = sqlx::query(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.username, u.is_disabled, u.is_admin
            FROM user_session s
            INNER JOIN app_user u ON u.id = s.user_id
            WHERE s.session_token = $1
              AND s.expires >= $2
              AND u.is_disabled = FALSE
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| AuthUser {
            id: r.get("id"),
            first_name: r.get("first_name"),
            last_name: r.get("last_name"),
            username: r.get("username"),
            is_disabled: r.get("is_disabled"),
            is_admin: r.get("is_admin"),
        }))
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_session WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "sessions",
            op = "delete_for_user",
            user_id = %user_id,
            deleted = result.rows_affected(),
            "Deleted user sessions"
        );
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = PgSessionRepository::generate_token();
        let b = PgSessionRepository::generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), defaults::SESSION_TOKEN_LEN);
    }

    #[test]
    fn test_generated_tokens_are_cookie_safe() {
        let token = PgSessionRepository::generate_token();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
