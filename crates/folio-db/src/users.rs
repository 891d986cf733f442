//! PostgreSQL implementation of the user account repository.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{
    new_v7, CreateUserRequest, Error, Result, UpdateUserRequest, User, UserRepository,
};

/// PostgreSQL-backed user accounts.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Hash a password with Argon2id in PHC string format.
    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored PHC hash.
    fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
        User {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            username: row.get("username"),
            is_admin: row.get("is_admin"),
            is_disabled: row.get("is_disabled"),
            force_password_change: row.get("force_password_change"),
            created_at_utc: row.get("created_at_utc"),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<User> {
        if req.username.trim().is_empty() {
            return Err(Error::InvalidInput("username must not be empty".into()));
        }
        if req.password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".into()));
        }

        let id = new_v7();
        let password_hash = Self::hash_password(&req.password)?;
        let now = Utc::now();

        // New accounts always pick their own password on first login.
        let row = sqlx::query(
            r#"
            INSERT INTO app_user
                (id, first_name, last_name, username, password_hash, is_admin,
                 is_disabled, force_password_change, created_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, TRUE, $7)
            RETURNING id, first_name, last_name, username, is_admin, is_disabled,
                      force_password_change, created_at_utc
            "#,
        )
        .bind(id)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(&req.username)
        .bind(&password_hash)
        .bind(req.is_admin)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::row_to_user(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, username, is_admin, is_disabled,
                   force_password_change, created_at_utc
            FROM app_user
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, username, is_admin, is_disabled,
                   force_password_change, created_at_utc
            FROM app_user
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| Self::row_to_user(&r)))
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, username, is_admin, is_disabled,
                   force_password_change, created_at_utc
            FROM app_user
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::row_to_user).collect())
    }

    async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<User> {
        let row = sqlx::query(
            r#"
            UPDATE app_user SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                is_disabled = COALESCE($4, is_disabled)
            WHERE id = $1
            RETURNING id, first_name, last_name, username, is_admin, is_disabled,
                      force_password_change, created_at_utc
            "#,
        )
        .bind(id)
        .bind(&req.first_name)
        .bind(&req.last_name)
        .bind(req.is_disabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| Self::row_to_user(&r))
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn set_role(&self, id: Uuid, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE app_user SET is_admin = $2 WHERE id = $1")
            .bind(id)
            .bind(is_admin)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn set_password(&self, id: Uuid, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".into()));
        }

        let password_hash = Self::hash_password(password)?;

        let result = sqlx::query(
            "UPDATE app_user SET password_hash = $2, force_password_change = FALSE \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn validate_login(&self, username: &str, password: &str) -> Result<User> {
        let row = sqlx::query(
            r#"
            SELECT password_hash, id, first_name, last_name, username, is_admin,
                   is_disabled, force_password_change, created_at_utc
            FROM app_user
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Err(Error::Unauthorized("Invalid username or password".into()));
        };

        let stored_hash: String = row.get("password_hash");
        if !Self::verify_password(password, &stored_hash)? {
            return Err(Error::Unauthorized("Incorrect username or password".into()));
        }

        // Invariant: a wrong password on a disabled account reports
        // Unauthorized, never Forbidden.
        let user = Self::row_to_user(&row);
        if user.is_disabled {
            return Err(Error::Forbidden("Your account has been disabled".into()));
        }

        Ok(user)
    }
}
