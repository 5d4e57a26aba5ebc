/// User model and database operations
///
/// Users are identified by email rather than by a username. New accounts go
/// through [`NewUser`], which validates and normalizes the email and hashes
/// the password before anything touches the database.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL DEFAULT '',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipebox_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create_user(&pool, CreateUser::new("Test@EXAMPLE.com", "testpass123")).await?;
/// assert_eq!(user.email, "Test@example.com");
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::auth::password::{self, PasswordError};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, is_active, is_staff, is_superuser, created_at, updated_at";

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// User id
    pub id: i64,

    /// Email address, domain part lower-cased
    pub email: String,

    /// Argon2id hash in PHC format
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name, may be empty
    pub name: String,

    /// Inactive users cannot authenticate
    pub is_active: bool,

    /// May use the admin endpoints
    pub is_staff: bool,

    /// Has every permission
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// Errors from user creation and authentication
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Email was empty
    #[error("Users must have an email address")]
    MissingEmail,

    /// Password could not be hashed or the stored hash is unusable
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Query failed
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Normalizes an email address
///
/// Surrounding whitespace is trimmed and the part after the last `@` is
/// lower-cased. The local part keeps its case. Input without an `@` is
/// returned unchanged.
///
/// ```
/// use recipebox_shared::models::user::normalize_email;
///
/// assert_eq!(normalize_email("Test2@Example.com"), "Test2@example.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Plaintext input for creating a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl CreateUser {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A validated user row ready for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// Validates and hashes a regular account
    ///
    /// # Errors
    ///
    /// `UserError::MissingEmail` if the email is blank. The password is not
    /// hashed in that case.
    pub fn regular(data: CreateUser) -> Result<Self, UserError> {
        if data.email.trim().is_empty() {
            return Err(UserError::MissingEmail);
        }

        Ok(Self {
            email: normalize_email(&data.email),
            password_hash: password::hash_password(&data.password)?,
            name: data.name,
            is_staff: false,
            is_superuser: false,
        })
    }

    /// Same as [`NewUser::regular`] with both staff and superuser set
    pub fn superuser(data: CreateUser) -> Result<Self, UserError> {
        let mut user = Self::regular(data)?;
        user.is_staff = true;
        user.is_superuser = true;
        Ok(user)
    }
}

/// Fields to change on an existing user; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

impl UpdateUser {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.name.is_none()
            && self.is_active.is_none()
            && self.is_staff.is_none()
    }
}

impl User {
    /// Creates a regular user
    pub async fn create_user(pool: &PgPool, data: CreateUser) -> Result<Self, UserError> {
        let new_user = NewUser::regular(data)?;
        Ok(Self::insert(pool, new_user).await?)
    }

    /// Creates a user with staff and superuser flags set
    pub async fn create_superuser(pool: &PgPool, data: CreateUser) -> Result<Self, UserError> {
        let new_user = NewUser::superuser(data)?;
        Ok(Self::insert(pool, new_user).await?)
    }

    /// Inserts an already validated user
    ///
    /// # Errors
    ///
    /// Fails with a database error on a duplicate email (`users_email_key`).
    pub async fn insert(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name, is_staff, is_superuser)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.is_staff)
            .bind(data.is_superuser)
            .fetch_one(pool)
            .await?;

        tracing::info!(user_id = user.id, is_superuser = user.is_superuser, "Created user");
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Looks a user up by email, normalizing the input first
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Checks credentials
    ///
    /// Returns `None` for an unknown email, a wrong password or an inactive
    /// account, without saying which.
    pub async fn authenticate(
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> Result<Option<Self>, UserError> {
        let Some(user) = Self::find_by_email(pool, email).await? else {
            return Ok(None);
        };

        if !user.is_active || !password::verify_password(password, &user.password_hash)? {
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Applies the non-`None` fields of `data`
    ///
    /// Returns `None` if no user has this id.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(email) = data.email {
            builder.push(", email = ").push_bind(normalize_email(&email));
        }
        if let Some(password_hash) = data.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(is_active) = data.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(is_staff) = data.is_staff {
            builder.push(", is_staff = ").push_bind(is_staff);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        builder
            .build_query_as::<User>()
            .fetch_optional(pool)
            .await
    }

    /// All users, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");

        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        let samples = [
            ("test1@EXAMPLE.com", "test1@example.com"),
            ("Test2@Example.com", "Test2@example.com"),
            ("TEST3@EXAMPLE.COM", "TEST3@example.com"),
            ("test4@example.COM", "test4@example.com"),
        ];

        for (email, expected) in samples {
            assert_eq!(normalize_email(email), expected);
        }
    }

    #[test]
    fn test_normalize_email_edge_cases() {
        assert_eq!(normalize_email("  Padded@Example.COM "), "Padded@example.com");
        assert_eq!(normalize_email("odd@local@Example.ORG"), "odd@local@example.org");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn test_new_user_without_email_fails() {
        assert!(matches!(
            NewUser::regular(CreateUser::new("", "test123")),
            Err(UserError::MissingEmail)
        ));
        assert!(matches!(
            NewUser::superuser(CreateUser::new("   ", "test123")),
            Err(UserError::MissingEmail)
        ));
    }

    #[test]
    fn test_new_user_is_normalized_and_hashed() {
        let user = NewUser::regular(CreateUser::new("Test@EXAMPLE.com", "testpass123")).unwrap();

        assert_eq!(user.email, "Test@example.com");
        assert!(password::verify_password("testpass123", &user.password_hash).unwrap());
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_superuser_forces_flags() {
        let user = NewUser::superuser(CreateUser::new("admin@example.com", "test123")).unwrap();

        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[test]
    fn test_user_display_is_email() {
        let user = User {
            id: 1,
            email: "user@example.com".to_string(),
            password_hash: String::new(),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(user.to_string(), "user@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            email: "user@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            name: "User".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_update_user_default_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(!UpdateUser {
            name: Some("x".to_string()),
            ..Default::default()
        }
        .is_empty());
    }
}
