/// Request authentication context
///
/// The API server's auth layer validates the bearer token, loads the user
/// row and inserts an [`AuthContext`] into the request extensions. Handlers
/// pull it out with `Extension<AuthContext>` and use `user_id` to scope
/// every query.

use serde::{Deserialize, Serialize};

use super::jwt::JwtError;
use crate::models::user::User;

/// Identity of the caller for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user id
    pub user_id: i64,

    /// Email, for logging
    pub email: String,

    /// May use the admin endpoints
    pub is_staff: bool,

    /// Has every permission
    pub is_superuser: bool,
}

impl AuthContext {
    /// Builds the context from a loaded user row
    ///
    /// # Errors
    ///
    /// Inactive users are rejected the same way as unknown ones.
    pub fn from_user(user: &User) -> Result<Self, AuthError> {
        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        Ok(Self {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        })
    }

    /// Whether the caller may use the admin endpoints
    ///
    /// Only the staff flag counts; a superuser whose staff flag was
    /// cleared is locked out like anyone else.
    pub fn can_administer(&self) -> bool {
        self.is_staff
    }
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    /// Token subject no longer exists
    #[error("User not found")]
    UnknownUser,

    /// User exists but is deactivated
    #[error("User inactive or deleted")]
    Inactive,
}

/// Extracts the token from an `Authorization` header value
///
/// Accepts `Bearer <token>` and, for compatibility with token-auth clients,
/// `Token <token>`.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty token".to_string()));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_active: bool, is_staff: bool) -> User {
        User {
            id: 3,
            email: "user@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "User".to_string(),
            is_active,
            is_staff,
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_auth_context_from_user() {
        let context = AuthContext::from_user(&user(true, false)).unwrap();

        assert_eq!(context.user_id, 3);
        assert_eq!(context.email, "user@example.com");
        assert!(!context.can_administer());
    }

    #[test]
    fn test_staff_can_administer() {
        let context = AuthContext::from_user(&user(true, true)).unwrap();
        assert!(context.can_administer());
    }

    #[test]
    fn test_superuser_without_staff_cannot_administer() {
        let mut demoted = user(true, false);
        demoted.is_superuser = true;

        let context = AuthContext::from_user(&demoted).unwrap();
        assert!(context.is_superuser);
        assert!(!context.can_administer());
    }

    #[test]
    fn test_inactive_user_rejected() {
        assert!(matches!(
            AuthContext::from_user(&user(false, true)),
            Err(AuthError::Inactive)
        ));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(parse_bearer("Token abc.def").unwrap(), "abc.def");
        assert!(matches!(parse_bearer("Basic xyz"), Err(AuthError::InvalidFormat(_))));
        assert!(matches!(parse_bearer("Bearer   "), Err(AuthError::InvalidFormat(_))));
    }
}
