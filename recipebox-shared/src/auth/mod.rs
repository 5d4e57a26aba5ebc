/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Bearer token generation and validation
/// - [`middleware`]: Per-request auth context and header parsing
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use recipebox_shared::auth::{jwt, password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = password::hash_password("testpass123")?;
/// assert!(password::verify_password("testpass123", &hash)?);
///
/// let token = jwt::issue_token(1, "secret-key-of-at-least-32-bytes!!", Duration::hours(1))?;
/// assert!(!token.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
