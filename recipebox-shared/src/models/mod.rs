/// Database models for Recipebox
///
/// # Models
///
/// - `user`: User accounts and authentication
/// - `recipe`: Recipes, scoped to their owner
/// - `tag`, `ingredient`: Named labels attached to recipes
/// - `label`: Queries shared by tags and ingredients
///
/// # Example
///
/// ```no_run
/// use recipebox_shared::db::pool::{create_pool, PoolConfig};
/// use recipebox_shared::models::user::{CreateUser, User};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&PoolConfig::new("postgresql://localhost/recipebox")).await?;
///
/// let user = User::create_user(&pool, CreateUser::new("user@example.com", "testpass123")).await?;
/// println!("created {}", user);
/// # Ok(())
/// # }
/// ```

pub mod ingredient;
pub mod label;
pub mod recipe;
pub mod tag;
pub mod user;
