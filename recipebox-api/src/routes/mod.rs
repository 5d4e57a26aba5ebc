/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration, token exchange and own profile
/// - `recipes`: Recipe CRUD, filtering and image upload
/// - `tags`, `ingredients`: Listing, renaming and deleting labels
/// - `admin`: Staff-only views across all users

pub mod admin;
pub mod health;
pub mod ingredients;
pub mod labels;
pub mod recipes;
pub mod tags;
pub mod users;
