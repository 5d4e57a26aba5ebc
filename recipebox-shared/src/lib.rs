//! # Recipebox Shared Library
//!
//! This crate contains the data layer and the auth primitives used by the
//! Recipebox API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, recipes, tags, ingredients)
//! - `reconcile`: Get-or-create of named tags/ingredients on recipe writes
//! - `filters`: Query parameter parsing for list endpoints
//! - `auth`: Password hashing, bearer tokens, request auth context
//! - `storage`: Recipe image validation and storage
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod filters;
pub mod models;
pub mod reconcile;
pub mod storage;

/// Current version of the Recipebox shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
