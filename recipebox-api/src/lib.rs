//! # Recipebox API Server Library
//!
//! This library provides the HTTP layer of the Recipebox recipe service.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and auth layers
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with `ApiError`
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
