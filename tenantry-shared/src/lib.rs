//! # Tenantry Shared Library
//!
//! Types, persistence and cross-cutting logic used by the Tenantry API
//! server.
//!
//! ## Module Organization
//!
//! - `auth`: passwords, JWTs, API-key credentials and request guards
//! - `db`: connection pool and embedded migrations
//! - `models`: users and API keys
//! - `pagination`: query-string paging, filters and SQL rendering
//! - `message`: localized message bundles
//! - `dashboard`: date-range and percentage helpers
//! - `file`: upload limits and local storage
//! - `health`: health indicators

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod file;
pub mod health;
pub mod message;
pub mod models;
pub mod pagination;

/// Current version of the Tenantry shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
