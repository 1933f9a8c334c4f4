//! # Tenantry API Server Library
//!
//! HTTP surface of Tenantry: user accounts, API keys, uploads, health and
//! an admin dashboard, all answering with the same localized envelope.
//!
//! ## Modules
//!
//! - `app`: Application state, router and auth layers
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with enveloped errors
//! - `middleware`: Request context and security headers
//! - `response`: Success envelopes and response metadata
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
