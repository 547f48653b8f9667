//! Middleware applied around the per-route dispatch handlers.
//!
//! - `cors` - permissive CORS headers, preflight short-circuit
//! - `auth` - bearer token gate for protected routes

pub mod auth;
pub mod cors;
