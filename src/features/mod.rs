//! Request-independent building blocks used by middleware and dispatch.

pub mod auth;
pub mod mapper;
