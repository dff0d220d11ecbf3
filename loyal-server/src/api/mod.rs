//! HTTP API handlers.

pub mod extractors;
pub mod user;
