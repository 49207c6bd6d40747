//! Data providers for chunked and feature collections.

pub mod cache;
pub mod error;
pub mod interface;
pub mod json;
pub mod pg;
