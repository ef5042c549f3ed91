//! API client module
//!
//! HTTP client for the archive node's `/api/v1` routes.

pub mod client;
pub mod endpoints;

pub use client::{ApiClient, FetchedIndex};
