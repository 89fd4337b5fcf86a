//! # GitHub Gist Provider
//!
//! Implements the `RemoteBlobStore` trait over the GitHub Gist REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Bearer token verification against the identity endpoint
//! - Listing of every gist owned by the token, across pages
//! - Private single-file gist creation and in-place updates
//! - Raw downloads for files the API returns truncated
//! - Mapping of HTTP status codes onto `BridgeError`

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{GistConnector, GITHUB_API_BASE};
pub use error::{GistError, Result};
