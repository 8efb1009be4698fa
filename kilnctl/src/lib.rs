//! Kiln CLI Library
//!
//! This library provides the core functionality for the kiln CLI tool.
//!
//! # Public API
//!
//! The primary public API is the [`client::KilnClient`] which provides
//! programmatic access to the kiln server. Configuration types are also
//! available via [`config::CliConfig`] and [`config::ConfigBuilder`].
//!
//! ```no_run
//! use kilnctl::client::KilnClient;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = KilnClient::with_config(
//!     "http://localhost:3000".to_string(),
//!     10,  // timeout in seconds
//!     3,   // max retries
//!     Duration::from_millis(500),  // initial retry delay
//! ).await?;
//!
//! client.run(Some("bisque")).await?;
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP client for communicating with the kiln server.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

// In-process mock server, shared with the integration tests
#[doc(hidden)]
pub mod test_utils;
