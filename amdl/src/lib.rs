//! amdl library crate.
//!
//! Exposes the job engine, the catalog client, the stream resolver and the
//! HTTP API so the binary and the integration tests can wire them together.

pub mod api;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod utils;

pub use error::{Error, Result};
