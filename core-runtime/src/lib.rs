//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure for the gallery access layer:
//! - Logging and tracing infrastructure
//! - Configuration management (API key, OAuth client, refresh policy)
//! - Event bus for auth and listing outcomes
//!
//! ## Overview
//!
//! `core-auth` and `provider-google-drive` depend on this crate for their
//! configuration types and for publishing events. Nothing in here performs
//! network I/O.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
