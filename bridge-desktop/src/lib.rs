//! # Server Bridge Implementations
//!
//! Default implementations of bridge traits for a server process
//! (Linux, macOS, Windows).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! `Clock` uses `bridge_traits::SystemClock` directly and needs no adapter.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
