//! # Host Bridge Traits
//!
//! Capability contracts the access layer needs from its host process.
//!
//! ## Overview
//!
//! The token broker and the Drive fetcher never talk to the network or the wall
//! clock directly. They go through the traits in this crate so that the host
//! (a web server, a worker, a test harness) decides how requests are sent and
//! what "now" means.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Executes exactly one HTTP request per call
//! - [`Clock`](time::Clock) - Wall-clock source used for token expiry math
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Retry ownership
//!
//! `HttpClient::execute` must not retry on its own. Retry, backoff and rate
//! limiting live in `core-auth`, which needs to count every outbound call.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! should map their native errors onto it so that callers can tell timeouts and
//! connection failures apart from everything else.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter instance can be
//! shared across every request handled by the process.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
