//! # Server
//!
//! HTTP front end for the semsearch engine, plus the logging setup shared by
//! the `semsearch` binary.

pub mod api;
pub mod logging;

pub use api::create_router;
pub use api::handlers::AppState;
