//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound GET
//!     → server.rs (Axum setup, request ID, tracing)
//!     → decode.rs (target URL from ?url= or hex path)
//!     → [security::host validates the target host]
//!     → forward.rs (outbound GET, redirect policy)
//!     → filter.rs (status, Content-Type, Content-Length, header allow-list)
//!     → body.rs (byte-capped streaming to the caller)
//! ```
//!
//! Any stage's failure is an `error::ProxyError`, which ends the request.

pub mod body;
pub mod decode;
pub mod error;
pub mod filter;
pub mod forward;
pub mod request;
pub mod server;

pub use error::ProxyError;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
