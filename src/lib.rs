//! Image Asset Proxy Library
//!
//! Fetches remote images on a caller's behalf and streams them back,
//! refusing targets that resolve into private or link-local networks.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
