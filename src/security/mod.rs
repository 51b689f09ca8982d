//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (Via loop check, outbound header allow-list)
//!     → host.rs (resolve target host, check against block-list)
//!     → blocklist.rs (byte-prefix rules, shared read-only)
//!
//! Outbound fetch:
//!     → host.rs GuardedResolver (every connection, redirect hops included)
//! ```
//!
//! # Design Decisions
//! - Fail closed: resolution errors count as blocked
//! - No trust in client input
//! - Rules are loaded once and never mutated

pub mod blocklist;
pub mod headers;
pub mod host;

pub use blocklist::{AddressFamily, BlockList, BlockedNetworkRule};
pub use headers::HeaderPolicy;
pub use host::{GuardedResolver, HostError, HostValidator};
