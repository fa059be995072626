//! crates/domains/src/lib.rs
//!
//! Poll and vote-ledger domain for PollStream: models, admission rules, the
//! error taxonomy, and the ports that storage, HTTP and client adapters implement.

pub mod admission;
pub mod clock;
pub mod error;
pub mod ids;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use admission::*;
pub use clock::*;
pub use error::*;
pub use models::*;
pub use ports::*;
