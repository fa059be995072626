//! # storage-adapters
//!
//! Implementations of the persistence ports: the Authoritative Store's
//! [`PollRepository`](domains::PollRepository) and the Local Mirror's
//! [`LocalCache`](domains::LocalCache).

#[cfg(feature = "json-file")]
pub mod json_file;
pub mod local_cache;
pub mod memory;

#[cfg(feature = "json-file")]
pub use json_file::JsonFileRepository;
pub use local_cache::{FileCache, MemoryCache};
pub use memory::InMemoryRepository;
