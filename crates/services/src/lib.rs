//! crates/services/src/lib.rs
//!
//! Application layer: the server-side [`PollService`] over an injected
//! repository, and the client-side [`mirror::LocalMirror`].

pub mod mirror;
pub mod poll_service;

pub use poll_service::PollService;
