//! # Ports
//!
//! Any adapter must implement these traits to be plugged into the services.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::admission::Ballot;
use crate::error::DomainError;
use crate::models::{NewPoll, Poll, PollId, PollSnapshot};

/// Persistence contract for the Authoritative Store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Stores the poll and its ledger unless the id is taken. Returns whether it inserted.
    async fn insert_if_absent(&self, snapshot: PollSnapshot) -> Result<bool, DomainError>;

    async fn get(&self, id: &str) -> Result<Option<PollSnapshot>, DomainError>;

    async fn list(&self) -> Result<BTreeMap<PollId, Poll>, DomainError>;

    /// Runs [`crate::admission::admit`] against one poll as a single
    /// read-modify-write and returns the updated snapshot.
    async fn cast_vote(&self, id: &str, ballot: Ballot, now: i64) -> Result<PollSnapshot, DomainError>;
}

/// Client-side key-value storage backing the Local Mirror.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;
    async fn set(&self, key: &str, value: String) -> Result<(), DomainError>;
}

/// The Authoritative Store as seen from a client.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_poll(&self, request: NewPoll) -> Result<(), DomainError>;
    async fn fetch_poll(&self, id: &str) -> Result<PollSnapshot, DomainError>;
    async fn submit_vote(&self, id: &str, ballot: Ballot) -> Result<PollSnapshot, DomainError>;
}
