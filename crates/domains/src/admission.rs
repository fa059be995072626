//! # Vote admission
//!
//! The rules both tiers apply before a vote counts. The Authoritative Store
//! runs [`admit`] inside its read-modify-write; the Local Mirror runs
//! [`check_eligibility`] first and then the same [`admit`] for its optimistic copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;
use crate::models::{OptionId, Poll, VoteEntry, VoteRecord};

/// Trailing window used by the anti-burst heuristic.
pub const ACTIVITY_WINDOW_MS: i64 = 60_000;

/// More than this many votes inside the window makes a poll ineligible locally.
pub const ACTIVITY_LIMIT: usize = 8;

/// A vote as submitted to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub option_id: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_sig: Option<String>,
    /// Client-observed time; the store falls back to its own clock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

impl Ballot {
    pub fn anonymous(option_id: OptionId) -> Self {
        Self {
            option_id,
            session_id: None,
            device_sig: None,
            time: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_device(mut self, device_sig: impl Into<String>) -> Self {
        self.device_sig = Some(device_sig.into());
        self
    }

    pub fn at(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }

    /// Session identifier, treating an empty string as absent.
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Device signature, treating an empty string as absent.
    pub fn device(&self) -> Option<&str> {
        self.device_sig.as_deref().filter(|s| !s.is_empty())
    }
}

/// Applies a ballot to a poll and its ledger.
///
/// Checks run in a fixed order: session conflict, device conflict, unknown
/// option. Nothing is mutated unless every check passes.
pub fn admit(
    poll: &mut Poll,
    record: &mut VoteRecord,
    ballot: &Ballot,
    now: i64,
) -> Result<VoteEntry, DomainError> {
    if let Some(session) = ballot.session() {
        if record.session_votes.contains_key(session) {
            return Err(DomainError::Conflict("Session already participated".into()));
        }
    }
    if let Some(device) = ballot.device() {
        if record.device_votes.contains_key(device) {
            return Err(DomainError::Conflict("Device already participated".into()));
        }
    }

    let option = poll
        .option_mut(ballot.option_id)
        .ok_or(DomainError::InvalidOption(ballot.option_id))?;
    option.count += 1;
    poll.total_votes += 1;

    let entry = VoteEntry {
        option_id: ballot.option_id,
        time: ballot.time.filter(|t| *t > 0).unwrap_or(now),
    };
    if let Some(session) = ballot.session() {
        record.session_votes.insert(session.to_string(), entry);
    }
    if let Some(device) = ballot.device() {
        record.device_votes.insert(device.to_string(), entry);
    }
    record.push_activity(entry.time);

    Ok(entry)
}

/// Undoes what [`admit`] did for `ballot`.
///
/// Counts saturate at zero. Ledger entries are only removed when they still
/// belong to this vote.
pub fn retract(poll: &mut Poll, record: &mut VoteRecord, ballot: &Ballot, entry: VoteEntry) {
    if let Some(option) = poll.option_mut(entry.option_id) {
        option.count = option.count.saturating_sub(1);
    }
    poll.total_votes = poll.total_votes.saturating_sub(1);

    if let Some(session) = ballot.session() {
        if record.session_votes.get(session) == Some(&entry) {
            record.session_votes.remove(session);
        }
    }
    if let Some(device) = ballot.device() {
        if record.device_votes.get(device) == Some(&entry) {
            record.device_votes.remove(device);
        }
    }
    record.remove_activity(entry.time);
}

/// Why the Local Mirror refuses to even try a vote.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    #[error("Poll data not found")]
    PollDataMissing,

    #[error("Session already participated")]
    SessionAlreadyVoted,

    #[error("Poll already recorded")]
    DeviceAlreadyVoted,

    #[error("Max activity exceeded")]
    ActivityLimitExceeded,
}

/// Local eligibility gate. Reasons are reported in a fixed precedence.
///
/// The activity check counts every participant's recent votes, not just this
/// identity's.
pub fn check_eligibility(
    record: Option<&VoteRecord>,
    session_id: &str,
    device_sig: &str,
    now: i64,
) -> Result<(), Ineligibility> {
    let record = record.ok_or(Ineligibility::PollDataMissing)?;

    if record.session_votes.contains_key(session_id) {
        return Err(Ineligibility::SessionAlreadyVoted);
    }
    if record.device_votes.contains_key(device_sig) {
        return Err(Ineligibility::DeviceAlreadyVoted);
    }
    if record.activity_within(now, ACTIVITY_WINDOW_MS) > ACTIVITY_LIMIT {
        return Err(Ineligibility::ActivityLimitExceeded);
    }
    Ok(())
}
