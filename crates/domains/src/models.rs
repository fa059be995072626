//! # Domain Models
//!
//! Polls and their per-poll vote ledgers. Everything serializes in camelCase
//! so the persisted document, the HTTP bodies and the client cache share one shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type PollId = String;

/// Index of an option in the poll's choice list at creation time.
pub type OptionId = u32;

/// One selectable answer and its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub count: u64,
}

/// A question with a fixed set of options.
///
/// `total_votes` always equals the sum of the option counts; every write path
/// goes through [`crate::admission`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOption>,
    /// Creation time in unix milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub total_votes: u64,
}

impl Poll {
    /// Builds a poll with zeroed counts; option ids are the choice positions.
    pub fn new<I, S>(id: impl Into<PollId>, question: impl Into<String>, choices: I, timestamp: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = choices
            .into_iter()
            .enumerate()
            .map(|(idx, text)| PollOption {
                id: idx as OptionId,
                text: text.into(),
                count: 0,
            })
            .collect();

        Self {
            id: id.into(),
            question: question.into(),
            options,
            timestamp,
            total_votes: 0,
        }
    }

    pub fn option(&self, id: OptionId) -> Option<&PollOption> {
        self.options.iter().find(|opt| opt.id == id)
    }

    pub fn option_mut(&mut self, id: OptionId) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|opt| opt.id == id)
    }

    /// Sum of the per-option counts.
    pub fn tallied_votes(&self) -> u64 {
        self.options.iter().map(|opt| opt.count).sum()
    }

    pub fn is_consistent(&self) -> bool {
        self.total_votes == self.tallied_votes()
    }

    /// Rounded share of the vote for an option, 0 when nobody has voted.
    pub fn percentage(&self, id: OptionId) -> u64 {
        match (self.option(id), self.total_votes) {
            (Some(opt), total) if total > 0 => (opt.count * 100 + total / 2) / total,
            _ => 0,
        }
    }
}

/// Which option an identity picked, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    pub option_id: OptionId,
    pub time: i64,
}

/// Per-poll ledger of who has voted and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    #[serde(default)]
    pub session_votes: BTreeMap<String, VoteEntry>,
    #[serde(default)]
    pub device_votes: BTreeMap<String, VoteEntry>,
    /// Vote timestamps in arrival order
    #[serde(default)]
    pub recent_activity: Vec<i64>,
}

impl VoteRecord {
    /// Once the activity log grows past this many entries it is truncated.
    pub const ACTIVITY_CAP: usize = 50;
    /// Number of most recent entries kept on truncation.
    pub const ACTIVITY_RETAIN: usize = 30;

    pub fn session_vote(&self, session_id: &str) -> Option<&VoteEntry> {
        self.session_votes.get(session_id)
    }

    pub fn device_vote(&self, device_sig: &str) -> Option<&VoteEntry> {
        self.device_votes.get(device_sig)
    }

    pub fn push_activity(&mut self, time: i64) {
        self.recent_activity.push(time);
        if self.recent_activity.len() > Self::ACTIVITY_CAP {
            let excess = self.recent_activity.len() - Self::ACTIVITY_RETAIN;
            self.recent_activity.drain(..excess);
        }
    }

    /// Removes the most recent occurrence of `time` from the activity log.
    pub fn remove_activity(&mut self, time: i64) {
        if let Some(pos) = self.recent_activity.iter().rposition(|t| *t == time) {
            self.recent_activity.remove(pos);
        }
    }

    /// Counts activity strictly younger than `window_ms` relative to `now`.
    pub fn activity_within(&self, now: i64, window_ms: i64) -> usize {
        self.recent_activity
            .iter()
            .filter(|time| now - **time < window_ms)
            .count()
    }
}

/// A poll together with its ledger, as returned by reads and accepted votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub poll: Poll,
    pub votes: VoteRecord,
}

impl PollSnapshot {
    /// A freshly created poll with an empty ledger.
    pub fn fresh(poll: Poll) -> Self {
        Self {
            poll,
            votes: VoteRecord::default(),
        }
    }
}

/// Create request as sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPoll {
    pub id: PollId,
    pub question: String,
    pub choices: Vec<String>,
}

/// The whole persisted state: every poll and every ledger, keyed by poll id.
///
/// Used both for the server's JSON file and for the client's cached blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDocument {
    #[serde(default)]
    pub polls: BTreeMap<PollId, Poll>,
    #[serde(default)]
    pub votes: BTreeMap<PollId, VoteRecord>,
}

impl PollDocument {
    /// Returns the poll with its ledger; a missing ledger reads as empty.
    pub fn snapshot(&self, id: &str) -> Option<PollSnapshot> {
        let poll = self.polls.get(id)?.clone();
        let votes = self.votes.get(id).cloned().unwrap_or_default();
        Some(PollSnapshot { poll, votes })
    }

    /// Inserts the snapshot unless the id is taken. Returns whether it inserted.
    pub fn insert_if_absent(&mut self, snapshot: PollSnapshot) -> bool {
        if self.polls.contains_key(&snapshot.poll.id) {
            return false;
        }
        let id = snapshot.poll.id.clone();
        self.votes.insert(id.clone(), snapshot.votes);
        self.polls.insert(id, snapshot.poll);
        true
    }

    /// Overwrites the poll and its ledger.
    pub fn replace(&mut self, snapshot: PollSnapshot) {
        let id = snapshot.poll.id.clone();
        self.votes.insert(id.clone(), snapshot.votes);
        self.polls.insert(id, snapshot.poll);
    }

    /// Mutable access to a poll and its ledger, creating an empty ledger if needed.
    pub fn entry_mut(&mut self, id: &str) -> Option<(&mut Poll, &mut VoteRecord)> {
        let poll = self.polls.get_mut(id)?;
        let votes = self.votes.entry(id.to_string()).or_default();
        Some((poll, votes))
    }
}
