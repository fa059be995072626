//! Lifecycle of one optimistic vote: `Pending → Confirmed | RolledBack`.

use domains::{Ballot, DomainError, OptionId, PollId, VoteEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteState {
    /// Applied locally, awaiting the Authoritative Store
    Pending,
    /// Accepted by the store; the local copy now mirrors the server
    Confirmed,
    /// Rejected or unreachable; the local increment has been undone
    RolledBack { reason: DomainError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    pub poll_id: PollId,
    pub ballot: Ballot,
    /// What the optimistic step wrote into the local ledger
    pub entry: VoteEntry,
    state: VoteState,
}

impl PendingVote {
    pub fn new(poll_id: impl Into<PollId>, ballot: Ballot, entry: VoteEntry) -> Self {
        Self {
            poll_id: poll_id.into(),
            ballot,
            entry,
            state: VoteState::Pending,
        }
    }

    pub fn option_id(&self) -> OptionId {
        self.entry.option_id
    }

    pub fn state(&self) -> &VoteState {
        &self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == VoteState::Confirmed
    }

    /// Moves `Pending → Confirmed`. Settled votes are left as they are.
    pub fn confirm(&mut self) -> bool {
        self.settle(VoteState::Confirmed)
    }

    /// Moves `Pending → RolledBack`. Settled votes are left as they are.
    pub fn roll_back(&mut self, reason: DomainError) -> bool {
        self.settle(VoteState::RolledBack { reason })
    }

    /// Text suitable for a transient user notification.
    pub fn message(&self) -> String {
        match &self.state {
            VoteState::Pending => "Vote pending".to_string(),
            VoteState::Confirmed => "Vote counted".to_string(),
            VoteState::RolledBack {
                reason: DomainError::Network(_),
            } => "Network error".to_string(),
            VoteState::RolledBack {
                reason: DomainError::Conflict(msg),
            } => msg.clone(),
            VoteState::RolledBack { .. } => "Failed to record vote on server".to_string(),
        }
    }

    fn settle(&mut self, next: VoteState) -> bool {
        if self.state != VoteState::Pending {
            return false;
        }
        self.state = next;
        true
    }
}
