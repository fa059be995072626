//! JSON bodies of the HTTP surface.

use std::collections::BTreeMap;

use domains::{Poll, PollId, PollSnapshot};
use serde::{Deserialize, Serialize};

/// `POST /polls` success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub ok: bool,
    pub id: PollId,
}

/// `GET /polls`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollListResponse {
    pub polls: BTreeMap<PollId, Poll>,
}

/// Error body of the create and read routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `POST /polls/{id}` success: the updated poll and ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAccepted {
    pub success: bool,
    #[serde(flatten)]
    pub snapshot: PollSnapshot,
}

impl VoteAccepted {
    pub fn new(snapshot: PollSnapshot) -> Self {
        Self {
            success: true,
            snapshot,
        }
    }
}

/// `POST /polls/{id}` rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRejected {
    pub success: bool,
    pub message: String,
}

impl VoteRejected {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
