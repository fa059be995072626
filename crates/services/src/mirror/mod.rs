//! # Local Mirror
//!
//! Client-held copy of poll and vote state. Writes land here first
//! (optimistically), are pushed to the Authoritative Store, and are either
//! confirmed with the server's copy or compensated. Every write to the cached
//! blob is published to subscribers.

mod draft;
mod identity;
mod pending;
mod reconciler;
mod view;

pub use draft::{PollDraft, MAX_CHOICES, MIN_CHOICES};
pub use identity::EnvironmentProfile;
pub use pending::{PendingVote, VoteState};
pub use reconciler::{Reconciler, ReconcilerHandle, DEFAULT_REFRESH_INTERVAL};
pub use view::{PollView, ViewState};

use std::sync::Arc;

use domains::ids::new_identifier;
use domains::{
    admission, Ballot, Clock, DomainError, Ineligibility, LocalCache, NewPoll, OptionId, Poll,
    PollDocument, PollId, PollSnapshot, RemoteStore, SystemClock,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Cache key of the serialized `{polls, votes}` blob.
pub const STORE_KEY: &str = "polls_data";
/// Cache key of the session identifier.
pub const SESSION_KEY: &str = "user_session";

const EVENT_CAPACITY: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error(transparent)]
    Ineligible(#[from] Ineligibility),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Who caused a blob write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A user action on this client (create, optimistic vote, rollback)
    Local,
    /// A copy of server state from a refresh or lookup
    Remote,
    /// The server copy that settled this session's vote
    Confirmed { option_id: OptionId },
}

/// Published after every successful write of the cached blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEvent {
    pub poll_id: PollId,
    pub origin: ChangeOrigin,
}

/// What the view layer needs to render one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participation {
    pub poll: Poll,
    /// Whether this session has a recorded vote
    pub participated: bool,
    pub choice: Option<OptionId>,
}

pub struct LocalMirror {
    cache: Arc<dyn LocalCache>,
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    device_sig: String,
    session_id: OnceCell<String>,
    events: broadcast::Sender<MirrorEvent>,
    /// Serializes load-modify-persist cycles on the blob
    write_lock: Mutex<()>,
}

impl LocalMirror {
    pub fn new(
        cache: Arc<dyn LocalCache>,
        remote: Arc<dyn RemoteStore>,
        profile: &EnvironmentProfile,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache,
            remote,
            clock: Arc::new(SystemClock),
            device_sig: profile.device_signature(),
            session_id: OnceCell::new(),
            events,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent> {
        self.events.subscribe()
    }

    pub fn device_signature(&self) -> &str {
        &self.device_sig
    }

    /// Returns the session identifier, creating and caching it on first use.
    pub async fn session_identifier(&self) -> String {
        self.session_id
            .get_or_init(|| async {
                match self.cache.get(SESSION_KEY).await {
                    Ok(Some(id)) if !id.is_empty() => return id,
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "session identifier unreadable"),
                }
                let id = new_identifier(self.clock.now_ms());
                if let Err(err) = self.cache.set(SESSION_KEY, id.clone()).await {
                    warn!(error = %err, "session identifier not persisted");
                }
                id
            })
            .await
            .clone()
    }

    /// Creates a poll locally, then mirrors it to the server on a best-effort basis.
    pub async fn create_poll<I, S>(&self, question: &str, choices: I) -> Result<PollId, MirrorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let draft = PollDraft::new(question, choices)?;
        let now = self.clock.now_ms();
        let id = new_identifier(now);
        let poll = Poll::new(id.clone(), draft.question.clone(), draft.choices.clone(), now);

        {
            let _guard = self.write_lock.lock().await;
            let mut doc = self.load().await;
            doc.insert_if_absent(PollSnapshot::fresh(poll));
            self.persist(&doc, &id, ChangeOrigin::Local).await;
        }

        let request = NewPoll {
            id: id.clone(),
            question: draft.question,
            choices: draft.choices,
        };
        match self.remote.create_poll(request).await {
            Ok(()) => info!(poll_id = %id, "poll created"),
            Err(err) => warn!(poll_id = %id, error = %err, "failed to persist poll to server"),
        }
        Ok(id)
    }

    pub async fn retrieve_poll(&self, poll_id: &str) -> Option<Poll> {
        self.load().await.polls.remove(poll_id)
    }

    /// Local poll together with its local ledger.
    pub async fn snapshot(&self, poll_id: &str) -> Option<PollSnapshot> {
        self.load().await.snapshot(poll_id)
    }

    pub async fn validate_eligibility(&self, poll_id: &str) -> Result<(), Ineligibility> {
        let doc = self.load().await;
        let session_id = self.session_identifier().await;
        admission::check_eligibility(
            doc.votes.get(poll_id),
            &session_id,
            &self.device_sig,
            self.clock.now_ms(),
        )
    }

    /// Optimistically applies a vote, submits it, and settles it.
    ///
    /// `Err` means the vote never left this client. A returned vote is either
    /// confirmed or rolled back.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        option_id: OptionId,
    ) -> Result<PendingVote, MirrorError> {
        self.validate_eligibility(poll_id).await?;

        let now = self.clock.now_ms();
        let ballot = Ballot::anonymous(option_id)
            .with_session(self.session_identifier().await)
            .with_device(self.device_sig.clone())
            .at(now);

        let entry = {
            let _guard = self.write_lock.lock().await;
            let mut doc = self.load().await;
            let (poll, record) = doc
                .entry_mut(poll_id)
                .ok_or_else(|| DomainError::NotFound(poll_id.to_string()))?;
            let entry = admission::admit(poll, record, &ballot, now)?;
            self.persist(&doc, poll_id, ChangeOrigin::Local).await;
            entry
        };

        let mut pending = PendingVote::new(poll_id, ballot.clone(), entry);
        debug!(poll_id, option_id, "vote applied locally");

        match self.remote.submit_vote(poll_id, ballot).await {
            Ok(snapshot) => {
                let _guard = self.write_lock.lock().await;
                let mut doc = self.load().await;
                doc.replace(snapshot);
                self.persist(&doc, poll_id, ChangeOrigin::Confirmed { option_id })
                    .await;
                pending.confirm();
                info!(poll_id, option_id, "vote confirmed");
            }
            Err(err) => {
                warn!(poll_id, option_id, error = %err, "vote not recorded on server, rolling back");
                self.compensate(&pending).await;
                pending.roll_back(err);
            }
        }
        Ok(pending)
    }

    /// Refreshes one poll from the server. On failure the last-known local
    /// state is kept. Returns the participation derived from whatever is local afterwards.
    ///
    /// A server copy without this session's vote never replaces a local copy
    /// that has it: such a copy was read before the vote reached the server.
    pub async fn reconcile(&self, poll_id: &str) -> Option<Participation> {
        match self.remote.fetch_poll(poll_id).await {
            Ok(snapshot) => {
                let session_id = self.session_identifier().await;
                let _guard = self.write_lock.lock().await;
                let mut doc = self.load().await;
                let local = doc.snapshot(poll_id);
                let predates_vote = local
                    .as_ref()
                    .is_some_and(|l| l.votes.session_vote(&session_id).is_some())
                    && snapshot.votes.session_vote(&session_id).is_none();

                if predates_vote {
                    debug!(poll_id, "server copy predates this session's vote, keeping local state");
                } else if local.as_ref() != Some(&snapshot) {
                    doc.replace(snapshot);
                    self.persist(&doc, poll_id, ChangeOrigin::Remote).await;
                }
            }
            Err(err) => debug!(poll_id, error = %err, "refresh failed, keeping local state"),
        }
        self.participation(poll_id).await
    }

    /// Local lookup first, server second. A server hit is stored locally.
    pub async fn open_poll(&self, poll_id: &str) -> Option<Participation> {
        if let Some(found) = self.participation(poll_id).await {
            return Some(found);
        }
        match self.remote.fetch_poll(poll_id).await {
            Ok(snapshot) => {
                let _guard = self.write_lock.lock().await;
                let mut doc = self.load().await;
                doc.replace(snapshot);
                self.persist(&doc, poll_id, ChangeOrigin::Remote).await;
            }
            Err(err) => {
                warn!(poll_id, error = %err, "server fetch failed");
                return None;
            }
        }
        self.participation(poll_id).await
    }

    pub async fn participation(&self, poll_id: &str) -> Option<Participation> {
        let snapshot = self.load().await.snapshot(poll_id)?;
        let session_id = self.session_identifier().await;
        let choice = snapshot.votes.session_vote(&session_id).map(|v| v.option_id);
        Some(Participation {
            poll: snapshot.poll,
            participated: choice.is_some(),
            choice,
        })
    }

    pub async fn check_participation(&self, poll_id: &str) -> bool {
        self.participant_choice(poll_id).await.is_some()
    }

    pub async fn participant_choice(&self, poll_id: &str) -> Option<OptionId> {
        let doc = self.load().await;
        let session_id = self.session_identifier().await;
        doc.votes
            .get(poll_id)?
            .session_vote(&session_id)
            .map(|v| v.option_id)
    }

    /// Undoes an optimistic vote, but only while the local copy still holds
    /// it. A copy already replaced by server state has nothing to undo.
    async fn compensate(&self, pending: &PendingVote) {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await;
        let Some((poll, record)) = doc.entry_mut(&pending.poll_id) else {
            return;
        };
        let still_applied = pending
            .ballot
            .session()
            .and_then(|s| record.session_vote(s))
            == Some(&pending.entry);
        if !still_applied {
            debug!(poll_id = %pending.poll_id, "optimistic vote already superseded");
            return;
        }
        admission::retract(poll, record, &pending.ballot, pending.entry);
        self.persist(&doc, &pending.poll_id, ChangeOrigin::Local).await;
    }

    /// Reads the blob. Missing or unparsable data reads as empty state.
    async fn load(&self) -> PollDocument {
        match self.cache.get(STORE_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "local cache unparsable, treating as empty");
                PollDocument::default()
            }),
            Ok(None) => PollDocument::default(),
            Err(err) => {
                warn!(error = %err, "local cache read failed");
                PollDocument::default()
            }
        }
    }

    async fn persist(&self, doc: &PollDocument, poll_id: &str, origin: ChangeOrigin) {
        let raw = match serde_json::to_string(doc) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "local cache serialization failed");
                return;
            }
        };
        if let Err(err) = self.cache.set(STORE_KEY, raw).await {
            warn!(error = %err, "local cache write failed");
            return;
        }
        // No subscribers is fine.
        let _ = self.events.send(MirrorEvent {
            poll_id: poll_id.to_string(),
            origin,
        });
    }
}
