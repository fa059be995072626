//! # PollService
//!
//! Server-side use-cases of the Authoritative Store. Validation lives here;
//! atomicity of each vote is the repository's job.

use std::collections::BTreeMap;
use std::sync::Arc;

use domains::{
    Ballot, Clock, DomainError, NewPoll, Poll, PollId, PollRepository, PollSnapshot, SystemClock,
};
use tracing::{debug, info, warn};

pub struct PollService {
    repo: Arc<dyn PollRepository>,
    clock: Arc<dyn Clock>,
}

impl PollService {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: Arc<dyn PollRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Idempotent create. Returns `false` when the id already existed, in
    /// which case the stored poll is left untouched.
    pub async fn create_poll(&self, request: NewPoll) -> Result<bool, DomainError> {
        if request.id.is_empty() {
            return Err(DomainError::InvalidPayload("poll id is required".into()));
        }
        if request.question.is_empty() {
            return Err(DomainError::InvalidPayload("question is required".into()));
        }

        let poll = Poll::new(
            request.id,
            request.question,
            request.choices,
            self.clock.now_ms(),
        );
        let id = poll.id.clone();
        let options = poll.options.len();

        let inserted = self.repo.insert_if_absent(PollSnapshot::fresh(poll)).await?;
        if inserted {
            info!(poll_id = %id, options, "poll created");
        } else {
            debug!(poll_id = %id, "poll already exists, create ignored");
        }
        Ok(inserted)
    }

    pub async fn get_poll(&self, id: &str) -> Result<PollSnapshot, DomainError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(id.to_string()))
    }

    pub async fn list_polls(&self) -> Result<BTreeMap<PollId, Poll>, DomainError> {
        self.repo.list().await
    }

    /// Admits a vote. Ballots without a client time are stamped with the
    /// server clock.
    pub async fn cast_vote(&self, id: &str, ballot: Ballot) -> Result<PollSnapshot, DomainError> {
        let option_id = ballot.option_id;
        let now = self.clock.now_ms();

        match self.repo.cast_vote(id, ballot, now).await {
            Ok(snapshot) => {
                info!(
                    poll_id = %id,
                    option_id,
                    total_votes = snapshot.poll.total_votes,
                    "vote accepted"
                );
                Ok(snapshot)
            }
            Err(err) => {
                warn!(poll_id = %id, option_id, error = %err, "vote rejected");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{ManualClock, MockPollRepository};
    use mockall::predicate::*;

    fn service(repo: MockPollRepository) -> PollService {
        PollService::with_clock(Arc::new(repo), Arc::new(ManualClock::new(1_000)))
    }

    fn new_poll(id: &str, question: &str) -> NewPoll {
        NewPoll {
            id: id.into(),
            question: question.into(),
            choices: vec!["Red".into(), "Blue".into()],
        }
    }

    #[tokio::test]
    async fn create_builds_zeroed_options_stamped_with_the_clock() {
        let mut repo = MockPollRepository::new();
        repo.expect_insert_if_absent()
            .withf(|snap| {
                snap.poll.id == "p1"
                    && snap.poll.timestamp == 1_000
                    && snap.poll.total_votes == 0
                    && snap.poll.options.len() == 2
                    && snap.poll.options[1].id == 1
                    && snap.votes.session_votes.is_empty()
            })
            .times(1)
            .returning(|_| Ok(true));

        let created = tokio_test::assert_ok!(service(repo).create_poll(new_poll("p1", "Color?")).await);
        assert!(created);
    }

    #[tokio::test]
    async fn create_rejects_empty_question_without_touching_storage() {
        let mut repo = MockPollRepository::new();
        repo.expect_insert_if_absent().never();

        let err = service(repo).create_poll(new_poll("p1", "")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn create_accepts_a_whitespace_question_as_sent() {
        let mut repo = MockPollRepository::new();
        repo.expect_insert_if_absent()
            .withf(|snap| snap.poll.question == "  ")
            .times(1)
            .returning(|_| Ok(true));

        let created = service(repo).create_poll(new_poll("p1", "  ")).await;
        tokio_test::assert_ok!(created);
    }

    #[tokio::test]
    async fn create_rejects_empty_id() {
        let mut repo = MockPollRepository::new();
        repo.expect_insert_if_absent().never();

        let err = service(repo).create_poll(new_poll("", "Q")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn get_maps_missing_poll_to_not_found() {
        let mut repo = MockPollRepository::new();
        repo.expect_get().with(eq("nope")).returning(|_| Ok(None));

        let err = service(repo).get_poll("nope").await.unwrap_err();
        assert_eq!(err, DomainError::NotFound("nope".into()));
    }

    #[tokio::test]
    async fn cast_vote_passes_server_time_to_the_repository() {
        let mut repo = MockPollRepository::new();
        repo.expect_cast_vote()
            .withf(|id, ballot, now| id == "p1" && ballot.option_id == 1 && *now == 1_000)
            .returning(|_, ballot, now| {
                let mut snap = PollSnapshot::fresh(Poll::new("p1", "Q", ["a", "b"], 0));
                domains::admit(&mut snap.poll, &mut snap.votes, &ballot, now)?;
                Ok(snap)
            });

        let snap = service(repo)
            .cast_vote("p1", Ballot::anonymous(1))
            .await
            .unwrap();
        assert_eq!(snap.votes.recent_activity, vec![1_000]);
    }

    #[tokio::test]
    async fn cast_vote_propagates_repository_errors() {
        let mut repo = MockPollRepository::new();
        repo.expect_cast_vote()
            .returning(|id, _, _| Err(DomainError::NotFound(id.to_string())));

        let err = service(repo)
            .cast_vote("gone", Ballot::anonymous(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
