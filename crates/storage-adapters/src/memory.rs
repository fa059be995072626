//! In-memory `PollRepository`. Each poll sits behind its own map shard lock,
//! so a vote's read-modify-write is atomic per poll.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{admit, Ballot, DomainError, Poll, PollDocument, PollId, PollRepository, PollSnapshot};

#[derive(Default)]
pub struct InMemoryRepository {
    polls: DashMap<PollId, PollSnapshot>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository from a persisted document.
    pub fn from_document(doc: PollDocument) -> Self {
        let repo = Self::new();
        for id in doc.polls.keys() {
            if let Some(snapshot) = doc.snapshot(id) {
                repo.polls.insert(id.clone(), snapshot);
            }
        }
        repo
    }
}

#[async_trait]
impl PollRepository for InMemoryRepository {
    async fn insert_if_absent(&self, snapshot: PollSnapshot) -> Result<bool, DomainError> {
        match self.polls.entry(snapshot.poll.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(snapshot);
                Ok(true)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<PollSnapshot>, DomainError> {
        Ok(self.polls.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<BTreeMap<PollId, Poll>, DomainError> {
        Ok(self
            .polls
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().poll.clone()))
            .collect())
    }

    async fn cast_vote(&self, id: &str, ballot: Ballot, now: i64) -> Result<PollSnapshot, DomainError> {
        let mut entry = self
            .polls
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        let snapshot = entry.value_mut();
        admit(&mut snapshot.poll, &mut snapshot.votes, &ballot, now)?;
        Ok(snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn color_poll(id: &str) -> PollSnapshot {
        PollSnapshot::fresh(Poll::new(id, "Color?", ["Red", "Blue"], 1))
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let repo = InMemoryRepository::new();
        assert!(repo.insert_if_absent(color_poll("p")).await.unwrap());

        let mut second = color_poll("p");
        second.poll.options.clear();
        assert!(!repo.insert_if_absent(second).await.unwrap());
        assert_eq!(repo.get("p").await.unwrap().unwrap().poll.options.len(), 2);
    }

    #[tokio::test]
    async fn seeded_from_document() {
        let mut doc = PollDocument::default();
        doc.insert_if_absent(color_poll("a"));
        doc.insert_if_absent(color_poll("b"));

        let repo = InMemoryRepository::from_document(doc);
        let listed = repo.list().await.unwrap();
        assert_eq!(listed.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn concurrent_votes_on_one_poll_are_all_counted() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.insert_if_absent(color_poll("p")).await.unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let ballot = Ballot::anonymous(i % 2).with_session(format!("s{i}"));
                    repo.cast_vote("p", ballot, i as i64).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let snap = repo.get("p").await.unwrap().unwrap();
        assert_eq!(snap.poll.total_votes, 32);
        assert!(snap.poll.is_consistent());
        assert_eq!(snap.votes.session_votes.len(), 32);
    }
}
