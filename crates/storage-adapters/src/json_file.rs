//! Single-file JSON implementation of `PollRepository`.
//!
//! Every operation reads the whole `{polls, votes}` document and every write
//! replaces it. A per-instance mutex serializes the read-modify-write cycle,
//! so one process never loses its own updates. Separate processes sharing
//! the file still race, last write wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domains::{
    admit, Ballot, DomainError, Poll, PollDocument, PollId, PollRepository, PollSnapshot,
};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct JsonFileRepository {
    path: PathBuf,
    /// Held across each read-modify-write of the document
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates parent directories and an empty document if the file is absent.
    pub async fn ensure_store(&self) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        if !fs::try_exists(&self.path).await? {
            info!(path = %self.path.display(), "initializing poll store");
            self.write_document(&PollDocument::default()).await?;
        }
        Ok(())
    }

    async fn read_document(&self) -> Result<PollDocument, DomainError> {
        self.ensure_store().await?;
        let raw = fs::read_to_string(&self.path).await?;
        if raw.trim().is_empty() {
            return Ok(PollDocument::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Replaces the document through a sibling temp file and a rename.
    async fn write_document(&self, doc: &PollDocument) -> Result<(), DomainError> {
        let raw = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), polls = doc.polls.len(), "poll store written");
        Ok(())
    }
}

#[async_trait]
impl PollRepository for JsonFileRepository {
    async fn insert_if_absent(&self, snapshot: PollSnapshot) -> Result<bool, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;
        let inserted = doc.insert_if_absent(snapshot);
        if inserted {
            self.write_document(&doc).await?;
        }
        Ok(inserted)
    }

    async fn get(&self, id: &str) -> Result<Option<PollSnapshot>, DomainError> {
        Ok(self.read_document().await?.snapshot(id))
    }

    async fn list(&self) -> Result<BTreeMap<PollId, Poll>, DomainError> {
        Ok(self.read_document().await?.polls)
    }

    async fn cast_vote(&self, id: &str, ballot: Ballot, now: i64) -> Result<PollSnapshot, DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;
        let (poll, votes) = doc
            .entry_mut(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        admit(poll, votes, &ballot, now)?;
        let snapshot = PollSnapshot {
            poll: poll.clone(),
            votes: votes.clone(),
        };
        self.write_document(&doc).await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(dir: &tempfile::TempDir) -> JsonFileRepository {
        JsonFileRepository::new(dir.path().join("data").join("polls.json"))
    }

    fn color_poll(id: &str) -> PollSnapshot {
        PollSnapshot::fresh(Poll::new(id, "Color?", ["Red", "Blue"], 1))
    }

    #[tokio::test]
    async fn store_is_created_on_first_access() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);

        assert!(repo.list().await.unwrap().is_empty());

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc, serde_json::json!({ "polls": {}, "votes": {} }));
    }

    #[tokio::test]
    async fn empty_file_reads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        repo.ensure_store().await.unwrap();
        std::fs::write(repo.path(), "").unwrap();

        assert!(repo.get("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn votes_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        tokio_test::assert_ok!(repo(&dir).insert_if_absent(color_poll("p1")).await);

        let ballot = Ballot::anonymous(1).with_session("s1").at(5);
        repo(&dir).cast_vote("p1", ballot, 9).await.unwrap();

        let snap = repo(&dir).get("p1").await.unwrap().unwrap();
        assert_eq!(snap.poll.options[1].count, 1);
        assert_eq!(snap.poll.total_votes, 1);
        assert_eq!(snap.votes.session_vote("s1").unwrap().option_id, 1);
    }

    #[tokio::test]
    async fn duplicate_create_keeps_the_first_poll() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        assert!(repo.insert_if_absent(color_poll("p1")).await.unwrap());

        let mut other = color_poll("p1");
        other.poll.question = "Replaced?".into();
        assert!(!repo.insert_if_absent(other).await.unwrap());

        assert_eq!(repo.get("p1").await.unwrap().unwrap().poll.question, "Color?");
    }

    #[tokio::test]
    async fn rejected_vote_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        repo.insert_if_absent(color_poll("p1")).await.unwrap();
        let before = std::fs::read_to_string(repo.path()).unwrap();

        let err = repo.cast_vote("p1", Ballot::anonymous(5), 1).await.unwrap_err();
        assert_eq!(err, DomainError::InvalidOption(5));
        assert_eq!(std::fs::read_to_string(repo.path()).unwrap(), before);

        let err = repo.cast_vote("missing", Ballot::anonymous(0), 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_store_surfaces_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        repo.ensure_store().await.unwrap();
        std::fs::write(repo.path(), "{ nope").unwrap();

        assert!(matches!(repo.list().await, Err(DomainError::Storage(_))));
    }
}
