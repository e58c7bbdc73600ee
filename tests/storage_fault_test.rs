//! Write faults must surface as retryable errors while reads degrade to
//! defaults. Exercised through a wrapper backend that can be switched into
//! a failing state, the way an unreachable object store would behave.

use async_trait::async_trait;
use sms_quorum::audit::MemoryAuditSink;
use sms_quorum::{
    CastOutcome, Coordinator, Error, Member, MemoryStore, VoteMode, VoteRecord, VoteStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Delegates to a `MemoryStore` but refuses writes while `down` is set.
/// Reads keep their degraded-to-default behavior by answering from the
/// inner store (which simply has nothing new in it).
struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> sms_quorum::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(Error::StorageUnavailable("backend is down".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl VoteStore for FlakyStore {
    async fn vote_log(&self, org: &str) -> sms_quorum::models::VoteLog {
        self.inner.vote_log(org).await
    }

    async fn add_vote(&self, org: &str, record: VoteRecord) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.add_vote(org, record).await
    }

    async fn clear_vote_log(&self, org: &str) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.clear_vote_log(org).await
    }

    async fn session_title(&self, org: &str) -> String {
        self.inner.session_title(org).await
    }

    async fn set_session_title(&self, org: &str, title: &str) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.set_session_title(org, title).await
    }

    async fn session_open(&self, org: &str) -> bool {
        self.inner.session_open(org).await
    }

    async fn set_session_open(&self, org: &str, open: bool) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.set_session_open(org, open).await
    }

    async fn vote_mode(&self, org: &str) -> VoteMode {
        self.inner.vote_mode(org).await
    }

    async fn set_vote_mode(&self, org: &str, mode: VoteMode) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.set_vote_mode(org, mode).await
    }

    async fn candidates(&self, org: &str) -> Vec<String> {
        self.inner.candidates(org).await
    }

    async fn set_candidates(&self, org: &str, candidates: &[String]) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.set_candidates(org, candidates).await
    }

    async fn members(&self, org: &str) -> HashMap<String, Member> {
        self.inner.members(org).await
    }

    async fn replace_members(
        &self,
        org: &str,
        members: HashMap<String, Member>,
    ) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.replace_members(org, members).await
    }

    async fn write_archive(&self, org: &str, key: &str, content: &str) -> sms_quorum::Result<()> {
        self.check()?;
        self.inner.write_archive(org, key, content).await
    }

    async fn list_archive_keys(&self, org: &str, prefix: &str) -> Vec<String> {
        self.inner.list_archive_keys(org, prefix).await
    }

    async fn read_archive(&self, org: &str, key: &str) -> Option<String> {
        self.inner.read_archive(org, key).await
    }
}

fn roster() -> HashMap<String, Member> {
    [("+1".to_string(), Member::new("Ann", "+1"))].into()
}

#[tokio::test]
async fn cast_surfaces_write_fault_as_retryable() {
    let store = Arc::new(FlakyStore::new());
    let coordinator = Coordinator::new(store.clone(), Arc::new(MemoryAuditSink::new()));
    coordinator.replace_members("cb7", roster()).await.unwrap();
    coordinator
        .start("cb7", "Budget", VoteMode::Resolution, &[])
        .await
        .unwrap();

    store.set_down(true);
    let err = coordinator.cast("cb7", "+1", "yes").await.unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));

    // The retry succeeds once the backend is back; no state was corrupted.
    store.set_down(false);
    let outcome = coordinator.cast("cb7", "+1", "yes").await.unwrap();
    assert!(matches!(outcome, CastOutcome::VoteRecorded { .. }));
}

#[tokio::test]
async fn failed_stop_keeps_the_vote_log() {
    let store = Arc::new(FlakyStore::new());
    let coordinator = Coordinator::new(store.clone(), Arc::new(MemoryAuditSink::new()));
    coordinator.replace_members("cb7", roster()).await.unwrap();
    coordinator
        .start("cb7", "Budget", VoteMode::Resolution, &[])
        .await
        .unwrap();
    coordinator.cast("cb7", "+1", "yes").await.unwrap();

    store.set_down(true);
    assert!(coordinator.stop("cb7").await.is_err());
    // Nothing was archived and nothing was cleared; a later stop can retry.
    assert_eq!(store.vote_log("cb7").await.len(), 1);

    store.set_down(false);
    let summary = coordinator.stop("cb7").await.unwrap();
    assert_eq!(summary.bucket("yes").unwrap().voters, vec!["Ann"]);
    assert!(store.vote_log("cb7").await.is_empty());
}

#[tokio::test]
async fn start_surfaces_write_fault() {
    let store = Arc::new(FlakyStore::new());
    let coordinator = Coordinator::new(store.clone(), Arc::new(MemoryAuditSink::new()));
    coordinator.replace_members("cb7", roster()).await.unwrap();

    store.set_down(true);
    let err = coordinator
        .start("cb7", "Budget", VoteMode::Resolution, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)));
}
