use crate::error::Result;
use crate::models::{Member, VoteLog, VoteMode, VoteRecord};
use crate::store::VoteStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct OrgState {
    vote_log: VoteLog,
    title: String,
    open: bool,
    mode: VoteMode,
    candidates: Vec<String>,
    members: HashMap<String, Member>,
    // key -> blob content, ordered so prefix listing is deterministic
    archives: BTreeMap<String, String>,
}

/// Process-local backend. Strongly consistent, never fails; used for local
/// operation and as the reference implementation in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orgs: RwLock<HashMap<String, OrgState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, org: &str, f: impl FnOnce(&OrgState) -> T) -> T
    where
        T: Default,
    {
        let orgs = self.orgs.read().unwrap();
        orgs.get(org).map(f).unwrap_or_default()
    }

    fn write(&self, org: &str, f: impl FnOnce(&mut OrgState)) {
        let mut orgs = self.orgs.write().unwrap();
        f(orgs.entry(org.to_string()).or_default());
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn vote_log(&self, org: &str) -> VoteLog {
        self.read(org, |s| s.vote_log.clone())
    }

    async fn add_vote(&self, org: &str, record: VoteRecord) -> Result<()> {
        self.write(org, |s| {
            s.vote_log.insert(record.member_id.clone(), record);
        });
        Ok(())
    }

    async fn clear_vote_log(&self, org: &str) -> Result<()> {
        self.write(org, |s| s.vote_log.clear());
        Ok(())
    }

    async fn session_title(&self, org: &str) -> String {
        self.read(org, |s| s.title.clone())
    }

    async fn set_session_title(&self, org: &str, title: &str) -> Result<()> {
        self.write(org, |s| s.title = title.to_string());
        Ok(())
    }

    async fn session_open(&self, org: &str) -> bool {
        self.read(org, |s| s.open)
    }

    async fn set_session_open(&self, org: &str, open: bool) -> Result<()> {
        self.write(org, |s| s.open = open);
        Ok(())
    }

    async fn vote_mode(&self, org: &str) -> VoteMode {
        self.read(org, |s| s.mode)
    }

    async fn set_vote_mode(&self, org: &str, mode: VoteMode) -> Result<()> {
        self.write(org, |s| s.mode = mode);
        Ok(())
    }

    async fn candidates(&self, org: &str) -> Vec<String> {
        self.read(org, |s| s.candidates.clone())
    }

    async fn set_candidates(&self, org: &str, candidates: &[String]) -> Result<()> {
        self.write(org, |s| s.candidates = candidates.to_vec());
        Ok(())
    }

    async fn members(&self, org: &str) -> HashMap<String, Member> {
        self.read(org, |s| s.members.clone())
    }

    async fn replace_members(&self, org: &str, members: HashMap<String, Member>) -> Result<()> {
        self.write(org, |s| s.members = members);
        Ok(())
    }

    async fn write_archive(&self, org: &str, key: &str, content: &str) -> Result<()> {
        self.write(org, |s| {
            s.archives.insert(key.to_string(), content.to_string());
        });
        Ok(())
    }

    async fn list_archive_keys(&self, org: &str, prefix: &str) -> Vec<String> {
        self.read(org, |s| {
            s.archives
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect()
        })
    }

    async fn read_archive(&self, org: &str, key: &str) -> Option<String> {
        self.read(org, |s| s.archives.get(key).cloned())
    }
}
