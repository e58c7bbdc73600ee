mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use crate::error::Result;
use crate::models::{Member, VoteLog, VoteMode, VoteRecord};
use async_trait::async_trait;
use std::collections::HashMap;

/// Durable-state contract shared by every backend. All methods are scoped
/// to one organization; no data is ever visible across scopes.
///
/// Getters never fail: a backend that cannot read returns the documented
/// default (empty log, empty title, closed, `Resolution`, no candidates,
/// no members) so the coordinator treats "no data" and "unreachable" the
/// same way. Setters report failure so callers can retry writes.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn vote_log(&self, org: &str) -> VoteLog;
    async fn add_vote(&self, org: &str, record: VoteRecord) -> Result<()>;
    async fn clear_vote_log(&self, org: &str) -> Result<()>;

    async fn session_title(&self, org: &str) -> String;
    async fn set_session_title(&self, org: &str, title: &str) -> Result<()>;

    async fn session_open(&self, org: &str) -> bool;
    async fn set_session_open(&self, org: &str, open: bool) -> Result<()>;

    async fn vote_mode(&self, org: &str) -> VoteMode;
    async fn set_vote_mode(&self, org: &str, mode: VoteMode) -> Result<()>;

    async fn candidates(&self, org: &str) -> Vec<String>;
    async fn set_candidates(&self, org: &str, candidates: &[String]) -> Result<()>;

    async fn members(&self, org: &str) -> HashMap<String, Member>;
    async fn replace_members(&self, org: &str, members: HashMap<String, Member>) -> Result<()>;

    /// Write one archived summary blob. Keys are relative to the org's
    /// archive space, e.g. `2024_03_11_Budget Vote`.
    async fn write_archive(&self, org: &str, key: &str, content: &str) -> Result<()>;
    /// List archive keys under the org starting with `prefix`.
    async fn list_archive_keys(&self, org: &str, prefix: &str) -> Vec<String>;
    async fn read_archive(&self, org: &str, key: &str) -> Option<String>;
}
