use crate::error::{Error, Result};
use crate::models::{Member, VoteLog, VoteMode, VoteRecord};
use crate::store::VoteStore;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;

// S3 caps a single DeleteObjects request at 1000 keys.
const DELETE_CHUNK_SIZE: usize = 1000;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort backend over a keyed blob store. Session fields live in one
/// blob each; the vote log is one blob per member so concurrent casts from
/// different members never touch the same key.
///
/// Read faults degrade to the port's defaults (logged, never propagated);
/// write faults surface as `Error::StorageUnavailable` so callers can retry.
pub struct S3Store {
    client: Client,
    bucket: String,
    op_timeout: Duration,
}

/// Internal read outcome: `Ok(None)` means the key genuinely does not exist,
/// `Err` means the backend could not be asked. Getters collapse both to a
/// default but only the latter is worth a warning.
type Fetch<T> = std::result::Result<Option<T>, String>;

impl S3Store {
    /// Connect using ambient AWS credentials (env, profile, instance role).
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::with_client(Client::new(&config), bucket)
    }

    /// Build from an existing client, e.g. one pointed at a local S3 stand-in.
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        info!("S3 store ready, bucket: {}", bucket);
        Self {
            client,
            bucket,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    fn org_key(org: &str, name: &str) -> String {
        format!("orgs/{org}/{name}")
    }

    fn vote_log_prefix(org: &str) -> String {
        format!("orgs/{org}/vote_log/")
    }

    fn archive_prefix(org: &str) -> String {
        format!("summaries/{org}/")
    }

    async fn fetch(&self, key: &str) -> Fetch<String> {
        let request = self.client.get_object().bucket(&self.bucket).key(key);
        let response = match timeout(self.op_timeout, request.send()).await {
            Err(_) => return Err(format!("get {key} timed out")),
            Ok(Err(err)) => {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    return Ok(None);
                }
                return Err(format!("get {key}: {service}"));
            }
            Ok(Ok(response)) => response,
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| format!("read body of {key}: {e}"))?;
        Ok(Some(String::from_utf8_lossy(&bytes.into_bytes()).into_owned()))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, key: &str) -> Fetch<T> {
        match self.fetch(key).await? {
            None => Ok(None),
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| format!("decode {key}: {e}")),
        }
    }

    /// Collapse a fetch to the getter default, warning only on real faults.
    fn or_default<T: Default>(fetched: Fetch<T>) -> T {
        match fetched {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(reason) => {
                warn!("S3 read degraded to default: {}", reason);
                T::default()
            }
        }
    }

    async fn put(&self, key: &str, body: String) -> Result<()> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body.into_bytes()));
        match timeout(self.op_timeout, request.send()).await {
            Err(_) => Err(Error::StorageUnavailable(format!("put {key} timed out"))),
            Ok(Err(err)) => Err(Error::StorageUnavailable(format!("put {key}: {err}"))),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let body = serde_json::to_string(value)
            .map_err(|e| Error::StorageUnavailable(format!("encode {key}: {e}")))?;
        self.put(key, body).await
    }

    /// List every key under `prefix`, following continuation tokens.
    async fn list_keys(&self, prefix: &str) -> std::result::Result<Vec<String>, String> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }
            let response = match timeout(self.op_timeout, request.send()).await {
                Err(_) => return Err(format!("list {prefix} timed out")),
                Ok(Err(err)) => return Err(format!("list {prefix}: {err}")),
                Ok(Ok(response)) => response,
            };
            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl VoteStore for S3Store {
    /// O(n) fan-out: one GET per member who has voted. Blobs that fail to
    /// fetch or decode are skipped so one bad record cannot sink the tally.
    async fn vote_log(&self, org: &str) -> VoteLog {
        let prefix = Self::vote_log_prefix(org);
        let keys = match self.list_keys(&prefix).await {
            Ok(keys) => keys,
            Err(reason) => {
                warn!("S3 read degraded to default: {}", reason);
                return VoteLog::new();
            }
        };

        let mut log = VoteLog::new();
        for key in keys {
            match self.fetch_json::<VoteRecord>(&key).await {
                Ok(Some(record)) => {
                    log.insert(record.member_id.clone(), record);
                }
                Ok(None) => {} // deleted between list and get; a clear is racing us
                Err(reason) => warn!("skipping vote blob: {}", reason),
            }
        }
        log
    }

    async fn add_vote(&self, org: &str, record: VoteRecord) -> Result<()> {
        let key = format!("{}{}", Self::vote_log_prefix(org), record.member_id);
        self.put_json(&key, &record).await
    }

    async fn clear_vote_log(&self, org: &str) -> Result<()> {
        let keys = self
            .list_keys(&Self::vote_log_prefix(org))
            .await
            .map_err(Error::StorageUnavailable)?;
        if keys.is_empty() {
            return Ok(());
        }

        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            let objects = chunk
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| Error::StorageUnavailable(format!("bad delete key: {e}")))
                })
                .collect::<Result<Vec<_>>>()?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| Error::StorageUnavailable(format!("build delete: {e}")))?;
            let request = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete);
            match timeout(self.op_timeout, request.send()).await {
                Err(_) => {
                    return Err(Error::StorageUnavailable("clear vote log timed out".into()));
                }
                Ok(Err(err)) => {
                    return Err(Error::StorageUnavailable(format!("clear vote log: {err}")));
                }
                Ok(Ok(response)) => {
                    for failure in response.errors() {
                        warn!(
                            "failed to delete vote blob {}: {}",
                            failure.key().unwrap_or("?"),
                            failure.message().unwrap_or("unknown error"),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    async fn session_title(&self, org: &str) -> String {
        Self::or_default(
            self.fetch_json(&Self::org_key(org, "current_vote_name.json"))
                .await,
        )
    }

    async fn set_session_title(&self, org: &str, title: &str) -> Result<()> {
        self.put_json(&Self::org_key(org, "current_vote_name.json"), &title)
            .await
    }

    async fn session_open(&self, org: &str) -> bool {
        Self::or_default(
            self.fetch_json(&Self::org_key(org, "currently_in_a_voting_session.json"))
                .await,
        )
    }

    async fn set_session_open(&self, org: &str, open: bool) -> Result<()> {
        self.put_json(
            &Self::org_key(org, "currently_in_a_voting_session.json"),
            &open,
        )
        .await
    }

    async fn vote_mode(&self, org: &str) -> VoteMode {
        Self::or_default(self.fetch_json(&Self::org_key(org, "vote_mode.json")).await)
    }

    async fn set_vote_mode(&self, org: &str, mode: VoteMode) -> Result<()> {
        self.put_json(&Self::org_key(org, "vote_mode.json"), &mode)
            .await
    }

    async fn candidates(&self, org: &str) -> Vec<String> {
        Self::or_default(self.fetch_json(&Self::org_key(org, "candidates.json")).await)
    }

    async fn set_candidates(&self, org: &str, candidates: &[String]) -> Result<()> {
        self.put_json(&Self::org_key(org, "candidates.json"), &candidates)
            .await
    }

    async fn members(&self, org: &str) -> HashMap<String, Member> {
        Self::or_default(self.fetch_json(&Self::org_key(org, "members.json")).await)
    }

    async fn replace_members(&self, org: &str, members: HashMap<String, Member>) -> Result<()> {
        self.put_json(&Self::org_key(org, "members.json"), &members)
            .await
    }

    async fn write_archive(&self, org: &str, key: &str, content: &str) -> Result<()> {
        let full_key = format!("{}{}", Self::archive_prefix(org), key);
        self.put(&full_key, content.to_string()).await
    }

    async fn list_archive_keys(&self, org: &str, prefix: &str) -> Vec<String> {
        let base = Self::archive_prefix(org);
        let full_prefix = format!("{base}{prefix}");
        match self.list_keys(&full_prefix).await {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|key| key.strip_prefix(&base).map(str::to_string))
                .collect(),
            Err(reason) => {
                warn!("S3 read degraded to default: {}", reason);
                Vec::new()
            }
        }
    }

    async fn read_archive(&self, org: &str, key: &str) -> Option<String> {
        let full_key = format!("{}{}", Self::archive_prefix(org), key);
        match self.fetch(&full_key).await {
            Ok(body) => body,
            Err(reason) => {
                warn!("S3 read degraded to default: {}", reason);
                None
            }
        }
    }
}
