//! Raw-message audit trail. Every inbound text is appended here before any
//! validation so there is a forensic record even for rejected votes.

use async_trait::async_trait;
use chrono::Local;
use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Write-only sink for inbound message lines. Failures are the sink's
/// problem: `cast` must never fail because the audit write did.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, org: &str, member_id: &str, raw_text: &str, session_title: &str);
}

/// Appends one CSV-ish line per message to a per-day file, e.g.
/// `vote_log2024_03_11.txt`.
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, org: &str, member_id: &str, raw_text: &str, session_title: &str) {
        let day = Local::now().format("%Y_%m_%d");
        let stamp = Local::now().format("%Y_%m_%d_%H:%M:%S");
        let path = self.dir.join(format!("vote_log{day}.txt"));
        let line = format!("{stamp},{org},{member_id},{raw_text},{session_title}\n");

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            warn!("audit append to {} failed: {}", path.display(), err);
        }
    }
}

/// Test sink that keeps lines in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, org: &str, member_id: &str, raw_text: &str, session_title: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{org},{member_id},{raw_text},{session_title}"));
    }
}
