//! Vote session coordinator: the state machine over one voting session per
//! organization. All durable state goes through the injected [`VoteStore`];
//! every inbound message is audited before any validation runs.

use crate::audit::AuditSink;
use crate::error::{Error, Result};
use crate::models::{
    BallotChoice, CastValue, Member, SessionStatus, VoteMode, VoteRecord,
};
use crate::store::VoteStore;
use crate::tally::{self, VoteSummary};
use chrono::Local;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

const INSTRUCTIONS_MESSAGE: &str = "Welcome to text message voting. Text yes to vote yes, \
    no to vote no, abstain to vote abstain, cause to vote cause. In an election, text the \
    name of a candidate.";
const INVALID_INPUT_MESSAGE: &str =
    "Your vote was NOT RECORDED, your message was invalid.";
const NOT_VOTING_MESSAGE: &str = "Not currently open for voting";
const NOT_VALID_NUMBER_MESSAGE: &str =
    "We dont have a record of your number, tell the clerk your name and this number";

/// Per-message result of a cast. These are expected outcomes, not errors;
/// each one maps to a reply the gateway relays verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastOutcome {
    VoteRecorded { value: CastValue, title: String },
    UnknownMember,
    SessionClosed,
    InstructionsRequested,
    InvalidVote { candidates: Vec<String> },
}

impl CastOutcome {
    /// Human-readable reply for the member who texted in.
    pub fn response_text(&self) -> String {
        match self {
            CastOutcome::VoteRecorded { value, title } => {
                format!("Your vote has been recorded, you voted {value} for {title}")
            }
            CastOutcome::UnknownMember => NOT_VALID_NUMBER_MESSAGE.to_string(),
            CastOutcome::SessionClosed => NOT_VOTING_MESSAGE.to_string(),
            CastOutcome::InstructionsRequested => INSTRUCTIONS_MESSAGE.to_string(),
            CastOutcome::InvalidVote { candidates } if candidates.is_empty() => {
                INVALID_INPUT_MESSAGE.to_string()
            }
            CastOutcome::InvalidVote { candidates } => {
                format!(
                    "{} Valid choices: {}",
                    INVALID_INPUT_MESSAGE,
                    candidates.join(", ")
                )
            }
        }
    }
}

/// Resolution ballots match on substrings, checked in priority order so a
/// message containing several keywords resolves deterministically
/// (cause > abstain > yes > no).
fn ballot_from_text(text: &str) -> Option<BallotChoice> {
    let lowered = text.to_lowercase();
    if lowered.contains("cause") {
        Some(BallotChoice::Cause)
    } else if lowered.contains("abstain") {
        Some(BallotChoice::Abstain)
    } else if lowered.contains("yes") {
        Some(BallotChoice::Yes)
    } else if lowered.contains("no") {
        Some(BallotChoice::No)
    } else {
        None
    }
}

/// Election votes must name exactly one candidate; substring matches are
/// rejected so partial names cannot land on the wrong candidate.
fn candidate_from_text(text: &str, candidates: &[String]) -> Option<String> {
    let trimmed = text.trim();
    candidates
        .iter()
        .find(|candidate| candidate.trim().eq_ignore_ascii_case(trimmed))
        .cloned()
}

fn is_instructions_request(text: &str) -> bool {
    text.to_lowercase().contains("instructions")
}

pub struct Coordinator {
    store: Arc<dyn VoteStore>,
    audit: Arc<dyn AuditSink>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn VoteStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Open a session, overwriting any session already open for the org.
    /// Callers that want the previous session archived must `stop` first.
    pub async fn start(
        &self,
        org: &str,
        title: &str,
        mode: VoteMode,
        candidates: &[String],
    ) -> Result<()> {
        if self.store.members(org).await.is_empty() {
            return Err(Error::EmptyMembership);
        }
        if mode == VoteMode::Election && candidates.is_empty() {
            return Err(Error::MissingCandidates);
        }

        let candidates: &[String] = match mode {
            VoteMode::Election => candidates,
            VoteMode::Resolution => &[],
        };
        self.store.set_session_title(org, title).await?;
        self.store.set_vote_mode(org, mode).await?;
        self.store.set_candidates(org, candidates).await?;
        self.store.set_session_open(org, true).await?;
        info!("{}: session \"{}\" opened ({:?})", org, title, mode);
        Ok(())
    }

    /// Handle one inbound message. The raw text is audited unconditionally,
    /// before any validation. Validation failures come back as outcomes;
    /// only a storage write fault is an error (retryable by the gateway).
    pub async fn cast(&self, org: &str, member_id: &str, raw_text: &str) -> Result<CastOutcome> {
        let title = self.store.session_title(org).await;
        self.audit.append(org, member_id, raw_text, &title).await;

        let members = self.store.members(org).await;
        let Some(member) = members.get(member_id) else {
            return Ok(CastOutcome::UnknownMember);
        };
        if !self.store.session_open(org).await {
            return Ok(CastOutcome::SessionClosed);
        }
        if is_instructions_request(raw_text) {
            return Ok(CastOutcome::InstructionsRequested);
        }

        let mode = self.store.vote_mode(org).await;
        let value = match mode {
            VoteMode::Resolution => ballot_from_text(raw_text).map(CastValue::Resolution),
            VoteMode::Election => {
                let candidates = self.store.candidates(org).await;
                match candidate_from_text(raw_text, &candidates) {
                    Some(candidate) => Some(CastValue::Election(candidate)),
                    None => return Ok(CastOutcome::InvalidVote { candidates }),
                }
            }
        };
        let Some(value) = value else {
            return Ok(CastOutcome::InvalidVote { candidates: vec![] });
        };

        // Last write wins: a changed vote simply replaces the earlier record.
        self.store
            .add_vote(org, VoteRecord::new(member, value.clone()))
            .await?;
        info!("{}: {} voted {}", org, member.name, value);
        Ok(CastOutcome::VoteRecorded { value, title })
    }

    /// Close the session: archive the final summary, then reset all session
    /// fields and clear the log. The session is closed before the snapshot
    /// is taken so a racing cast lands in `SessionClosed` instead of being
    /// silently dropped by the clear.
    pub async fn stop(&self, org: &str) -> Result<VoteSummary> {
        self.store.set_session_open(org, false).await?;

        let summary = self.results(org).await;
        let date = Local::now().format("%Y_%m_%d");
        let key = format!("{}_{}", date, summary.title);
        // Archive before touching the log; a failed write leaves the log
        // intact and the stop retryable.
        self.store
            .write_archive(org, &key, &tally::render_summary(&summary))
            .await?;

        self.store.set_session_title(org, "").await?;
        self.store.set_vote_mode(org, VoteMode::Resolution).await?;
        self.store.set_candidates(org, &[]).await?;
        self.store.clear_vote_log(org).await?;
        info!("{}: session \"{}\" closed and archived as {}", org, summary.title, key);
        Ok(summary)
    }

    /// Session fields as they stand; no side effects.
    pub async fn status(&self, org: &str) -> SessionStatus {
        SessionStatus {
            open: self.store.session_open(org).await,
            title: self.store.session_title(org).await,
            mode: self.store.vote_mode(org).await,
            candidates: self.store.candidates(org).await,
        }
    }

    /// Live tally of the current vote log.
    pub async fn results(&self, org: &str) -> VoteSummary {
        let title = self.store.session_title(org).await;
        let mode = self.store.vote_mode(org).await;
        let candidates = self.store.candidates(org).await;
        let log = self.store.vote_log(org).await;
        let members = self.store.members(org).await;
        tally::summarize(&title, mode, &candidates, &log, &members)
    }

    /// Concatenate every summary archived for the org on the given date
    /// (formatted `YYYY_MM_DD`).
    pub async fn export_archive(&self, org: &str, date: &str) -> Result<String> {
        let keys = self.store.list_archive_keys(org, date).await;
        if keys.is_empty() {
            return Err(Error::ArchiveNotFound {
                org: org.to_string(),
                date: date.to_string(),
            });
        }

        let mut combined = String::new();
        for key in keys {
            match self.store.read_archive(org, &key).await {
                Some(content) => combined.push_str(&content),
                None => warn!("{}: archive key {} listed but unreadable", org, key),
            }
        }
        Ok(combined)
    }

    pub async fn members(&self, org: &str) -> HashMap<String, Member> {
        self.store.members(org).await
    }

    /// Replace the whole roster. Membership is import-only; there is no
    /// per-member edit.
    pub async fn replace_members(&self, org: &str, members: HashMap<String, Member>) -> Result<()> {
        let count = members.len();
        self.store.replace_members(org, members).await?;
        info!("{}: membership replaced, {} members", org, count);
        Ok(())
    }

    /// Find a member id by case-insensitive name fragment, for operators
    /// casting a vote relayed on someone's behalf.
    pub async fn member_id_for_name(&self, org: &str, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        self.store
            .members(org)
            .await
            .into_iter()
            .find(|(_, member)| member.name.to_lowercase().contains(&needle))
            .map(|(id, _)| id)
    }
}
