use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A voting member, as imported from the membership roster.
/// The SMS number doubles as the member's unique identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub sms_number: String,
}

impl Member {
    pub fn new(name: impl Into<String>, sms_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sms_number: sms_number.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoteMode {
    #[default]
    Resolution,
    Election,
}

/// The closed ballot for resolution votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotChoice {
    Yes,
    No,
    Abstain,
    Cause,
}

impl BallotChoice {
    /// Display order used in summaries.
    pub const ALL: [BallotChoice; 4] = [
        BallotChoice::Yes,
        BallotChoice::No,
        BallotChoice::Abstain,
        BallotChoice::Cause,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BallotChoice::Yes => "yes",
            BallotChoice::No => "no",
            BallotChoice::Abstain => "abstain",
            BallotChoice::Cause => "cause",
        }
    }
}

impl fmt::Display for BallotChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a member actually voted for. Tagged by mode so a resolution ballot
/// can never be compared against an election candidate by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastValue {
    Resolution(BallotChoice),
    Election(String),
}

impl fmt::Display for CastValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastValue::Resolution(choice) => f.write_str(choice.as_str()),
            CastValue::Election(candidate) => f.write_str(candidate),
        }
    }
}

/// One member's most recent vote in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub member_id: String,
    pub member_name: String,
    pub value: CastValue,
    pub timestamp: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(member: &Member, value: CastValue) -> Self {
        Self {
            member_id: member.sms_number.clone(),
            member_name: member.name.clone(),
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Member id -> latest vote. At most one record per member.
pub type VoteLog = HashMap<String, VoteRecord>;

/// Snapshot of the session fields, as returned by `Coordinator::status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub open: bool,
    pub title: String,
    pub mode: VoteMode,
    pub candidates: Vec<String>,
}
