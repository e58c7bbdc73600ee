//! Error types for the vote session coordinator.
//!
//! Only genuinely unrecoverable or retryable conditions live here. Expected
//! cast outcomes (unknown member, closed session, invalid vote text) are
//! returned as `CastOutcome` values, not errors.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A session cannot start for a scope with no members loaded.
    #[error("cannot start a vote: the member list is empty")]
    EmptyMembership,

    /// Election sessions need at least one candidate.
    #[error("cannot start an election without candidates")]
    MissingCandidates,

    /// A storage write failed or timed out; the caller may retry.
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    /// No archived summaries matched the requested org/date.
    #[error("no archived summaries for {org} on {date}")]
    ArchiveNotFound { org: String, date: String },
}
