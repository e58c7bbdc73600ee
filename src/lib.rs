//! Per-organization SMS voting sessions: a lifecycle state machine, a
//! mode-aware tally engine, and a swappable storage backend (in-process or
//! S3) behind one port.

pub mod audit;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod store;
pub mod tally;

pub use coordinator::{CastOutcome, Coordinator};
pub use error::{Error, Result};
pub use models::{BallotChoice, CastValue, Member, SessionStatus, VoteMode, VoteRecord};
pub use store::{MemoryStore, S3Store, VoteStore};
pub use tally::{TallyBucket, VoteSummary};
