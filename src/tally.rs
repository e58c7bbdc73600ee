//! Mode-aware tally engine. Pure functions over a vote log snapshot; no
//! storage access and no side effects beyond a warning for stale votes.

use crate::models::{BallotChoice, CastValue, Member, VoteLog, VoteMode};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One result bucket: a ballot value (or candidate) and the names of the
/// members who chose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyBucket {
    pub label: String,
    pub voters: Vec<String>,
}

/// Derived, read-only grouping of the vote log. Buckets are always complete:
/// every ballot value (resolution) or configured candidate (election) is
/// present even with zero votes, in its configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub title: String,
    pub mode: VoteMode,
    pub buckets: Vec<TallyBucket>,
    pub not_voted: Vec<String>,
}

impl VoteSummary {
    pub fn bucket(&self, label: &str) -> Option<&TallyBucket> {
        self.buckets.iter().find(|b| b.label == label)
    }

    pub fn total_votes(&self) -> usize {
        self.buckets.iter().map(|b| b.voters.len()).sum()
    }
}

pub fn summarize(
    title: &str,
    mode: VoteMode,
    candidates: &[String],
    log: &VoteLog,
    members: &HashMap<String, Member>,
) -> VoteSummary {
    let labels: Vec<String> = match mode {
        VoteMode::Resolution => BallotChoice::ALL.iter().map(|c| c.to_string()).collect(),
        VoteMode::Election => candidates.to_vec(),
    };

    // Every declared bucket is present up front so zero-vote values still show.
    let mut grouped: HashMap<&str, Vec<String>> = labels
        .iter()
        .map(|label| (label.as_str(), Vec::new()))
        .collect();

    for record in log.values() {
        let label = match (&record.value, mode) {
            (CastValue::Resolution(choice), VoteMode::Resolution) => choice.as_str().to_string(),
            (CastValue::Election(candidate), VoteMode::Election) => candidate.clone(),
            // A vote left over from before a mode change; drop it.
            _ => {
                warn!(
                    "dropping stale vote from {}: wrong mode for {:?}",
                    record.member_id, mode
                );
                continue;
            }
        };
        match grouped.get_mut(label.as_str()) {
            Some(voters) => voters.push(record.member_name.clone()),
            // Candidate list changed under an existing vote; drop it too.
            None => warn!(
                "dropping stale vote from {}: no bucket for {:?}",
                record.member_id, label
            ),
        }
    }

    let buckets = labels
        .iter()
        .map(|label| {
            let mut voters = grouped.remove(label.as_str()).unwrap_or_default();
            voters.sort();
            TallyBucket {
                label: label.clone(),
                voters,
            }
        })
        .collect();

    let mut not_voted: Vec<String> = members
        .values()
        .filter(|member| !log.contains_key(&member.sms_number))
        .map(|member| member.name.clone())
        .collect();
    not_voted.sort();

    VoteSummary {
        title: title.to_string(),
        mode,
        buckets,
        not_voted,
    }
}

/// Human-readable summary text, written verbatim to the archive on stop.
pub fn render_summary(summary: &VoteSummary) -> String {
    let mut out = String::new();
    out.push_str("------------------ \n");
    out.push_str(&format!("Vote Summary for {}\n", summary.title));
    out.push_str("Voting Summary:\n");
    for bucket in &summary.buckets {
        out.push_str(&format!("{} {} votes \n", bucket.voters.len(), bucket.label));
    }
    out.push_str("----Raw Log ----- \n");
    for bucket in &summary.buckets {
        for voter in &bucket.voters {
            out.push_str(&format!("{} voted {} \n", voter, bucket.label));
        }
    }
    if !summary.not_voted.is_empty() {
        out.push_str(&format!("Did not vote: {} \n", summary.not_voted.join(", ")));
    }
    out
}
