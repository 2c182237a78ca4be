//! The keep/discard rule.

use serde::{Deserialize, Serialize};

/// Outcome of comparing a candidate against the retained record of its cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// No incumbent: the candidate starts a new cluster
    Unique,
    /// Candidate has more pixels: it replaces the incumbent, whose file is discarded
    CandidateWins,
    /// Incumbent has at least as many pixels: the candidate's file is discarded
    IncumbentWins,
}

impl Decision {
    pub fn is_match(&self) -> bool {
        !matches!(self, Decision::Unique)
    }
}

/// Decide purely on resolution; ties keep the file seen first
pub fn decide(candidate_resolution: u64, incumbent_resolution: Option<u64>) -> Decision {
    match incumbent_resolution {
        None => Decision::Unique,
        Some(incumbent) if candidate_resolution > incumbent => Decision::CandidateWins,
        Some(_) => Decision::IncumbentWins,
    }
}
