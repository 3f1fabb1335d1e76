// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A registered candidate. The position in the registration list defines
/// the candidate index used everywhere else.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub name: String,
}

/// One ballot shape: a full preference order over the registered
/// candidates, by name, cast by `count` voters.
///
/// The ranking must mention every registered candidate exactly once.
/// Anything else is rejected per ballot, before the tally is touched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub ranking: Vec<String>,
    pub count: u64,
}

// ******** Output data structures *********

/// The outcome of one majority duel between two candidates.
///
/// Duels are reported in lock-processing order (descending margin).
/// `locked` is false for duels rejected because committing them would have
/// closed a cycle in the locked graph.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DuelStats {
    pub winner: String,
    pub loser: String,
    pub votes_for: u64,
    pub votes_against: u64,
    pub margin: u64,
    pub locked: bool,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    /// Winners in candidate registration order. More than one entry means
    /// the electorate produced an unresolved tie; it is reported as such.
    pub winners: Vec<String>,
    pub ballot_count: u64,
    pub duels: Vec<DuelStats>,
}

/// Errors that prevent the tabulation from completing.
///
/// Once a roster and its ballots have been accepted, tabulation itself is
/// total: none of these can occur during pair extraction, sorting, or
/// lock-in.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    EmptyElection,
    TooManyCandidates { count: usize, max: usize },
    DuplicateCandidate(String),
    UnknownCandidate(String),
    InvalidRanking { expected: usize, found: usize },
    EmptyBallot,
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::EmptyElection => write!(f, "no candidates registered"),
            VotingErrors::TooManyCandidates { count, max } => {
                write!(f, "{} candidates registered, the maximum is {}", count, max)
            }
            VotingErrors::DuplicateCandidate(name) => {
                write!(f, "candidate {:?} registered more than once", name)
            }
            VotingErrors::UnknownCandidate(name) => {
                write!(f, "ballot mentions unregistered candidate {:?}", name)
            }
            VotingErrors::InvalidRanking { expected, found } => {
                write!(
                    f,
                    "ballot must rank all {} candidates exactly once, found {} distinct",
                    expected, found
                )
            }
            VotingErrors::EmptyBallot => write!(f, "ballot contains no ranking"),
        }
    }
}
