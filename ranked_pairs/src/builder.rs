pub use crate::config::*;
use crate::run_ranked_pairs;

/// An incremental front door for assembling and resolving one election.
///
/// Ballots are validated as they are added, so a malformed ballot is
/// reported immediately and never contaminates the tally.
///
/// ```
/// pub use ranked_pairs::builder::Builder;
/// # use ranked_pairs::VotingErrors;
///
/// let mut builder = Builder::new()
///     .candidates(&["Alice".to_string(), "Bob".to_string()])?;
///
/// builder.add_vote_simple(&["Alice".to_string(), "Bob".to_string()])?;
/// builder.add_vote(&["Bob".to_string(), "Alice".to_string()], 2)?;
///
/// let result = builder.resolve()?;
/// assert_eq!(result.winners, vec!["Bob".to_string()]);
///
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _votes: Vec<Vote>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _candidates: Vec::new(),
            _votes: Vec::new(),
        }
    }

    /// Registers the candidate roster, in the order that defines candidate
    /// indices. The roster is checked eagerly for the candidate bound and
    /// duplicate names.
    pub fn candidates(self, names: &[String]) -> Result<Builder, VotingErrors> {
        let candidates: Vec<Candidate> = names
            .iter()
            .map(|name| Candidate { name: name.clone() })
            .collect();
        // Surfaces roster problems now rather than at resolution time.
        crate::check_roster(&candidates)?;
        Ok(Builder {
            _candidates: candidates,
            _votes: Vec::new(),
        })
    }

    /// Adds a single unweighted ballot.
    pub fn add_vote_simple(&mut self, ranking: &[String]) -> Result<(), VotingErrors> {
        self.add_vote(ranking, 1)
    }

    /// Adds a ballot shape cast by `count` voters. The ranking must be a
    /// full permutation of the registered candidate names.
    pub fn add_vote(&mut self, ranking: &[String], count: u64) -> Result<(), VotingErrors> {
        let vote = Vote {
            ranking: ranking.to_vec(),
            count,
        };
        crate::check_vote(&vote, &self._candidates)?;
        self._votes.push(vote);
        Ok(())
    }

    /// Runs the full tabulation. May be called repeatedly; the result only
    /// depends on the ballots added so far.
    pub fn resolve(&self) -> Result<ElectionResult, VotingErrors> {
        run_ranked_pairs(&self._votes, &self._candidates)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_ballots_are_rejected_at_insertion() {
        let mut builder = Builder::new()
            .candidates(&["Alice".to_string(), "Bob".to_string()])
            .unwrap();
        assert_eq!(
            builder.add_vote_simple(&["Alice".to_string(), "Eve".to_string()]),
            Err(VotingErrors::UnknownCandidate("Eve".to_string()))
        );
        assert_eq!(
            builder.add_vote_simple(&["Alice".to_string()]),
            Err(VotingErrors::InvalidRanking {
                expected: 2,
                found: 1,
            })
        );
        // The rejected ballots left nothing behind.
        builder
            .add_vote_simple(&["Bob".to_string(), "Alice".to_string()])
            .unwrap();
        let result = builder.resolve().unwrap();
        assert_eq!(result.winners, vec!["Bob".to_string()]);
        assert_eq!(result.ballot_count, 1);
    }

    #[test]
    fn oversized_roster_fails_eagerly() {
        let names: Vec<String> = (0..crate::MAX_CANDIDATES + 1)
            .map(|i| format!("c{}", i))
            .collect();
        assert!(matches!(
            Builder::new().candidates(&names),
            Err(VotingErrors::TooManyCandidates { .. })
        ));
    }
}
