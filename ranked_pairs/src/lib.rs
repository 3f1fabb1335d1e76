pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};

use std::{
    collections::{HashMap, HashSet},
    ops::AddAssign,
};

pub use crate::config::*;

/// Hard upper bound on the number of candidates in one contest.
pub const MAX_CANDIDATES: usize = 9;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(usize);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// A validated ballot: a permutation of all candidate ids, most preferred
// first, carried by `count` voters.
#[derive(Eq, PartialEq, Debug, Clone)]
struct BallotInternal {
    ranking: Vec<CandidateId>,
    count: VoteCount,
}

// The registered candidates, in registration order.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Roster {
    names: Vec<String>,
    by_name: HashMap<String, CandidateId>,
}

impl Roster {
    fn new(candidates: &[Candidate]) -> Result<Roster, VotingErrors> {
        if candidates.is_empty() {
            return Err(VotingErrors::EmptyElection);
        }
        if candidates.len() > MAX_CANDIDATES {
            return Err(VotingErrors::TooManyCandidates {
                count: candidates.len(),
                max: MAX_CANDIDATES,
            });
        }
        let mut names: Vec<String> = Vec::with_capacity(candidates.len());
        let mut by_name: HashMap<String, CandidateId> = HashMap::new();
        for (idx, c) in candidates.iter().enumerate() {
            if by_name.insert(c.name.clone(), CandidateId(idx)).is_some() {
                return Err(VotingErrors::DuplicateCandidate(c.name.clone()));
            }
            names.push(c.name.clone());
        }
        Ok(Roster { names, by_name })
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    fn name(&self, cid: CandidateId) -> &str {
        self.names[cid.0].as_str()
    }

    /// Resolves a named ranking into candidate ids and checks that it is a
    /// full permutation of the roster. A rejected ballot leaves no trace in
    /// the election.
    fn check_ballot(&self, vote: &Vote) -> Result<BallotInternal, VotingErrors> {
        if vote.ranking.is_empty() {
            return Err(VotingErrors::EmptyBallot);
        }
        let mut ranking: Vec<CandidateId> = Vec::with_capacity(vote.ranking.len());
        let mut seen: HashSet<CandidateId> = HashSet::new();
        for name in vote.ranking.iter() {
            let cid = self
                .by_name
                .get(name)
                .copied()
                .ok_or_else(|| VotingErrors::UnknownCandidate(name.clone()))?;
            if !seen.insert(cid) {
                return Err(VotingErrors::InvalidRanking {
                    expected: self.len(),
                    found: seen.len(),
                });
            }
            ranking.push(cid);
        }
        if ranking.len() != self.len() {
            return Err(VotingErrors::InvalidRanking {
                expected: self.len(),
                found: ranking.len(),
            });
        }
        Ok(BallotInternal {
            ranking,
            count: VoteCount(vote.count),
        })
    }
}

// Validation entry points shared with the builder.

pub(crate) fn check_roster(candidates: &[Candidate]) -> Result<(), VotingErrors> {
    Roster::new(candidates).map(|_| ())
}

pub(crate) fn check_vote(vote: &Vote, candidates: &[Candidate]) -> Result<(), VotingErrors> {
    let roster = Roster::new(candidates)?;
    roster.check_ballot(vote).map(|_| ())
}

// Pairwise preference matrix. counts[i][j] is the number of ballots
// ranking candidate i strictly above candidate j; the diagonal stays zero.
#[derive(Eq, PartialEq, Debug, Clone)]
struct PreferenceTally {
    candidate_count: usize,
    counts: Vec<Vec<u64>>,
    ballots: VoteCount,
}

impl PreferenceTally {
    fn new(candidate_count: usize) -> PreferenceTally {
        PreferenceTally {
            candidate_count,
            counts: vec![vec![0u64; candidate_count]; candidate_count],
            ballots: VoteCount::EMPTY,
        }
    }

    /// Folds one validated ballot into the matrix: every candidate is
    /// preferred over every candidate ranked below it.
    fn record(&mut self, ranking: &[CandidateId], count: VoteCount) {
        for (above_pos, above) in ranking.iter().enumerate() {
            for below in ranking.iter().skip(above_pos + 1) {
                self.counts[above.0][below.0] += count.0;
            }
        }
        self.ballots += count;
    }

    fn preferring(&self, a: CandidateId, b: CandidateId) -> u64 {
        self.counts[a.0][b.0]
    }
}

// A majority duel: `winner` is preferred over `loser` by a strictly
// positive margin.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct Duel {
    winner: CandidateId,
    loser: CandidateId,
    margin: u64,
}

// Scans all unordered candidate pairs in ascending index order and keeps
// the ones with a majority. Exact head-to-head ties have no winner to lock
// and are dropped here.
fn extract_duels(tally: &PreferenceTally) -> Vec<Duel> {
    let n = tally.candidate_count;
    let mut duels: Vec<Duel> = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let forward = tally.counts[i][j];
            let backward = tally.counts[j][i];
            if forward == backward {
                continue;
            }
            let duel = if forward > backward {
                Duel {
                    winner: CandidateId(i),
                    loser: CandidateId(j),
                    margin: forward - backward,
                }
            } else {
                Duel {
                    winner: CandidateId(j),
                    loser: CandidateId(i),
                    margin: backward - forward,
                }
            };
            duels.push(duel);
        }
    }
    duels
}

// Bottom-up merge sort by descending margin, alternating between two owned
// buffers. Stable: equal margins keep their extraction order, which makes
// the whole tabulation reproducible run to run.
fn sort_duels(duels: Vec<Duel>) -> Vec<Duel> {
    let len = duels.len();
    let mut src = duels;
    let mut aux = src.clone();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = usize::min(start + width, len);
            let end = usize::min(start + 2 * width, len);
            merge_by_margin(&src, &mut aux, start, mid, end);
            start = end;
        }
        // The freshly merged buffer becomes the source of the next pass.
        std::mem::swap(&mut src, &mut aux);
        width *= 2;
    }
    src
}

fn merge_by_margin(src: &[Duel], dst: &mut [Duel], start: usize, mid: usize, end: usize) {
    let mut left = start;
    let mut right = mid;
    for slot in dst.iter_mut().take(end).skip(start) {
        if left < mid && (right >= end || src[left].margin >= src[right].margin) {
            *slot = src[left];
            left += 1;
        } else {
            *slot = src[right];
            right += 1;
        }
    }
}

// The locked graph under construction, together with the ancestor set of
// every candidate (all candidates with a locked path into it). The two are
// mutated together and only on commit, so the graph is acyclic after every
// step, not just at the end.
#[derive(Eq, PartialEq, Debug, Clone)]
struct LockGraph {
    candidate_count: usize,
    locked: Vec<Vec<bool>>,
    ancestors: Vec<HashSet<CandidateId>>,
}

impl LockGraph {
    fn new(candidate_count: usize) -> LockGraph {
        LockGraph {
            candidate_count,
            locked: vec![vec![false; candidate_count]; candidate_count],
            ancestors: vec![HashSet::new(); candidate_count],
        }
    }

    /// Attempts to commit the duel as the locked edge winner -> loser.
    ///
    /// The next state of every ancestor set is computed first; if the edge
    /// would make any candidate an ancestor of itself, a cycle was found:
    /// the committed state is left untouched and the duel is dropped. The
    /// very first duel can never be rejected since the graph has no edges
    /// yet.
    fn try_lock(&mut self, duel: &Duel) -> bool {
        let Duel { winner, loser, .. } = *duel;
        let mut next = self.ancestors.clone();
        for c in 0..self.candidate_count {
            let cid = CandidateId(c);
            // The new edge extends the reach of `winner` to `loser` and to
            // everything `loser` already reaches.
            if cid != loser && !self.ancestors[c].contains(&loser) {
                continue;
            }
            if cid == winner || self.ancestors[winner.0].contains(&cid) {
                // `cid` already lies on a path into `winner`, so it would
                // become its own ancestor.
                debug!(
                    "try_lock: {:?} -> {:?} rejected, would close a cycle through {:?}",
                    winner, loser, cid
                );
                return false;
            }
            next[c].insert(winner);
            next[c].extend(self.ancestors[winner.0].iter().copied());
        }
        self.ancestors = next;
        self.locked[winner.0][loser.0] = true;
        debug!("try_lock: committed {:?} -> {:?}", winner, loser);
        true
    }

    // The winners: candidates that no one reaches through locked edges.
    fn sources(&self) -> Vec<CandidateId> {
        (0..self.candidate_count)
            .filter(|&c| self.ancestors[c].is_empty())
            .map(CandidateId)
            .collect()
    }
}

/// Runs a ranked-pairs (Tideman) tabulation over the given ballots.
///
/// Arguments:
/// * `votes` the ballots to process; each must rank every registered
///   candidate exactly once and may carry a weight
/// * `candidates` the registered candidates, in the order that defines
///   their indices
///
/// All tabulation state lives inside the call: repeated invocations over
/// the same input return the same result.
pub fn run_ranked_pairs(
    votes: &[Vote],
    candidates: &[Candidate],
) -> Result<ElectionResult, VotingErrors> {
    info!(
        "run_ranked_pairs: processing {:?} votes, {:?} candidates",
        votes.len(),
        candidates.len()
    );
    let roster = Roster::new(candidates)?;
    for (idx, name) in roster.names.iter().enumerate() {
        info!("Candidate: {}: {}", idx, name);
    }

    let mut tally = PreferenceTally::new(roster.len());
    for vote in votes.iter() {
        let ballot = roster.check_ballot(vote)?;
        tally.record(&ballot.ranking, ballot.count);
    }
    debug!(
        "run_ranked_pairs: {:?} ballots tallied: {:?}",
        tally.ballots, tally.counts
    );

    let duels = sort_duels(extract_duels(&tally));
    debug!(
        "run_ranked_pairs: {:?} majority duels in lock order: {:?}",
        duels.len(),
        duels
    );

    let mut graph = LockGraph::new(roster.len());
    let mut duel_stats: Vec<DuelStats> = Vec::with_capacity(duels.len());
    for duel in duels.iter() {
        let locked = graph.try_lock(duel);
        duel_stats.push(DuelStats {
            winner: roster.name(duel.winner).to_string(),
            loser: roster.name(duel.loser).to_string(),
            votes_for: tally.preferring(duel.winner, duel.loser),
            votes_against: tally.preferring(duel.loser, duel.winner),
            margin: duel.margin,
            locked,
        });
    }

    let winners: Vec<String> = graph
        .sources()
        .iter()
        .map(|&cid| roster.name(cid).to_string())
        .collect();
    info!("run_ranked_pairs: winners: {:?}", winners);

    Ok(ElectionResult {
        winners,
        ballot_count: tally.ballots.0,
        duels: duel_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cands(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|n| Candidate {
                name: n.to_string(),
            })
            .collect()
    }

    fn vote(ranking: &[&str], count: u64) -> Vote {
        Vote {
            ranking: ranking.iter().map(|n| n.to_string()).collect(),
            count,
        }
    }

    fn tally_from(votes: &[Vote], candidates: &[Candidate]) -> PreferenceTally {
        let roster = Roster::new(candidates).unwrap();
        let mut tally = PreferenceTally::new(roster.len());
        for v in votes {
            let ballot = roster.check_ballot(v).unwrap();
            tally.record(&ballot.ranking, ballot.count);
        }
        tally
    }

    // Walks the locked adjacency matrix looking for a directed cycle.
    fn assert_acyclic(graph: &LockGraph) {
        let n = graph.candidate_count;
        for start in 0..n {
            let mut stack = vec![start];
            let mut visited: HashSet<usize> = HashSet::new();
            while let Some(node) = stack.pop() {
                for succ in 0..n {
                    if !graph.locked[node][succ] {
                        continue;
                    }
                    assert!(succ != start, "cycle through candidate {}", start);
                    if visited.insert(succ) {
                        stack.push(succ);
                    }
                }
            }
        }
    }

    #[test]
    fn tally_never_exceeds_ballot_total() {
        let candidates = cands(&["Alice", "Bob", "Carol"]);
        let votes = vec![
            vote(&["Alice", "Bob", "Carol"], 3),
            vote(&["Bob", "Carol", "Alice"], 2),
            vote(&["Carol", "Alice", "Bob"], 4),
        ];
        let tally = tally_from(&votes, &candidates);
        let total: VoteCount = votes.iter().map(|v| VoteCount(v.count)).sum();
        assert_eq!(tally.ballots, total);
        for i in 0..3 {
            assert_eq!(tally.counts[i][i], 0);
            for j in 0..3 {
                if i != j {
                    assert!(tally.counts[i][j] + tally.counts[j][i] <= total.0);
                }
            }
        }
    }

    #[test]
    fn tied_pairs_are_never_extracted() {
        let candidates = cands(&["Alice", "Bob"]);
        let votes = vec![vote(&["Alice", "Bob"], 5), vote(&["Bob", "Alice"], 5)];
        let tally = tally_from(&votes, &candidates);
        assert!(extract_duels(&tally).is_empty());
    }

    #[test]
    fn sort_is_descending_and_deterministic() {
        let duels: Vec<Duel> = [(0, 1, 2), (0, 2, 7), (1, 2, 4), (1, 3, 7), (2, 3, 1)]
            .iter()
            .map(|&(w, l, margin)| Duel {
                winner: CandidateId(w),
                loser: CandidateId(l),
                margin,
            })
            .collect();
        let sorted = sort_duels(duels.clone());
        for pair in sorted.windows(2) {
            assert!(pair[0].margin >= pair[1].margin);
        }
        assert_eq!(sorted, sort_duels(duels));
    }

    #[test]
    fn sort_keeps_extraction_order_among_equal_margins() {
        let duels: Vec<Duel> = (0..8)
            .map(|i| Duel {
                winner: CandidateId(i),
                loser: CandidateId(i + 1),
                margin: 3,
            })
            .collect();
        assert_eq!(sort_duels(duels.clone()), duels);
    }

    #[test]
    fn lock_graph_rejects_every_cycle() {
        // Three overlapping cycles fed in an adversarial order.
        let edges = [
            (0, 1),
            (1, 2),
            (2, 0),
            (2, 3),
            (3, 1),
            (3, 0),
            (0, 3),
            (1, 0),
        ];
        let mut graph = LockGraph::new(4);
        for &(w, l) in edges.iter() {
            graph.try_lock(&Duel {
                winner: CandidateId(w),
                loser: CandidateId(l),
                margin: 1,
            });
            assert_acyclic(&graph);
        }
    }

    #[test]
    fn lock_graph_first_duel_always_commits() {
        let mut graph = LockGraph::new(2);
        assert!(graph.try_lock(&Duel {
            winner: CandidateId(1),
            loser: CandidateId(0),
            margin: 1,
        }));
        assert!(graph.locked[1][0]);
    }

    #[test]
    fn transitive_reach_is_tracked_across_chains() {
        // 0 -> 1, then 2 -> 0: candidate 1 must now know about 2.
        let mut graph = LockGraph::new(3);
        assert!(graph.try_lock(&Duel {
            winner: CandidateId(0),
            loser: CandidateId(1),
            margin: 1,
        }));
        assert!(graph.try_lock(&Duel {
            winner: CandidateId(2),
            loser: CandidateId(0),
            margin: 1,
        }));
        // Closing the chain from its far end must be detected as a cycle.
        assert!(!graph.try_lock(&Duel {
            winner: CandidateId(1),
            loser: CandidateId(2),
            margin: 1,
        }));
        assert!(!graph.locked[1][2]);
        assert_eq!(graph.sources(), vec![CandidateId(2)]);
    }

    #[test]
    fn scenario_majority_winner() {
        let candidates = cands(&["Alice", "Bob", "Carol"]);
        let votes = vec![
            vote(&["Alice", "Bob", "Carol"], 3),
            vote(&["Bob", "Carol", "Alice"], 2),
        ];
        let result = run_ranked_pairs(&votes, &candidates).unwrap();
        assert_eq!(result.winners, vec!["Alice".to_string()]);
        assert_eq!(result.ballot_count, 5);
        // Bob over Carol is unanimous and must lead the lock order.
        assert_eq!(result.duels[0].winner, "Bob".to_string());
        assert_eq!(result.duels[0].loser, "Carol".to_string());
        assert_eq!(result.duels[0].margin, 5);
        assert!(result.duels.iter().all(|d| d.locked));
    }

    #[test]
    fn scenario_condorcet_cycle_still_yields_one_winner() {
        let candidates = cands(&["Alice", "Bob", "Carol"]);
        let votes = vec![
            vote(&["Alice", "Bob", "Carol"], 1),
            vote(&["Bob", "Carol", "Alice"], 1),
            vote(&["Carol", "Alice", "Bob"], 1),
        ];
        let result = run_ranked_pairs(&votes, &candidates).unwrap();
        // All three margins tie at 1; whichever duel the stable order puts
        // last is the one rejected. The name is order-dependent, the
        // cardinality is not.
        assert_eq!(result.duels.len(), 3);
        assert_eq!(result.duels.iter().filter(|d| !d.locked).count(), 1);
        assert_eq!(result.winners.len(), 1);
    }

    #[test]
    fn scenario_unanimous_ballots_lock_the_full_tournament() {
        let candidates = cands(&["Alice", "Bob", "Carol", "Dave"]);
        let votes = vec![vote(&["Alice", "Bob", "Carol", "Dave"], 7)];
        let result = run_ranked_pairs(&votes, &candidates).unwrap();
        assert_eq!(result.winners, vec!["Alice".to_string()]);
        assert_eq!(result.duels.len(), 6);
        assert!(result.duels.iter().all(|d| d.locked && d.margin == 7));
    }

    #[test]
    fn single_candidate_wins_with_no_duels() {
        let candidates = cands(&["Alice"]);
        let votes = vec![vote(&["Alice"], 2)];
        let result = run_ranked_pairs(&votes, &candidates).unwrap();
        assert_eq!(result.winners, vec!["Alice".to_string()]);
        assert!(result.duels.is_empty());
    }

    #[test]
    fn no_ballots_means_everybody_ties() {
        let candidates = cands(&["Alice", "Bob"]);
        let result = run_ranked_pairs(&[], &candidates).unwrap();
        assert_eq!(
            result.winners,
            vec!["Alice".to_string(), "Bob".to_string()]
        );
        assert_eq!(result.ballot_count, 0);
    }

    #[test]
    fn resolve_is_idempotent() {
        let candidates = cands(&["Alice", "Bob", "Carol"]);
        let votes = vec![
            vote(&["Alice", "Bob", "Carol"], 2),
            vote(&["Carol", "Bob", "Alice"], 1),
            vote(&["Bob", "Alice", "Carol"], 1),
        ];
        let first = run_ranked_pairs(&votes, &candidates).unwrap();
        let second = run_ranked_pairs(&votes, &candidates).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn roster_rejects_too_many_candidates() {
        let names: Vec<String> = (0..MAX_CANDIDATES + 1).map(|i| format!("c{}", i)).collect();
        let candidates: Vec<Candidate> = names
            .iter()
            .map(|n| Candidate { name: n.clone() })
            .collect();
        assert_eq!(
            run_ranked_pairs(&[], &candidates),
            Err(VotingErrors::TooManyCandidates {
                count: MAX_CANDIDATES + 1,
                max: MAX_CANDIDATES,
            })
        );
    }

    #[test]
    fn roster_rejects_duplicate_names() {
        let candidates = cands(&["Alice", "Bob", "Alice"]);
        assert_eq!(
            run_ranked_pairs(&[], &candidates),
            Err(VotingErrors::DuplicateCandidate("Alice".to_string()))
        );
    }

    #[test]
    fn roster_rejects_empty_election() {
        assert_eq!(run_ranked_pairs(&[], &[]), Err(VotingErrors::EmptyElection));
    }

    #[test]
    fn ballot_with_unknown_name_is_rejected() {
        let candidates = cands(&["Alice", "Bob"]);
        let votes = vec![vote(&["Alice", "Mallory"], 1)];
        assert_eq!(
            run_ranked_pairs(&votes, &candidates),
            Err(VotingErrors::UnknownCandidate("Mallory".to_string()))
        );
    }

    #[test]
    fn partial_or_duplicated_rankings_are_rejected() {
        let candidates = cands(&["Alice", "Bob", "Carol"]);
        assert_eq!(
            run_ranked_pairs(&[vote(&["Alice", "Bob"], 1)], &candidates),
            Err(VotingErrors::InvalidRanking {
                expected: 3,
                found: 2,
            })
        );
        assert_eq!(
            run_ranked_pairs(&[vote(&["Alice", "Alice", "Bob"], 1)], &candidates),
            Err(VotingErrors::InvalidRanking {
                expected: 3,
                found: 1,
            })
        );
        assert_eq!(
            run_ranked_pairs(&[vote(&[], 1)], &candidates),
            Err(VotingErrors::EmptyBallot)
        );
    }

    #[test]
    fn zero_count_ballots_carry_no_weight() {
        let candidates = cands(&["Alice", "Bob"]);
        let votes = vec![vote(&["Bob", "Alice"], 0), vote(&["Alice", "Bob"], 1)];
        let result = run_ranked_pairs(&votes, &candidates).unwrap();
        assert_eq!(result.winners, vec!["Alice".to_string()]);
        assert_eq!(result.ballot_count, 1);
    }
}
