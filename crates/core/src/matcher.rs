//! Approximate organism-name matching.

use crate::config::MatchPolicy;
use crate::similarity::ratio;
use urc_records::OrganismData;

/// Best candidate for a query and its score.
#[derive(Clone, Copy, Debug)]
pub struct MatchOutcome<'a> {
    pub organism: Option<&'a OrganismData>,
    pub score: f64,
}

impl<'a> MatchOutcome<'a> {
    /// The matched organism, if its score clears the policy's acceptance floor.
    pub fn accepted(&self, policy: &MatchPolicy) -> Option<&'a OrganismData> {
        self.organism.filter(|_| policy.accepts(self.score))
    }
}

/// Find the organism whose name best matches `query`.
///
/// The query is trimmed and lowercased; its genus is the first whitespace-separated token.
/// A candidate sharing the query genus scores `genus_exact_score`; any other candidate scores
/// the larger of the full-name similarity and the weighted genus similarity. The first
/// candidate with the highest score wins. A zero score never selects a candidate.
///
/// # Arguments
///
/// * `query` - Free-text organism name as typed by the operator.
/// * `organisms` - Candidate taxonomy, in store order.
/// * `policy` - Scoring constants.
///
/// # Returns
///
/// The best candidate (if any) and its score. An empty taxonomy yields no candidate and a
/// score of 0. Acceptance is decided separately with [`MatchOutcome::accepted`].
pub fn match_organism<'a>(
    query: &str,
    organisms: &'a [OrganismData],
    policy: &MatchPolicy,
) -> MatchOutcome<'a> {
    let query = query.trim().to_lowercase();
    let query_genus = query.split_whitespace().next().unwrap_or("");

    let mut best = MatchOutcome {
        organism: None,
        score: 0.0,
    };

    for organism in organisms {
        let name = organism.name.as_str().to_lowercase();
        let genus = name.split_whitespace().next().unwrap_or("");

        let score = if !query_genus.is_empty() && query_genus == genus {
            policy.genus_exact_score
        } else {
            ratio(&query, &name).max(policy.genus_weight * ratio(query_genus, genus))
        };

        if score > best.score {
            best = MatchOutcome {
                organism: Some(organism),
                score,
            };
        }
    }

    best
}
