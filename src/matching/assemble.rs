//! Final assembly of an exclusive match result.

use crate::error::{MatchError, MatchOutcome};

use super::{CandidateSet, CandidateTriple, Classification, MatchResult, Resolution};

/// Merge unique and resolved triples into the final result.
///
/// Fails with `InvariantViolation` when the result holds more matches than
/// `min(n_primary, n_reference)`; that can only happen if classification or
/// resolution is broken, and a corrupt result is never returned.
pub(crate) fn assemble(
    set: &CandidateSet,
    classification: &Classification,
    resolution: &Resolution,
    n_primary: usize,
    n_reference: usize,
) -> MatchOutcome<MatchResult> {
    let bound = n_primary.min(n_reference);
    let n_matches = classification.unique.len() + resolution.accepted.len();
    if n_matches > bound {
        return Err(MatchError::InvariantViolation {
            matches: n_matches,
            bound,
        });
    }

    let mut matches: Vec<CandidateTriple> = Vec::new();
    matches.try_reserve_exact(n_matches)?;
    matches.extend(
        classification
            .unique
            .iter()
            .chain(resolution.accepted.iter())
            .map(|&idx| set.triples[idx]),
    );

    let discarded = resolution
        .discarded
        .iter()
        .map(|&idx| set.triples[idx])
        .collect();

    Ok(MatchResult {
        matches,
        total_candidate_count: set.total_candidate_count,
        truncated: set.is_truncated(),
        unique_count: classification.unique.len(),
        contested_count: classification.contested.len(),
        discarded,
        primaries_with_multiple_candidates: set.fan_out.iter().filter(|&&n| n > 1).count(),
        references_with_multiple_candidates: set.fan_in.iter().filter(|&&n| n > 1).count(),
    })
}
