//! Greedy closest-first resolution of contested triples.

use crate::error::MatchOutcome;

use super::CandidateTriple;

/// Outcome of resolving the contested triples, by position in the
/// candidate list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Accepted triples, in ascending separation.
    pub accepted: Vec<usize>,
    /// Triples that lost an endpoint to a closer competitor, in ascending
    /// separation.
    pub discarded: Vec<usize>,
}

/// Walk `contested` from closest to farthest, accepting a triple only if
/// neither its primary nor its reference index has been taken.
///
/// Exact separation ties are broken by `(primary_index, reference_index)`,
/// so the result does not depend on the order of `contested`. The result is
/// a maximal greedy matching, not a minimum-total-distance assignment.
///
/// A primary that loses its closest reference is not dropped outright: any
/// of its farther triples whose reference is still free is accepted when
/// the walk reaches it.
pub fn resolve(
    triples: &[CandidateTriple],
    contested: &[usize],
    n_primary: usize,
    n_reference: usize,
) -> MatchOutcome<Resolution> {
    let mut order: Vec<usize> = Vec::new();
    order.try_reserve_exact(contested.len())?;
    order.extend_from_slice(contested);
    order.sort_unstable_by(|&a, &b| {
        let ta = &triples[a];
        let tb = &triples[b];
        ta.separation
            .total_cmp(&tb.separation)
            .then(ta.primary_index.cmp(&tb.primary_index))
            .then(ta.reference_index.cmp(&tb.reference_index))
    });

    let mut used_primary = unused_flags(n_primary)?;
    let mut used_reference = unused_flags(n_reference)?;
    let mut resolution = Resolution::default();

    for idx in order {
        let t = &triples[idx];
        if used_primary[t.primary_index] || used_reference[t.reference_index] {
            resolution.discarded.push(idx);
            continue;
        }
        used_primary[t.primary_index] = true;
        used_reference[t.reference_index] = true;
        resolution.accepted.push(idx);
    }

    Ok(resolution)
}

fn unused_flags(n: usize) -> MatchOutcome<Vec<bool>> {
    let mut flags = Vec::new();
    flags.try_reserve_exact(n)?;
    flags.resize(n, false);
    Ok(flags)
}
