//! Candidate generation: every primary/reference pair within the radius.

use tracing::trace;

use crate::error::MatchOutcome;
use crate::grid::ChunkGrid;
use crate::sphere::separation;
use crate::{Point, Vector3};

use super::CandidateTriple;

/// Radius-qualifying triples plus per-index candidate counts.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Kept triples, grouped by primary index in catalog order, reference
    /// indices ascending within a group.
    pub triples: Vec<CandidateTriple>,
    /// All qualifying pairs seen, including those past `max_matches`.
    pub total_candidate_count: usize,
    /// Number of kept triples per primary index.
    pub fan_out: Vec<u32>,
    /// Number of kept triples per reference index.
    pub fan_in: Vec<u32>,
}

impl CandidateSet {
    /// `true` when some qualifying pairs were counted but not kept.
    pub fn is_truncated(&self) -> bool {
        self.total_candidate_count > self.triples.len()
    }
}

/// Scan the primary catalog once and collect triples against the reference
/// catalog.
///
/// `reference_vectors[k]` must be the unit vector of reference point `k`, and
/// `grid` must have been assigned the reference catalog with margin at least
/// the radius. Primary vectors are computed on the fly.
pub(crate) fn generate_candidates(
    primary: &[Point],
    reference_vectors: &[Vector3],
    grid: &ChunkGrid,
    radius_rad: f64,
    max_matches: usize,
) -> MatchOutcome<CandidateSet> {
    let mut fan_out = Vec::new();
    fan_out.try_reserve_exact(primary.len())?;
    fan_out.resize(primary.len(), 0u32);
    let mut fan_in = Vec::new();
    fan_in.try_reserve_exact(reference_vectors.len())?;
    fan_in.resize(reference_vectors.len(), 0u32);

    let mut triples: Vec<CandidateTriple> = Vec::new();
    let mut total_candidate_count = 0usize;

    for (i, point) in primary.iter().enumerate() {
        let candidates = grid.candidates_near(point.ra_deg, point.dec_deg);
        if candidates.is_empty() {
            continue;
        }
        let u = point.uvec();
        for &k in candidates {
            let sep = separation(&u, &reference_vectors[k]);
            if sep > radius_rad {
                continue;
            }
            total_candidate_count += 1;
            if triples.len() >= max_matches {
                continue;
            }
            triples.try_reserve(1)?;
            triples.push(CandidateTriple {
                primary_index: i,
                reference_index: k,
                separation: sep,
            });
            fan_out[i] += 1;
            fan_in[k] += 1;
        }
    }

    if total_candidate_count > triples.len() {
        trace!(
            "Candidate cap of {} reached; {} qualifying pairs not kept",
            max_matches,
            total_candidate_count - triples.len()
        );
    }

    Ok(CandidateSet {
        triples,
        total_candidate_count,
        fan_out,
        fan_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(primary: &[(f64, f64)], reference: &[(f64, f64)], radius_deg: f64) -> CandidateSet {
        setup_capped(primary, reference, radius_deg, usize::MAX)
    }

    fn setup_capped(
        primary: &[(f64, f64)],
        reference: &[(f64, f64)],
        radius_deg: f64,
        max_matches: usize,
    ) -> CandidateSet {
        let primary: Vec<Point> = primary
            .iter()
            .map(|&(ra, dec)| Point::new(0, ra, dec))
            .collect();
        let reference: Vec<Point> = reference
            .iter()
            .map(|&(ra, dec)| Point::new(0, ra, dec))
            .collect();
        let mut grid = ChunkGrid::build(&reference, radius_deg.max(0.1)).unwrap();
        grid.assign(&reference, radius_deg).unwrap();
        let vectors: Vec<Vector3> = reference.iter().map(Point::uvec).collect();
        generate_candidates(
            &primary,
            &vectors,
            &grid,
            radius_deg.to_radians(),
            max_matches,
        )
        .unwrap()
    }

    #[test]
    fn keeps_every_candidate_within_radius() {
        let set = setup(
            &[(10.0, 0.0), (50.0, 0.0)],
            &[(10.0, 0.001), (10.0, -0.001), (10.5, 0.0)],
            0.01,
        );
        assert_eq!(set.triples.len(), 2);
        assert_eq!(set.total_candidate_count, 2);
        assert_eq!(set.fan_out, vec![2, 0]);
        assert_eq!(set.fan_in, vec![1, 1, 0]);
        assert!(set.triples.iter().all(|t| t.primary_index == 0));
        assert!(set
            .triples
            .iter()
            .all(|t| t.separation >= 0.0 && t.separation <= 0.01_f64.to_radians()));
        // reference indices ascending within a primary group
        assert_eq!(set.triples[0].reference_index, 0);
        assert_eq!(set.triples[1].reference_index, 1);
    }

    #[test]
    fn primary_without_candidates_contributes_nothing() {
        let set = setup(&[(200.0, -60.0)], &[(10.0, 0.0)], 0.01);
        assert!(set.triples.is_empty());
        assert_eq!(set.total_candidate_count, 0);
        assert!(!set.is_truncated());
    }

    #[test]
    fn cap_stops_keeping_but_keeps_counting() {
        let set = setup_capped(
            &[(10.0, 0.0), (10.0, 0.002)],
            &[(10.0, 0.001), (10.0, 0.003)],
            0.01,
            3,
        );
        assert_eq!(set.triples.len(), 3);
        assert_eq!(set.total_candidate_count, 4);
        assert!(set.is_truncated());
        let kept: u32 = set.fan_out.iter().sum();
        assert_eq!(kept, 3);
        assert_eq!(set.fan_in.iter().sum::<u32>(), 3);
    }

    #[test]
    fn pair_exactly_at_radius_is_kept() {
        let primary = [Point::new(0, 10.0, 0.0)];
        let reference = [Point::new(0, 10.0, 0.004), Point::new(0, 10.0, 0.0041)];
        let radius_rad = separation(&primary[0].uvec(), &reference[0].uvec());
        let mut grid = ChunkGrid::build(&reference, 0.1).unwrap();
        grid.assign(&reference, 0.01).unwrap();
        let vectors: Vec<Vector3> = reference.iter().map(Point::uvec).collect();
        let set = generate_candidates(&primary, &vectors, &grid, radius_rad, usize::MAX).unwrap();
        assert_eq!(set.triples.len(), 1);
        assert_eq!(set.triples[0].reference_index, 0);
        assert_eq!(set.triples[0].separation, radius_rad);
    }
}
