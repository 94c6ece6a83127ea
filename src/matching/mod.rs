//! Catalog cross-matching ("spherematch").
//!
//! Given a primary and a reference catalog and an angular search radius,
//! find for every primary point the reference point(s) within the radius.
//! Two flavors are offered:
//!
//! - [`match_one_to_one`]: an exclusive assignment where no primary and no
//!   reference index is used twice. The pipeline is:
//!   1. **Generate** every `(primary, reference, separation)` triple within
//!      the radius, using a [`ChunkGrid`] over the reference catalog.
//!   2. **Classify** triples as unique (sole candidate on both sides) or
//!      contested.
//!   3. **Resolve** contested triples greedily, closest first, dropping any
//!      triple whose primary or reference index is already taken.
//!   4. **Assemble** unique and resolved triples and check the count bound.
//! - [`match_many_to_many`]: step 1 only. Every pair within the radius is
//!   returned, which is what you want when looking for blends or crowding.
//!
//! Both are synchronous and keep no state between calls; the grid is built
//! and dropped inside each call.

mod assemble;
mod classify;
mod generate;
mod resolve;

use tracing::debug;

use crate::error::{MatchError, MatchOutcome};
use crate::grid::ChunkGrid;
use crate::{Point, Vector3};

pub use classify::Classification;
pub use generate::CandidateSet;
pub use resolve::Resolution;

const ARCSEC_PER_DEG: f64 = 3600.0;

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling a cross-match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Search radius in degrees. Default 1 arcsec.
    pub radius_deg: f64,
    /// Minimum grid cell size in degrees. Default 0.1.
    ///
    /// The grid uses `max(min_cell_size_deg, radius_deg)` so that a cell is
    /// never smaller than the search radius.
    pub min_cell_size_deg: f64,
    /// Upper bound on the number of candidate triples kept. None = unbounded
    /// (`N1 * N2`).
    ///
    /// Once the bound is reached further triples are counted but not kept.
    pub max_matches: Option<usize>,
    /// Return [`MatchError::TooManyMatches`] instead of a truncated result
    /// when more candidates than `max_matches` are found. Default false.
    pub fail_on_overflow: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            radius_deg: 1.0 / ARCSEC_PER_DEG,
            min_cell_size_deg: 0.1,
            max_matches: None,
            fail_on_overflow: false,
        }
    }
}

impl MatchConfig {
    /// Create a match configuration with the given radius and minimum cell size (degrees).
    pub fn new(radius_deg: f64, min_cell_size_deg: f64) -> Self {
        Self {
            radius_deg,
            min_cell_size_deg,
            ..Default::default()
        }
    }

    /// Create a configuration from a radius in arcseconds, with the default cell size.
    pub fn from_arcsec(radius_arcsec: f64) -> Self {
        Self {
            radius_deg: radius_arcsec / ARCSEC_PER_DEG,
            ..Default::default()
        }
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = Some(max_matches);
        self
    }

    pub fn with_fail_on_overflow(mut self, fail: bool) -> Self {
        self.fail_on_overflow = fail;
        self
    }

    /// Search radius in radians.
    pub fn radius_rad(&self) -> f64 {
        self.radius_deg.to_radians()
    }

    /// Cell size the grid is built with.
    pub fn effective_cell_size_deg(&self) -> f64 {
        self.min_cell_size_deg.max(self.radius_deg)
    }

    /// Check the configuration on its own, independent of any catalog.
    pub fn validate(&self) -> MatchOutcome<()> {
        if !(self.radius_deg.is_finite() && self.radius_deg > 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "search radius must be positive and finite, got {}",
                self.radius_deg
            )));
        }
        if !(self.min_cell_size_deg.is_finite() && self.min_cell_size_deg > 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "minimum cell size must be positive and finite, got {}",
                self.min_cell_size_deg
            )));
        }
        if self.max_matches == Some(0) {
            return Err(MatchError::InvalidInput(
                "max_matches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Match records ───────────────────────────────────────────────────────────

/// One primary/reference pair within the search radius.
///
/// Indices are positions in the slices passed to the match call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateTriple {
    pub primary_index: usize,
    pub reference_index: usize,
    /// Great-circle separation in radians, in `[0, radius]`.
    pub separation: f64,
}

impl CandidateTriple {
    pub fn separation_deg(&self) -> f64 {
        self.separation.to_degrees()
    }

    pub fn separation_arcsec(&self) -> f64 {
        self.separation.to_degrees() * ARCSEC_PER_DEG
    }
}

/// Result of an exclusive (one-to-one) match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Final matches: unique triples in generation order, then resolved
    /// contested triples in ascending separation.
    pub matches: Vec<CandidateTriple>,
    /// Radius-qualifying triples found before any exclusivity, including
    /// those beyond `max_matches`.
    pub total_candidate_count: usize,
    /// `true` when `max_matches` cut off candidate collection.
    pub truncated: bool,
    /// Triples that were sole candidates on both sides.
    pub unique_count: usize,
    /// Triples that shared a primary or reference index with another triple.
    pub contested_count: usize,
    /// Contested triples that lost an endpoint to a closer competitor,
    /// in ascending separation.
    pub discarded: Vec<CandidateTriple>,
    /// Primary indices with more than one candidate.
    pub primaries_with_multiple_candidates: usize,
    /// Reference indices with more than one candidate.
    pub references_with_multiple_candidates: usize,
}

impl MatchResult {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The match for a primary index, if it has one.
    ///
    /// Linear scan over `matches`; build a lookup table instead when
    /// querying every index.
    pub fn reference_for(&self, primary_index: usize) -> Option<&CandidateTriple> {
        self.matches
            .iter()
            .find(|t| t.primary_index == primary_index)
    }

    /// The match for a reference index, if it has one.
    ///
    /// Linear scan over `matches`, like [`MatchResult::reference_for`].
    pub fn primary_for(&self, reference_index: usize) -> Option<&CandidateTriple> {
        self.matches
            .iter()
            .find(|t| t.reference_index == reference_index)
    }

    /// Separations of the final matches, in degrees.
    pub fn separations_deg(&self) -> Vec<f64> {
        self.matches.iter().map(|t| t.separation_deg()).collect()
    }
}

/// Result of a non-exclusive (many-to-many) match.
#[derive(Debug, Clone, PartialEq)]
pub struct ManyMatchResult {
    /// Every triple within the radius, in primary-catalog order.
    pub triples: Vec<CandidateTriple>,
    pub total_candidate_count: usize,
    pub truncated: bool,
}

impl ManyMatchResult {
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Exclusive cross-match: each primary and each reference point is used at
/// most once, closer pairs winning conflicts.
pub fn match_one_to_one(
    primary: &[Point],
    reference: &[Point],
    config: &MatchConfig,
) -> MatchOutcome<MatchResult> {
    let set = collect_candidates(primary, reference, config)?;

    let classification = classify::classify(&set);
    let resolution = resolve::resolve(
        &set.triples,
        &classification.contested,
        primary.len(),
        reference.len(),
    )?;
    debug!(
        "Classified {} candidates: {} unique, {} contested ({} kept, {} discarded)",
        set.triples.len(),
        classification.unique.len(),
        classification.contested.len(),
        resolution.accepted.len(),
        resolution.discarded.len()
    );

    assemble::assemble(
        &set,
        &classification,
        &resolution,
        primary.len(),
        reference.len(),
    )
}

/// Non-exclusive cross-match: every pair within the radius, unfiltered.
pub fn match_many_to_many(
    primary: &[Point],
    reference: &[Point],
    config: &MatchConfig,
) -> MatchOutcome<ManyMatchResult> {
    let set = collect_candidates(primary, reference, config)?;
    let truncated = set.is_truncated();
    Ok(ManyMatchResult {
        triples: set.triples,
        total_candidate_count: set.total_candidate_count,
        truncated,
    })
}

/// Validate inputs, build the grid over `reference`, and generate candidates.
///
/// The grid lives only for the duration of this call.
fn collect_candidates(
    primary: &[Point],
    reference: &[Point],
    config: &MatchConfig,
) -> MatchOutcome<CandidateSet> {
    config.validate()?;
    validate_catalog("primary", primary)?;
    validate_catalog("reference", reference)?;

    let max_matches = config
        .max_matches
        .unwrap_or_else(|| primary.len().saturating_mul(reference.len()));

    let mut grid = ChunkGrid::build(reference, config.effective_cell_size_deg())?;
    grid.assign(reference, config.radius_deg)?;

    let mut reference_vectors: Vec<Vector3> = Vec::new();
    reference_vectors.try_reserve_exact(reference.len())?;
    reference_vectors.extend(reference.iter().map(Point::uvec));

    let set = generate::generate_candidates(
        primary,
        &reference_vectors,
        &grid,
        config.radius_rad(),
        max_matches,
    )?;
    debug!(
        "Generated {} candidates ({} total) for {} x {} points within {:.3}\"",
        set.triples.len(),
        set.total_candidate_count,
        primary.len(),
        reference.len(),
        config.radius_deg * ARCSEC_PER_DEG
    );

    if config.fail_on_overflow && set.is_truncated() {
        return Err(MatchError::TooManyMatches {
            found: set.total_candidate_count,
            max: max_matches,
        });
    }
    Ok(set)
}

fn validate_catalog(name: &str, points: &[Point]) -> MatchOutcome<()> {
    if points.is_empty() {
        return Err(MatchError::InvalidInput(format!("{name} catalog is empty")));
    }
    if let Some((idx, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
        return Err(MatchError::InvalidInput(format!(
            "{name} point {idx} has invalid coordinates ({}, {})",
            p.ra_deg, p.dec_deg
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(ra, dec))| Point::new(i as u64, ra, dec))
            .collect()
    }

    #[test]
    fn config_validation() {
        assert!(MatchConfig::default().validate().is_ok());
        assert!(MatchConfig::new(0.0, 1.0).validate().is_err());
        assert!(MatchConfig::new(-1.0, 1.0).validate().is_err());
        assert!(MatchConfig::new(1.0, 0.0).validate().is_err());
        assert!(MatchConfig::new(f64::INFINITY, 1.0).validate().is_err());
        assert!(MatchConfig::new(1.0, 1.0)
            .with_max_matches(0)
            .validate()
            .is_err());
    }

    #[test]
    fn effective_cell_size_never_below_radius() {
        let config = MatchConfig::new(2.0, 0.5);
        assert_eq!(config.effective_cell_size_deg(), 2.0);
        let config = MatchConfig::new(0.001, 0.5);
        assert_eq!(config.effective_cell_size_deg(), 0.5);
    }

    #[test]
    fn from_arcsec_converts() {
        let config = MatchConfig::from_arcsec(36.0);
        assert!((config.radius_deg - 0.01).abs() < 1e-15);
    }

    #[test]
    fn invalid_coordinates_rejected() {
        let primary = pts(&[(10.0, 0.0)]);
        let reference = vec![Point {
            id: 0,
            ra_deg: 10.0,
            dec_deg: f64::NAN,
        }];
        let err = match_one_to_one(&primary, &reference, &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidInput(_)));
    }

    #[test]
    fn empty_catalogs_rejected_by_both_variants() {
        let some = pts(&[(10.0, 0.0)]);
        let config = MatchConfig::default();
        assert!(matches!(
            match_one_to_one(&[], &some, &config),
            Err(MatchError::InvalidInput(_))
        ));
        assert!(matches!(
            match_one_to_one(&some, &[], &config),
            Err(MatchError::InvalidInput(_))
        ));
        assert!(matches!(
            match_many_to_many(&[], &some, &config),
            Err(MatchError::InvalidInput(_))
        ));
    }

    #[test]
    fn overflow_truncates_or_fails() {
        let primary = pts(&[(10.0, 0.0), (10.0, 0.001), (10.0, 0.002)]);
        let reference = pts(&[(10.0, 0.0005), (10.0, 0.0015)]);
        let config = MatchConfig::new(0.01, 0.1).with_max_matches(2);

        let many = match_many_to_many(&primary, &reference, &config).unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many.total_candidate_count, 6);
        assert!(many.truncated);

        let err = match_one_to_one(&primary, &reference, &config.with_fail_on_overflow(true))
            .unwrap_err();
        assert_eq!(err, MatchError::TooManyMatches { found: 6, max: 2 });
    }

    #[test]
    fn lookup_helpers() {
        let primary = pts(&[(10.0, 0.0), (20.0, 0.0)]);
        let reference = pts(&[(20.0, 0.0001), (10.0, 0.0001)]);
        let result = match_one_to_one(&primary, &reference, &MatchConfig::from_arcsec(1.0)).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.reference_for(0).unwrap().reference_index, 1);
        assert_eq!(result.primary_for(0).unwrap().primary_index, 1);
        assert!(result.reference_for(5).is_none());
        for sep in result.separations_deg() {
            assert!((sep - 0.0001).abs() < 1e-9);
        }
    }

    #[test]
    fn lookups_agree_with_an_index_table() {
        let primary = pts(&[(10.0, 0.0), (10.0, 0.0002), (30.0, 5.0), (40.0, 0.0)]);
        let reference = pts(&[(10.0, 0.0001), (30.0, 5.0001), (10.0, 0.0003)]);
        let result = match_one_to_one(&primary, &reference, &MatchConfig::from_arcsec(1.0)).unwrap();
        let by_primary: std::collections::HashMap<usize, usize> = result
            .matches
            .iter()
            .map(|t| (t.primary_index, t.reference_index))
            .collect();
        for p in 0..primary.len() {
            assert_eq!(
                result.reference_for(p).map(|t| t.reference_index),
                by_primary.get(&p).copied()
            );
        }
        for (&p, &r) in &by_primary {
            assert_eq!(result.primary_for(r).unwrap().primary_index, p);
        }
        assert!(result.reference_for(3).is_none());
    }
}
