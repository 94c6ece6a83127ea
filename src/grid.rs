//! RA/Dec chunk grid for fast candidate retrieval.
//!
//! Declination is split into stripes of equal height, and each stripe into
//! RA chunks whose width, measured as a true angle at the stripe's most
//! poleward edge, is at least the requested cell size. Chunks are stored
//! sparsely: only cells that received at least one point exist.
//!
//! Points are assigned with an overlap margin. A point is written into every
//! chunk that could hold a query position within `margin` of it, so a
//! query only ever needs to read its own cell:
//! 1. `build` lays out stripes and chunks over the reference points.
//! 2. `assign` buckets the reference points with margin = search radius.
//! 3. `lookup_cell` + `candidates_in_cell` answer a query.
//!
//! RA is measured from a rotated origin placed in the middle of the widest
//! empty RA gap of the built-over points, so the chunk layout's seam sits
//! in empty sky whenever the catalog leaves some.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{MatchError, MatchOutcome};
use crate::sphere::wrap_ra_deg;
use crate::Point;

/// Slack added to every assignment range so that rounding in the exact
/// separation test can never put a true neighbor outside the query cell.
const EDGE_PAD_DEG: f64 = 1e-9;

/// Largest number of chunks allowed along one axis. Keeps every chunk
/// index exactly representable in the `f64` arithmetic that computes it.
const MAX_CHUNKS_PER_AXIS: f64 = (1u64 << 52) as f64;

/// Identifies one RA chunk of one Dec stripe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub stripe: u64,
    pub chunk: u64,
}

/// Sparse RA/Dec chunk grid over a point set.
///
/// Only populated cells take memory; the stripe and chunk layout is
/// computed from the cell size on demand. Owned by a single match
/// invocation. Dropping it releases all chunk storage.
#[derive(Debug)]
pub struct ChunkGrid {
    cell_size_deg: f64,
    stripe_height_deg: f64,
    ra_origin_deg: f64,
    n_stripes: u64,
    cells: HashMap<CellId, Vec<usize>>,
    margin_deg: f64,
    num_assigned: usize,
}

impl ChunkGrid {
    /// Lay out a grid over `points` with cells no smaller than `min_cell_size_deg`.
    ///
    /// The points are only used to pick the RA origin; call [`ChunkGrid::assign`]
    /// to bucket them.
    pub fn build(points: &[Point], min_cell_size_deg: f64) -> MatchOutcome<Self> {
        if points.is_empty() {
            return Err(MatchError::InvalidInput(
                "cannot build a grid over an empty point set".to_string(),
            ));
        }
        if !(min_cell_size_deg.is_finite() && min_cell_size_deg > 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "minimum cell size must be positive and finite, got {min_cell_size_deg}"
            )));
        }

        if 360.0 / min_cell_size_deg > MAX_CHUNKS_PER_AXIS {
            return Err(MatchError::InvalidInput(format!(
                "minimum cell size {min_cell_size_deg} is too small to index"
            )));
        }

        let cell_size_deg = min_cell_size_deg.min(180.0);
        let n_stripes = ((180.0 / cell_size_deg).floor() as u64).max(1);
        let stripe_height_deg = 180.0 / n_stripes as f64;

        let ra_origin_deg = choose_ra_origin(points);
        debug!(
            "Chunk grid: {} stripes of {:.6}°, cell size {:.6}°, RA origin {:.4}°",
            n_stripes, stripe_height_deg, cell_size_deg, ra_origin_deg
        );

        Ok(Self {
            cell_size_deg,
            stripe_height_deg,
            ra_origin_deg,
            n_stripes,
            cells: HashMap::new(),
            margin_deg: 0.0,
            num_assigned: 0,
        })
    }

    /// Bucket `points` into the grid with an overlap margin.
    ///
    /// Afterwards, every point within `margin_deg` of a query position is
    /// listed in the query position's cell. Indices stored are positions in
    /// `points`.
    pub fn assign(&mut self, points: &[Point], margin_deg: f64) -> MatchOutcome<()> {
        if !(margin_deg.is_finite() && margin_deg >= 0.0) {
            return Err(MatchError::InvalidInput(format!(
                "grid margin must be non-negative and finite, got {margin_deg}"
            )));
        }
        self.margin_deg = self.margin_deg.max(margin_deg);
        let margin = margin_deg + EDGE_PAD_DEG;

        for (idx, point) in points.iter().enumerate() {
            let dec_lo = point.dec_deg - margin;
            let dec_hi = point.dec_deg + margin;
            let touches_pole = dec_lo <= -90.0 || dec_hi >= 90.0;
            let ra_half_span = if touches_pole {
                None
            } else {
                ra_half_span_deg(margin, point.dec_deg)
            };
            let local_ra = self.local_ra(point.ra_deg);

            for stripe in self.stripe_of(dec_lo)..=self.stripe_of(dec_hi) {
                let n_chunks = self.chunks_in_stripe(stripe);
                let mut cells = Vec::new();
                match ra_half_span {
                    Some(half) if 2.0 * half < 360.0 => {
                        for_each_wrapped_chunk(
                            n_chunks,
                            local_ra - half,
                            local_ra + half,
                            |chunk| cells.push(CellId { stripe, chunk }),
                        );
                    }
                    _ => cells.extend((0..n_chunks).map(|chunk| CellId { stripe, chunk })),
                }
                for cell in cells {
                    let bucket = self.cells.entry(cell).or_default();
                    bucket.try_reserve(1)?;
                    bucket.push(idx);
                }
            }
        }

        self.num_assigned += points.len();
        trace!(
            "Assigned {} points into {} populated chunks (margin {:.6}°)",
            points.len(),
            self.cells.len(),
            margin_deg
        );
        Ok(())
    }

    /// Cell containing the given position.
    pub fn lookup_cell(&self, ra_deg: f64, dec_deg: f64) -> CellId {
        let stripe = self.stripe_of(dec_deg);
        let n_chunks = self.chunks_in_stripe(stripe);
        let chunk = chunk_of(n_chunks, self.local_ra(ra_deg));
        CellId { stripe, chunk }
    }

    /// Indices of the points assigned to `cell`. Empty for unpopulated cells.
    pub fn candidates_in_cell(&self, cell: CellId) -> &[usize] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shorthand for `candidates_in_cell(lookup_cell(ra, dec))`.
    pub fn candidates_near(&self, ra_deg: f64, dec_deg: f64) -> &[usize] {
        self.candidates_in_cell(self.lookup_cell(ra_deg, dec_deg))
    }

    pub fn cell_size_deg(&self) -> f64 {
        self.cell_size_deg
    }

    pub fn ra_origin_deg(&self) -> f64 {
        self.ra_origin_deg
    }

    pub fn margin_deg(&self) -> f64 {
        self.margin_deg
    }

    pub fn num_stripes(&self) -> u64 {
        self.n_stripes
    }

    /// Number of RA chunks in a Dec stripe (stripes numbered south to north).
    ///
    /// Chunk width measured at the stripe's most poleward edge is at least
    /// the cell size; stripes touching a pole hold a single chunk.
    pub fn chunks_in_stripe(&self, stripe: u64) -> u64 {
        let dec_lo = -90.0 + stripe as f64 * self.stripe_height_deg;
        let dec_hi = dec_lo + self.stripe_height_deg;
        let poleward = dec_lo.abs().max(dec_hi.abs()).min(90.0);
        let circumference = 360.0 * poleward.to_radians().cos();
        (circumference / self.cell_size_deg)
            .floor()
            .clamp(1.0, MAX_CHUNKS_PER_AXIS) as u64
    }

    /// Number of cells holding at least one point.
    pub fn num_populated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of points assigned so far (each counted once, regardless of overlap).
    pub fn num_assigned(&self) -> usize {
        self.num_assigned
    }

    fn local_ra(&self, ra_deg: f64) -> f64 {
        wrap_ra_deg(ra_deg - self.ra_origin_deg)
    }

    fn stripe_of(&self, dec_deg: f64) -> u64 {
        let n_stripes = self.n_stripes;
        let u = ((dec_deg.clamp(-90.0, 90.0) + 90.0) / self.stripe_height_deg).floor();
        (u.max(0.0) as u64).min(n_stripes - 1)
    }
}

impl Drop for ChunkGrid {
    fn drop(&mut self) {
        trace!(
            "Releasing chunk grid: {} populated chunks, {} points",
            self.cells.len(),
            self.num_assigned
        );
    }
}

/// Largest RA offset (degrees) reachable within `radius_deg` of a point at
/// `dec_deg`, or `None` when the circle wraps all the way around in RA.
///
/// Only meaningful when the circle does not contain a pole.
fn ra_half_span_deg(radius_deg: f64, dec_deg: f64) -> Option<f64> {
    let cos_dec = dec_deg.to_radians().cos();
    if cos_dec <= 0.0 {
        return None;
    }
    let s = radius_deg.to_radians().sin() / cos_dec;
    if s >= 1.0 {
        return None;
    }
    Some(s.asin().to_degrees() + EDGE_PAD_DEG)
}

fn chunk_of(n_chunks: u64, local_ra_deg: f64) -> u64 {
    let u = (local_ra_deg / 360.0).clamp(0.0, 1.0);
    ((u * n_chunks as f64).floor() as u64).min(n_chunks - 1)
}

/// Call `f` for every chunk overlapping local RA range `[ra_min, ra_max]`,
/// which may extend past either end of `[0, 360)`.
fn for_each_wrapped_chunk<F>(n_chunks: u64, ra_min: f64, ra_max: f64, mut f: F)
where
    F: FnMut(u64),
{
    let start = wrap_ra_deg(ra_min);
    let end = wrap_ra_deg(ra_max);
    let start_chunk = chunk_of(n_chunks, start);
    let end_chunk = chunk_of(n_chunks, end);

    if start <= end {
        for chunk in start_chunk..=end_chunk {
            f(chunk);
        }
        return;
    }

    // Range crosses the seam; avoid visiting a chunk twice when both
    // pieces land in the same chunk.
    if start_chunk <= end_chunk {
        for chunk in 0..n_chunks {
            f(chunk);
        }
        return;
    }
    for chunk in start_chunk..n_chunks {
        f(chunk);
    }
    for chunk in 0..=end_chunk {
        f(chunk);
    }
}

/// RA origin (degrees) at the middle of the widest gap between consecutive
/// point RAs, wraparound gap included.
fn choose_ra_origin(points: &[Point]) -> f64 {
    let mut ras: Vec<f64> = points
        .iter()
        .map(|p| p.ra_deg)
        .filter(|ra| ra.is_finite())
        .map(wrap_ra_deg)
        .collect();
    if ras.is_empty() {
        return 0.0;
    }
    ras.sort_unstable_by(|a, b| a.total_cmp(b));

    let first = ras[0];
    let last = ras[ras.len() - 1];
    let mut best_gap = first + 360.0 - last;
    let mut best_start = last;
    for pair in ras.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > best_gap {
            best_gap = gap;
            best_start = pair[0];
        }
    }
    wrap_ra_deg(best_start + 0.5 * best_gap)
}
