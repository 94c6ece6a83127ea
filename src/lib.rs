//! # spherematch
//!
//! Cross-match two catalogs of points on the celestial sphere.
//!
//! For every point in a *primary* catalog, `spherematch` finds the point(s)
//! of a *reference* catalog within an angular search radius, and can resolve
//! competing candidates into a consistent one-to-one assignment.
//!
//! ## Example
//!
//! ```no_run
//! use spherematch::{Catalog, MatchConfig};
//!
//! let primary = Catalog::from_csv_path("data/detections.csv").unwrap();
//! let reference = Catalog::from_csv_path("data/reference.csv").unwrap();
//!
//! // 1.5 arcsec radius, 0.1 degree grid cells
//! let config = MatchConfig::new(1.5 / 3600.0, 0.1);
//! let result = primary.match_one_to_one(&reference, &config).unwrap();
//!
//! for m in &result.matches {
//!     println!(
//!         "{} -> {} ({:.3}\")",
//!         m.primary_index, m.reference_index, m.separation_arcsec()
//!     );
//! }
//! println!(
//!     "{} matches out of {} candidates ({} discarded conflicts)",
//!     result.len(),
//!     result.total_candidate_count,
//!     result.discarded.len()
//! );
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Grid** — bucket the reference catalog into RA/Dec chunks no smaller
//!    than the search radius, with an overlap margin equal to the radius
//! 2. **Generate** — for each primary point, read its chunk and keep every
//!    reference point within the radius
//! 3. **Classify** — pairs that are the only candidate for both their
//!    primary and reference point are kept outright
//! 4. **Resolve** — the remaining pairs are accepted closest-first, skipping
//!    any pair whose primary or reference point is already taken
//!
//! [`match_many_to_many`] stops after step 2 and returns every pair.

pub mod catalog;
pub mod error;
pub mod grid;
pub mod matching;
mod point;
pub mod sphere;

pub use catalog::Catalog;
pub use error::{MatchError, MatchOutcome};
pub use grid::{CellId, ChunkGrid};
pub use matching::{
    match_many_to_many, match_one_to_one, CandidateTriple, ManyMatchResult, MatchConfig,
    MatchResult,
};
pub use point::*;

// Commonly used types
// Positions are kept in f64 throughout: arcsecond-scale radii need more
// precision than f32 unit vectors provide.
pub type Vector3 = nalgebra::Vector3<f64>;
