use rkyv::{Archive, Deserialize, Serialize};

use crate::sphere::{radec_to_uvec, wrap_ra_deg};
use crate::Vector3;

/// A position on the celestial sphere.
///
/// `id` is a catalog-defined label carried through for the caller's benefit.
/// Matching never looks at it: the identity of a point during a match is its
/// position in the slice it was passed in.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl Point {
    /// Create a point, wrapping RA into `[0, 360)`.
    pub fn new(id: u64, ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            id,
            ra_deg: wrap_ra_deg(ra_deg),
            dec_deg,
        }
    }

    /// Unit vector pointing to the point's position on the celestial sphere.
    pub fn uvec(&self) -> Vector3 {
        radec_to_uvec(self.ra_deg, self.dec_deg)
    }

    /// `true` when both coordinates are finite and Dec lies in `[-90, 90]`.
    pub fn is_valid(&self) -> bool {
        self.ra_deg.is_finite() && self.dec_deg.is_finite() && self.dec_deg.abs() <= 90.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wraps_ra() {
        let p = Point::new(7, -30.0, 12.0);
        assert_eq!(p.id, 7);
        assert!((p.ra_deg - 330.0).abs() < 1e-12);
        assert_eq!(p.dec_deg, 12.0);
    }

    #[test]
    fn uvec_is_unit_length() {
        let p = Point::new(0, 211.3, -47.2);
        assert!((p.uvec().norm() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn validity() {
        assert!(Point::new(0, 10.0, 90.0).is_valid());
        assert!(!Point::new(0, 10.0, 90.5).is_valid());
        assert!(!Point::new(0, f64::NAN, 0.0).is_valid());
    }
}
