//! Unit-vector geometry on the celestial sphere.
//!
//! All angles are `f64`. Positions come in as RA/Dec in degrees and are
//! converted to unit vectors `(cos ra cos dec, sin ra cos dec, sin dec)` once
//! per point; separations are computed between unit vectors.

use crate::Vector3;

/// Unit vector for a position given in degrees.
#[inline]
pub fn radec_to_uvec(ra_deg: f64, dec_deg: f64) -> Vector3 {
    let (sin_ra, cos_ra) = ra_deg.to_radians().sin_cos();
    let (sin_dec, cos_dec) = dec_deg.to_radians().sin_cos();
    Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
}

/// RA/Dec in degrees for a unit vector. RA is in `[0, 360)`.
pub fn uvec_to_radec(v: &Vector3) -> (f64, f64) {
    let ra = wrap_ra_deg(v.y.atan2(v.x).to_degrees());
    let dec = v.z.clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

/// Great-circle angle between two unit vectors, in radians.
///
/// Uses `atan2(|u x v|, u . v)`, which keeps full precision for both
/// coincident and antipodal points. Always in `[0, pi]`.
#[inline]
pub fn separation(u: &Vector3, v: &Vector3) -> f64 {
    let cross = u.cross(v).norm();
    let dot = u.dot(v);
    cross.atan2(dot)
}

/// Haversine separation between two RA/Dec positions, everything in degrees.
pub fn separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let dec1 = dec1_deg.to_radians();
    let dec2 = dec2_deg.to_radians();
    let half_ddec = 0.5 * (dec2 - dec1);
    let half_dra = 0.5 * (ra2_deg - ra1_deg).to_radians();

    let h = half_ddec.sin().powi(2) + dec1.cos() * dec2.cos() * half_dra.sin().powi(2);
    (2.0 * h.sqrt().clamp(0.0, 1.0).asin()).to_degrees()
}

/// Chord length between two unit vectors -> center angle (radians).
#[inline]
pub fn angle_from_chord(chord: f64) -> f64 {
    2.0 * (0.5 * chord).clamp(-1.0, 1.0).asin()
}

/// Center angle (radians) -> chord length between two unit vectors.
#[inline]
pub fn chord_from_angle(angle: f64) -> f64 {
    2.0 * (0.5 * angle).sin()
}

/// Wrap an RA in degrees into `[0, 360)`.
#[inline]
pub fn wrap_ra_deg(ra_deg: f64) -> f64 {
    let ra = ra_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if ra >= 360.0 {
        0.0
    } else {
        ra
    }
}
