//! Ordered point catalogs and their on-disk forms.
//!
//! A `Catalog` is just an ordered list of points; position in the list is
//! the identity used by matching. Catalogs can be read from CSV files with
//! an `id,ra_deg,dec_deg` header, and snapshotted to disk with rkyv for fast
//! reloading.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MatchOutcome;
use crate::matching::{self, ManyMatchResult, MatchConfig, MatchResult};
use crate::Point;

#[derive(Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize)]
pub struct Catalog {
    pub points: Vec<Point>,
}

impl Catalog {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a catalog from `(ra_deg, dec_deg)` pairs; ids are the positions.
    pub fn from_radec(coords: &[(f64, f64)]) -> Self {
        let points = coords
            .iter()
            .enumerate()
            .map(|(i, &(ra, dec))| Point::new(i as u64, ra, dec))
            .collect();
        Self { points }
    }

    /// Return the total number of points in the catalog.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Return `true` when the catalog contains no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Return all points as an immutable slice.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Exclusive (one-to-one) cross-match of this catalog against `reference`.
    pub fn match_one_to_one(
        &self,
        reference: &Catalog,
        config: &MatchConfig,
    ) -> MatchOutcome<MatchResult> {
        matching::match_one_to_one(&self.points, &reference.points, config)
    }

    /// Every pair within the search radius, with no exclusivity.
    pub fn match_many_to_many(
        &self,
        reference: &Catalog,
        config: &MatchConfig,
    ) -> MatchOutcome<ManyMatchResult> {
        matching::match_many_to_many(&self.points, &reference.points, config)
    }

    /// Read an `id,ra_deg,dec_deg` CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        let catalog = Self::from_csv_reader(file)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        info!("Loaded {} points from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Read `id,ra_deg,dec_deg` CSV records. The first row is a header.
    ///
    /// Rows whose coordinates do not parse, or that lie off the sphere, are
    /// skipped. A missing or unparsable id falls back to the row position.
    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            let id: u64 = record
                .get(0)
                .and_then(|s| s.parse().ok())
                .unwrap_or(row as u64);
            let ra: Option<f64> = record.get(1).and_then(|s| s.parse().ok());
            let dec: Option<f64> = record.get(2).and_then(|s| s.parse().ok());
            match (ra, dec) {
                (Some(ra), Some(dec)) => {
                    let point = Point::new(id, ra, dec);
                    if point.is_valid() {
                        points.push(point);
                    } else {
                        skipped += 1;
                    }
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("Skipped {} unusable catalog rows", skipped);
        }
        Ok(Self { points })
    }

    /// Write the catalog as `id,ra_deg,dec_deg` CSV.
    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        wtr.write_record(["id", "ra_deg", "dec_deg"])?;
        for p in &self.points {
            wtr.write_record(&[p.id.to_string(), p.ra_deg.to_string(), p.dec_deg.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Serialize the catalog to bytes using rkyv.
    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the catalog to a file using rkyv.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes)?;
        info!("Saved catalog to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load a catalog from an rkyv file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let catalog = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&bytes)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        info!("Loaded catalog: {} points", catalog.len());
        Ok(catalog)
    }
}

impl From<Vec<Point>> for Catalog {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point> for Catalog {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
