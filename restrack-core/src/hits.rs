//! Structure of Arrays (`SoA`) hit container.
//!
//! `Hits` stores the deposits of an event, or of a single track, in
//! parallel vectors. The order of the vectors is meaningful for tracks:
//! after path minimization it is the visiting order of the trajectory.
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use crate::error::{Error, Result};
use crate::hit::{Hit, HitKind, Position};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A collection of hits stored in Structure of Arrays (`SoA`) format.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hits {
    /// Columnar storage for X coordinates (NaN for YZ hits).
    pub x: Vec<f64>,
    /// Columnar storage for Y coordinates (NaN for XZ hits).
    pub y: Vec<f64>,
    /// Columnar storage for Z coordinates.
    pub z: Vec<f64>,
    /// Columnar storage for deposited energies.
    pub energy: Vec<f64>,
    /// Columnar storage for hit times.
    pub time: Vec<f64>,
}

/// The hits of an event split by projection kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedHits {
    pub xz: Hits,
    pub yz: Hits,
    pub xyz: Hits,
}

impl Hits {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty collection with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            energy: Vec::with_capacity(capacity),
            time: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of hits.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if there are no hits.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Clears all vectors.
    pub fn clear(&mut self) {
        self.x.clear();
        self.y.clear();
        self.z.clear();
        self.energy.clear();
        self.time.clear();
    }

    /// Pushes a single hit.
    pub fn push(&mut self, hit: Hit) {
        self.x.push(hit.position.x);
        self.y.push(hit.position.y);
        self.z.push(hit.position.z);
        self.energy.push(hit.energy);
        self.time.push(hit.time);
    }

    /// Appends all hits from another collection.
    pub fn append(&mut self, other: &Hits) {
        self.x.extend_from_slice(&other.x);
        self.y.extend_from_slice(&other.y);
        self.z.extend_from_slice(&other.z);
        self.energy.extend_from_slice(&other.energy);
        self.time.extend_from_slice(&other.time);
    }

    /// Returns hit `n`, or `None` if out of range.
    pub fn get(&self, n: usize) -> Option<Hit> {
        (n < self.len()).then(|| self.hit(n))
    }

    /// Returns hit `n`.
    ///
    /// # Panics
    /// Panics if `n` is out of range.
    #[inline]
    pub fn hit(&self, n: usize) -> Hit {
        Hit {
            position: self.position(n),
            energy: self.energy[n],
            time: self.time[n],
        }
    }

    /// Returns the position of hit `n`.
    #[inline]
    pub fn position(&self, n: usize) -> Position {
        Position::new(self.x[n], self.y[n], self.z[n])
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = Hit> + '_ {
        (0..self.len()).map(move |n| self.hit(n))
    }

    /// Returns the common projection kind of all hits.
    ///
    /// `Ok(None)` for an empty collection. Mixed projections are an
    /// error: every algorithm working on distances assumes that all hits
    /// share the same missing axis.
    pub fn kind(&self) -> Result<Option<HitKind>> {
        let mut expected = None;
        for (index, hit) in self.iter().enumerate() {
            let found = hit.kind().ok_or(Error::InvalidHit(index))?;
            match expected {
                None => expected = Some(found),
                Some(kind) if kind != found => {
                    return Err(Error::MixedProjections {
                        expected: kind,
                        found,
                        index,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(expected)
    }

    /// Splits a mixed collection into its XZ, YZ and XYZ parts,
    /// preserving the relative order of the hits.
    pub fn split_by_kind(&self) -> Result<ProjectedHits> {
        let mut split = ProjectedHits::default();
        for (index, hit) in self.iter().enumerate() {
            match hit.kind().ok_or(Error::InvalidHit(index))? {
                HitKind::Xz => split.xz.push(hit),
                HitKind::Yz => split.yz.push(hit),
                HitKind::Xyz => split.xyz.push(hit),
            }
        }
        Ok(split)
    }

    /// Sum of the hit energies.
    pub fn total_energy(&self) -> f64 {
        self.energy.iter().sum()
    }

    /// Squared distance between hits `n` and `m`, ignoring the missing
    /// axis of projected hits.
    #[inline]
    pub fn distance_squared(&self, n: usize, m: usize) -> f64 {
        self.position(n).distance_squared(&self.position(m))
    }

    /// Distance between hits `n` and `m`.
    #[inline]
    pub fn distance(&self, n: usize, m: usize) -> f64 {
        self.distance_squared(n, m).sqrt()
    }

    /// Length of the path visiting the hits in storage order.
    pub fn total_length(&self) -> f64 {
        (1..self.len()).map(|n| self.distance(n - 1, n)).sum()
    }

    /// Merges hit `m` into hit `n`.
    ///
    /// Position and time become the energy-weighted mean, the energies
    /// are summed and hit `m` is removed. Indices above `m` shift down.
    pub fn merge_hits(&mut self, n: usize, m: usize) {
        let (en, em) = (self.energy[n], self.energy[m]);
        let total = en + em;
        if total > 0.0 {
            let mean = |a: f64, b: f64| (a * en + b * em) / total;
            self.x[n] = mean(self.x[n], self.x[m]);
            self.y[n] = mean(self.y[n], self.y[m]);
            self.z[n] = mean(self.z[n], self.z[m]);
            self.time[n] = mean(self.time[n], self.time[m]);
        }
        self.energy[n] = total;
        self.remove_hit(m);
    }

    /// Removes hit `n`.
    pub fn remove_hit(&mut self, n: usize) {
        self.x.remove(n);
        self.y.remove(n);
        self.z.remove(n);
        self.energy.remove(n);
        self.time.remove(n);
    }

    /// Swaps hits `i` and `j`.
    pub fn swap_hits(&mut self, i: usize, j: usize) {
        self.x.swap(i, j);
        self.y.swap(i, j);
        self.z.swap(i, j);
        self.energy.swap(i, j);
        self.time.swap(i, j);
    }

    /// Returns a copy of the hits visited in the given order.
    ///
    /// # Panics
    /// Panics if an index in `order` is out of range.
    pub fn reordered(&self, order: &[usize]) -> Hits {
        order.iter().map(|&n| self.hit(n)).collect()
    }

    /// Checks whether hit `n` lies strictly inside the finite cylinder of
    /// axis `x0 -> x1` and the given radius.
    pub fn is_hit_inside_cylinder(&self, n: usize, x0: Position, x1: Position, radius: f64) -> bool {
        let x0 = x0.projected();
        let axis = x1.projected() - x0;
        let length = axis.mag();
        if length <= 0.0 {
            return false;
        }

        let rel = self.position(n).projected() - x0;
        let l = axis.dot(&rel) / length;
        if l <= 0.0 || l >= length {
            return false;
        }

        let r2 = (rel.mag2() - l * l).max(0.0);
        r2.sqrt() < radius
    }

    /// Total energy of the hits inside the cylinder `x0 -> x1`.
    pub fn energy_in_cylinder(&self, x0: Position, x1: Position, radius: f64) -> f64 {
        (0..self.len())
            .filter(|&n| self.is_hit_inside_cylinder(n, x0, x1, radius))
            .map(|n| self.energy[n])
            .sum()
    }
}

impl FromIterator<Hit> for Hits {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        let mut hits = Hits::new();
        hits.extend(iter);
        hits
    }
}

impl Extend<Hit> for Hits {
    fn extend<I: IntoIterator<Item = Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.push(hit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line() -> Hits {
        (0..5).map(|i| Hit::new(f64::from(i), 0.0, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_hits_operations() {
        let mut hits = Hits::with_capacity(10);
        assert!(hits.is_empty());

        hits.push(Hit::new(10.0, 20.0, 30.0, 5.0));
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits.x[0], 10.0);
        assert!(hits.get(1).is_none());

        hits.push(Hit::new(11.0, 21.0, 31.0, 6.0));
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits.total_energy(), 11.0);

        hits.clear();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_kind_detects_mixed_projections() {
        let mut hits = Hits::new();
        assert_eq!(hits.kind().unwrap(), None);

        hits.push(Hit::xz(0.0, 0.0, 1.0));
        hits.push(Hit::xz(1.0, 0.0, 1.0));
        assert_eq!(hits.kind().unwrap(), Some(HitKind::Xz));

        hits.push(Hit::yz(1.0, 0.0, 1.0));
        assert!(matches!(
            hits.kind(),
            Err(Error::MixedProjections { index: 2, .. })
        ));
    }

    #[test]
    fn test_split_by_kind() {
        let hits: Hits = vec![
            Hit::xz(0.0, 0.0, 1.0),
            Hit::new(0.0, 0.0, 0.0, 1.0),
            Hit::yz(0.0, 0.0, 1.0),
            Hit::xz(1.0, 0.0, 1.0),
        ]
        .into_iter()
        .collect();

        let split = hits.split_by_kind().unwrap();
        assert_eq!(split.xz.len(), 2);
        assert_eq!(split.yz.len(), 1);
        assert_eq!(split.xyz.len(), 1);

        let bad: Hits = std::iter::once(Hit::new(f64::NAN, f64::NAN, 0.0, 1.0)).collect();
        assert_eq!(bad.split_by_kind(), Err(Error::InvalidHit(0)));

        let infinite: Hits = vec![Hit::xz(0.0, 0.0, 1.0), Hit::xz(f64::INFINITY, 0.0, 1.0)]
            .into_iter()
            .collect();
        assert_eq!(infinite.split_by_kind(), Err(Error::InvalidHit(1)));
        assert_eq!(infinite.kind(), Err(Error::InvalidHit(1)));
    }

    #[test]
    fn test_total_length_and_reorder() {
        let hits = line();
        assert_relative_eq!(hits.total_length(), 4.0);

        let shuffled = hits.reordered(&[2, 0, 4, 1, 3]);
        assert_relative_eq!(shuffled.total_length(), 11.0);
    }

    #[test]
    fn test_merge_hits() {
        let mut hits = Hits::new();
        hits.push(Hit::new(0.0, 0.0, 0.0, 1.0).with_time(0.0));
        hits.push(Hit::new(4.0, 0.0, 0.0, 3.0).with_time(4.0));
        hits.push(Hit::new(9.0, 9.0, 9.0, 1.0));

        hits.merge_hits(0, 1);
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits.x[0], 3.0);
        assert_relative_eq!(hits.time[0], 3.0);
        assert_relative_eq!(hits.energy[0], 4.0);
        assert_relative_eq!(hits.x[1], 9.0);
    }

    #[test]
    fn test_swap_hits() {
        let mut hits = line();
        hits.swap_hits(0, 4);
        assert_relative_eq!(hits.x[0], 4.0);
        assert_relative_eq!(hits.x[4], 0.0);
    }

    #[test]
    fn test_energy_in_cylinder() {
        let mut hits = Hits::new();
        hits.push(Hit::new(5.0, 0.5, 0.0, 2.0));
        hits.push(Hit::new(5.0, 3.0, 0.0, 7.0));
        hits.push(Hit::new(12.0, 0.0, 0.0, 11.0));
        hits.push(Hit::new(0.0, 0.0, 0.0, 13.0));

        let x0 = Position::new(0.0, 0.0, 0.0);
        let x1 = Position::new(10.0, 0.0, 0.0);
        assert!(hits.is_hit_inside_cylinder(0, x0, x1, 1.0));
        assert!(!hits.is_hit_inside_cylinder(1, x0, x1, 1.0));
        assert!(!hits.is_hit_inside_cylinder(2, x0, x1, 1.0));
        // End caps are excluded.
        assert!(!hits.is_hit_inside_cylinder(3, x0, x1, 1.0));

        assert_relative_eq!(hits.energy_in_cylinder(x0, x1, 1.0), 2.0);
        assert_relative_eq!(hits.energy_in_cylinder(x0, x1, 5.0), 9.0);
    }
}
