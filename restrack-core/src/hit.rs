//! Hit types for TPC readout data.

use std::fmt;
use std::ops::{Add, Mul, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Projection kind of a hit.
///
/// A strip readout only measures one transverse coordinate, so its hits
/// carry NaN in the other one. Pixel readouts produce full 3D hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HitKind {
    /// X and Z measured, Y is NaN.
    Xz,
    /// Y and Z measured, X is NaN.
    Yz,
    /// All three coordinates measured.
    Xyz,
}

impl HitKind {
    /// Classifies a coordinate triple. Returns `None` when more than one
    /// coordinate is NaN, when Z is NaN, or when any coordinate is
    /// infinite.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Option<Self> {
        // Some(true) for a measured coordinate, Some(false) for a missing one.
        let measured = |v: f64| {
            if v.is_nan() {
                Some(false)
            } else {
                v.is_finite().then_some(true)
            }
        };
        match (measured(x)?, measured(y)?, measured(z)?) {
            (true, true, true) => Some(Self::Xyz),
            (true, false, true) => Some(Self::Xz),
            (false, true, true) => Some(Self::Yz),
            _ => None,
        }
    }
}

impl fmt::Display for HitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Xz => "XZ",
            Self::Yz => "YZ",
            Self::Xyz => "XYZ",
        };
        f.write_str(name)
    }
}

/// A position in detector coordinates (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Replaces NaN coordinates by zero so that projected hits can take
    /// part in vector arithmetic on their two measured axes.
    #[inline]
    #[must_use]
    pub fn projected(self) -> Self {
        let fix = |v: f64| if v.is_nan() { 0.0 } else { v };
        Self::new(fix(self.x), fix(self.y), fix(self.z))
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Squared magnitude.
    #[inline]
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    /// Magnitude.
    #[inline]
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    /// Squared Euclidean distance. A NaN axis contributes nothing.
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        (self.projected() - other.projected()).mag2()
    }

    /// Euclidean distance. A NaN axis contributes nothing.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Point at fraction `t` of the segment from `self` to `other`.
    #[inline]
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        *self + (*other - *self) * t
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Position {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A single energy deposit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hit {
    /// Deposit position. One of X/Y is NaN for projected hits.
    pub position: Position,
    /// Deposited energy (keV), non negative.
    pub energy: f64,
    /// Time of the deposit.
    pub time: f64,
}

impl Hit {
    /// Creates a 3D hit at time zero.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, energy: f64) -> Self {
        Self {
            position: Position::new(x, y, z),
            energy,
            time: 0.0,
        }
    }

    /// Creates an XZ hit (Y is NaN).
    #[inline]
    pub fn xz(x: f64, z: f64, energy: f64) -> Self {
        Self::new(x, f64::NAN, z, energy)
    }

    /// Creates a YZ hit (X is NaN).
    #[inline]
    pub fn yz(y: f64, z: f64, energy: f64) -> Self {
        Self::new(f64::NAN, y, z, energy)
    }

    /// Sets the hit time.
    #[inline]
    #[must_use]
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Returns the projection kind, if the hit has a valid one.
    #[inline]
    pub fn kind(&self) -> Option<HitKind> {
        HitKind::from_coords(self.position.x, self.position.y, self.position.z)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hit_kind_from_coords() {
        assert_eq!(HitKind::from_coords(1.0, 2.0, 3.0), Some(HitKind::Xyz));
        assert_eq!(HitKind::from_coords(1.0, f64::NAN, 3.0), Some(HitKind::Xz));
        assert_eq!(HitKind::from_coords(f64::NAN, 2.0, 3.0), Some(HitKind::Yz));
        assert_eq!(HitKind::from_coords(f64::NAN, f64::NAN, 3.0), None);
        assert_eq!(HitKind::from_coords(1.0, 2.0, f64::NAN), None);
        assert_eq!(HitKind::from_coords(f64::INFINITY, 2.0, 3.0), None);
        assert_eq!(HitKind::from_coords(1.0, f64::NAN, f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_position_distance() {
        let p1 = Position::new(0.0, 0.0, 0.0);
        let p2 = Position::new(3.0, 4.0, 12.0);
        assert_relative_eq!(p1.distance_squared(&p2), 169.0);
        assert_relative_eq!(p1.distance(&p2), 13.0);
    }

    #[test]
    fn test_projected_distance_ignores_missing_axis() {
        let a = Hit::xz(0.0, 0.0, 1.0);
        let b = Hit::xz(3.0, 4.0, 1.0);
        assert_relative_eq!(a.position.distance(&b.position), 5.0);

        let c = Hit::yz(1.0, 1.0, 1.0);
        let d = Hit::yz(1.0, 3.0, 1.0);
        assert_relative_eq!(c.position.distance(&d.position), 2.0);
    }

    #[test]
    fn test_lerp() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(10.0, -10.0, 4.0);
        let m = a.lerp(&b, 0.25);
        assert_relative_eq!(m.x, 2.5);
        assert_relative_eq!(m.y, -2.5);
        assert_relative_eq!(m.z, 1.0);
    }

    #[test]
    fn test_hit_constructors() {
        let hit = Hit::new(1.0, 2.0, 3.0, 50.0).with_time(7.0);
        assert_eq!(hit.kind(), Some(HitKind::Xyz));
        assert_relative_eq!(hit.time, 7.0);
        assert_eq!(Hit::xz(1.0, 2.0, 1.0).kind(), Some(HitKind::Xz));
        assert_eq!(Hit::yz(1.0, 2.0, 1.0).kind(), Some(HitKind::Yz));
        assert_eq!(format!("{}", HitKind::Xyz), "XYZ");
    }
}
