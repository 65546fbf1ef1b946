use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, Neg, Sub}
};

/// Number of stored units per rating point.
pub const RATING_SCALE: i64 = 100;

/// A rating value with a fixed scale of hundredths of a point.
///
/// Ratings are computed in floating point and rounded into this type before
/// they are persisted, so that replays of the same history produce identical
/// values and the two sides of a match always move by exactly opposite
/// amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Rating(i64);

impl Rating {
    pub const ZERO: Rating = Rating(0);

    pub const fn from_hundredths(hundredths: i64) -> Rating {
        Rating(hundredths)
    }

    /// Rounds half away from zero to the nearest hundredth.
    pub fn from_points(points: f64) -> Rating {
        Rating((points * RATING_SCALE as f64).round() as i64)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub fn points(self) -> f64 {
        self.0 as f64 / RATING_SCALE as f64
    }
}

impl From<f64> for Rating {
    fn from(points: f64) -> Self {
        Rating::from_points(points)
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.points()
    }
}

impl Add for Rating {
    type Output = Rating;

    fn add(self, rhs: Rating) -> Rating {
        Rating(self.0 + rhs.0)
    }
}

impl Sub for Rating {
    type Output = Rating;

    fn sub(self, rhs: Rating) -> Rating {
        Rating(self.0 - rhs.0)
    }
}

impl Neg for Rating {
    type Output = Rating;

    fn neg(self) -> Rating {
        Rating(-self.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.points())
    }
}
