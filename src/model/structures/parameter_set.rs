use super::tier::TierCode;
use crate::model::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// K (volatility) and S (spread) for one competition tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierConstants {
    pub k: f64,
    pub s: f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginParameters {
    pub base: f64,
    pub scale: f64
}

impl Default for MarginParameters {
    fn default() -> Self {
        MarginParameters {
            base: constants::MARGIN_BASE,
            scale: constants::MARGIN_SCALE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayParameters {
    /// Exponential rate per year of inactivity beyond the grace period
    pub rate: f64,
    pub grace_days: f64
}

impl Default for DecayParameters {
    fn default() -> Self {
        DecayParameters {
            rate: constants::DECAY_RATE,
            grace_days: constants::DECAY_GRACE_DAYS
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostParameters {
    /// Match count at which the new-player boost has fully faded
    pub new_threshold: i32,
    pub new_boost: f64,
    pub returning_days: f64,
    pub returning_boost: f64
}

impl Default for BoostParameters {
    fn default() -> Self {
        BoostParameters {
            new_threshold: constants::BOOST_NEW_THRESHOLD,
            new_boost: constants::BOOST_NEW_MULTIPLIER,
            returning_days: constants::BOOST_RETURNING_DAYS,
            returning_boost: constants::BOOST_RETURNING_MULTIPLIER
        }
    }
}

/// The tunable constants of the rating system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingParameters {
    pub tiers: BTreeMap<TierCode, TierConstants>,
    pub margin: MarginParameters,
    pub decay: DecayParameters,
    pub boost: BoostParameters
}

impl Default for RatingParameters {
    fn default() -> Self {
        RatingParameters {
            tiers: constants::default_tier_constants(),
            margin: MarginParameters::default(),
            decay: DecayParameters::default(),
            boost: BoostParameters::default()
        }
    }
}

impl RatingParameters {
    /// Constants for `tier`. Codes missing from the bundle use the built-in
    /// defaults so that partial bundles stay usable.
    pub fn tier_constants(&self, tier: TierCode) -> TierConstants {
        self.tiers
            .get(&tier)
            .copied()
            .unwrap_or_else(|| constants::default_tier_constant(tier))
    }
}

/// A named, immutable bundle of rating parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub name: String,
    pub params: RatingParameters,
    /// Where the bundle came from, e.g. `manual` or `optimizer`
    pub source: String,
    pub is_active: bool
}

impl ParameterSet {
    pub fn new(name: &str, params: RatingParameters) -> ParameterSet {
        ParameterSet {
            name: name.to_string(),
            params,
            source: "manual".to_string(),
            is_active: false
        }
    }
}
