use super::structures::{
    parameter_set::TierConstants,
    rating::Rating,
    tier::TierCode
};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Rating every player starts from, and the rating decay pulls toward.
pub const DEFAULT_RATING: Rating = Rating::from_hundredths(150_000);

// Margin of victory
pub const MARGIN_BASE: f64 = 0.85;
pub const MARGIN_SCALE: f64 = 0.3;
pub const MARGIN_MIN: f64 = 0.5;
pub const MARGIN_MAX: f64 = 2.0;
/// Dominance ratio used when a score has no countable games
pub const NEUTRAL_DOMINANCE: f64 = 0.5;

// Inactivity decay
pub const DECAY_RATE: f64 = 0.05;
pub const DECAY_GRACE_DAYS: f64 = 60.0;

// New / returning player K boost
pub const BOOST_NEW_THRESHOLD: i32 = 30;
pub const BOOST_NEW_MULTIPLIER: f64 = 1.5;
pub const BOOST_RETURNING_DAYS: f64 = 180.0;
pub const BOOST_RETURNING_MULTIPLIER: f64 = 1.3;
pub const BOOST_MIN: f64 = 1.0;
pub const BOOST_MAX: f64 = 3.0;

/// Built-in K/S constants. Women's tiers start out identical to the men's.
pub fn default_tier_constant(tier: TierCode) -> TierConstants {
    let (k, s) = match tier {
        TierCode::F | TierCode::WF => (183.0, 1241.0),
        TierCode::C | TierCode::WC => (137.0, 1441.0),
        TierCode::A | TierCode::WA => (108.0, 1670.0),
        TierCode::M | TierCode::WM => (107.0, 1809.0),
        TierCode::G | TierCode::WG => (116.0, 1428.0)
    };

    TierConstants { k, s }
}

pub fn default_tier_constants() -> BTreeMap<TierCode, TierConstants> {
    TierCode::iter()
        .map(|tier| (tier, default_tier_constant(tier)))
        .collect()
}
