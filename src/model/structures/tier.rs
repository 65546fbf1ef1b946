use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Competition tier code used to look up the K/S constants of a match.
///
/// The `W` codes are the women's equivalents of the base codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
pub enum TierCode {
    /// ITF / Futures
    F,
    /// Challenger
    C,
    /// 250 and 500 events
    A,
    /// 1000 events and tour finals
    M,
    /// Grand Slams
    G,
    WF,
    WC,
    WA,
    WM,
    WG
}

impl TierCode {
    /// Tier used when a level name is missing or not in the lookup table.
    pub const DEFAULT: TierCode = TierCode::A;

    /// Resolves a tournament level name (and optionally its tour) to a tier code.
    ///
    /// Unknown or missing level names fall back to [`TierCode::DEFAULT`].
    pub fn resolve(level: Option<&str>, tour: Option<&str>) -> TierCode {
        let level = level.map(str::trim).unwrap_or_default();
        let base = Self::base_code(level);

        let womens = tour.is_some_and(|t| t.trim().eq_ignore_ascii_case("WTA"))
            || level.starts_with("WTA")
            || level.starts_with("ITF W");

        if womens {
            base.womens()
        } else {
            base
        }
    }

    fn base_code(level: &str) -> TierCode {
        match level {
            "Grand Slam" => TierCode::G,
            "Masters 1000" | "WTA 1000" | "ATP Finals" | "WTA Finals" => TierCode::M,
            "ATP 500" | "WTA 500" | "ATP 250" | "WTA 250" => TierCode::A,
            "Challenger" | "ATP Challenger" | "WTA 125" => TierCode::C,
            "ITF" | "Future" | "ITF M25" | "ITF M15" | "ITF W25" | "ITF W15" => TierCode::F,
            _ => TierCode::DEFAULT
        }
    }

    /// The women's code for this tier. Women's codes map to themselves.
    pub fn womens(self) -> TierCode {
        match self {
            TierCode::F | TierCode::WF => TierCode::WF,
            TierCode::C | TierCode::WC => TierCode::WC,
            TierCode::A | TierCode::WA => TierCode::WA,
            TierCode::M | TierCode::WM => TierCode::WM,
            TierCode::G | TierCode::WG => TierCode::WG
        }
    }
}
