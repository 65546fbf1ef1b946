use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Terminal outcome of a match. Only these statuses are eligible for rating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MatchOutcome {
    Completed,
    Retired,
    Walkover,
    Default
}

impl MatchOutcome {
    /// Statuses as stored in the `status` column, in declaration order.
    pub const TERMINAL_STATUSES: [&'static str; 4] = ["completed", "retired", "walkover", "default"];

    /// Only completed matches carry a score that reflects the players' level.
    pub fn has_reliable_score(self) -> bool {
        matches!(self, MatchOutcome::Completed)
    }
}

/// Statuses a match passes through before it has a result.
pub const UPCOMING_STATUSES: [&str; 2] = ["upcoming", "scheduled"];
