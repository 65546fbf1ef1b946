use super::{position::Position, rating::Rating};
use crate::model::{constants::DEFAULT_RATING, error::ProcessorError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current rating state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRatingState {
    pub player_id: i32,
    pub rating: Rating,
    pub match_count: i32,
    pub last_match_date: Option<NaiveDate>,
    /// Position of the last match applied to this state, `None` if none has been.
    pub last_position: Option<Position>,
    /// Highest rating ever held. Never below `rating`.
    pub career_peak: Rating
}

/// Aggregate of a player's processed history before some position, used to
/// rebuild their state when later history is invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySummary {
    pub last_rating: Rating,
    pub match_count: i32,
    pub last_match_date: Option<NaiveDate>,
    pub last_position: Position,
    pub peak_rating: Rating
}

/// What a single processed match did to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedMatch {
    pub position: Position,
    pub match_date: Option<NaiveDate>,
    pub rating_after: Rating
}

impl PlayerRatingState {
    /// A fresh state at the default rating with no history.
    pub fn seed(player_id: i32) -> PlayerRatingState {
        PlayerRatingState {
            player_id,
            rating: DEFAULT_RATING,
            match_count: 0,
            last_match_date: None,
            last_position: None,
            career_peak: DEFAULT_RATING
        }
    }

    /// Rebuilds the state a player had right after the match summarised by `history`.
    pub fn from_history(player_id: i32, history: &HistorySummary) -> PlayerRatingState {
        PlayerRatingState {
            player_id,
            rating: history.last_rating,
            match_count: history.match_count,
            last_match_date: history.last_match_date,
            last_position: Some(history.last_position),
            career_peak: DEFAULT_RATING.max(history.peak_rating).max(history.last_rating)
        }
    }

    /// Applies a processed match to this state.
    ///
    /// Matches must arrive in strictly increasing position order. A match at or
    /// before `last_position` is rejected; it has to go through the invalidation
    /// cascade instead.
    pub fn apply(&self, processed: &ProcessedMatch) -> Result<PlayerRatingState, ProcessorError> {
        if let Some(last) = self.last_position {
            if processed.position <= last {
                return Err(ProcessorError::OutOfOrder {
                    player_id: self.player_id,
                    position: processed.position,
                    last_position: last
                });
            }
        }

        Ok(PlayerRatingState {
            player_id: self.player_id,
            rating: processed.rating_after,
            match_count: self.match_count + 1,
            last_match_date: processed.match_date.or(self.last_match_date),
            last_position: Some(processed.position),
            career_peak: self.career_peak.max(processed.rating_after)
        })
    }

    /// Days between the player's last match and `match_date`, if both are known.
    pub fn days_idle(&self, match_date: Option<NaiveDate>) -> Option<i64> {
        match (self.last_match_date, match_date) {
            (Some(last), Some(current)) => Some((current - last).num_days()),
            _ => None
        }
    }

    /// True if the match at `position` is at or before what this state already reflects.
    pub fn already_reflects(&self, position: Position) -> bool {
        self.last_position.is_some_and(|last| position <= last)
    }
}
