use super::{match_outcome::MatchOutcome, position::Position, rating::Rating, tier::TierCode};
use crate::model::error::ProcessorError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B
}

/// A row of the `matches` table as the engine sees it.
///
/// Identity columns (players, winner, status, ordering, tier, score) are owned by
/// ingestion and never written here. The `rating_*` columns are owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i32,
    pub player_a_id: i32,
    pub player_b_id: i32,
    pub winner_id: Option<i32>,
    pub status: String,
    pub temporal_order: Option<i64>,
    pub tier: Option<String>,
    pub tour: Option<String>,
    pub score: Option<String>,
    pub match_date: Option<NaiveDate>,
    pub rating_pre_player_a: Option<Rating>,
    pub rating_pre_player_b: Option<Rating>,
    pub rating_post_player_a: Option<Rating>,
    pub rating_post_player_b: Option<Rating>,
    pub rating_params_version: Option<String>,
    pub rating_processed_at: Option<DateTime<Utc>>,
    pub rating_needs_recompute: bool
}

impl MatchRecord {
    /// Both post-match snapshots are populated.
    pub fn is_processed(&self) -> bool {
        self.rating_post_player_a.is_some() && self.rating_post_player_b.is_some()
    }

    pub fn position(&self) -> Option<Position> {
        self.temporal_order.map(|order| Position::new(order, self.id))
    }

    pub fn involves(&self, player_id: i32) -> bool {
        self.player_a_id == player_id || self.player_b_id == player_id
    }

    /// The other participant, if `player_id` took part in this match.
    pub fn opponent_of(&self, player_id: i32) -> Option<i32> {
        if self.player_a_id == player_id {
            Some(self.player_b_id)
        } else if self.player_b_id == player_id {
            Some(self.player_a_id)
        } else {
            None
        }
    }

    /// The post-match rating of `player_id`, if this match has been processed.
    pub fn post_rating_of(&self, player_id: i32) -> Option<Rating> {
        if self.player_a_id == player_id {
            self.rating_post_player_a
        } else if self.player_b_id == player_id {
            self.rating_post_player_b
        } else {
            None
        }
    }

    pub fn clear_ratings(&mut self) {
        self.rating_pre_player_a = None;
        self.rating_pre_player_b = None;
        self.rating_post_player_a = None;
        self.rating_post_player_b = None;
        self.rating_params_version = None;
        self.rating_processed_at = None;
        self.rating_needs_recompute = false;
    }
}

/// A terminal match with every field the engine relies on present and consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleMatch {
    pub id: i32,
    pub player_a_id: i32,
    pub player_b_id: i32,
    pub winner: Side,
    pub outcome: MatchOutcome,
    pub position: Position,
    pub tier: TierCode,
    pub score: Option<String>,
    pub match_date: Option<NaiveDate>,
    /// The match already carried snapshots when it was selected (it was flagged
    /// for recompute rather than being new).
    pub previously_processed: bool
}

impl EligibleMatch {
    pub fn player_ids(&self) -> [i32; 2] {
        [self.player_a_id, self.player_b_id]
    }
}

impl TryFrom<&MatchRecord> for EligibleMatch {
    type Error = ProcessorError;

    fn try_from(record: &MatchRecord) -> Result<Self, Self::Error> {
        let integrity = |reason: &str| ProcessorError::DataIntegrity {
            match_id: record.id,
            reason: reason.to_string()
        };

        let outcome = MatchOutcome::from_str(record.status.trim())
            .map_err(|_| integrity(&format!("status '{}' is not terminal", record.status)))?;
        let temporal_order = record
            .temporal_order
            .ok_or_else(|| integrity("temporal_order is missing"))?;
        let winner_id = record.winner_id.ok_or_else(|| integrity("winner_id is missing"))?;

        if record.player_a_id == record.player_b_id {
            return Err(integrity("both sides reference the same player"));
        }

        let winner = if winner_id == record.player_a_id {
            Side::A
        } else if winner_id == record.player_b_id {
            Side::B
        } else {
            return Err(integrity(&format!("winner {} is not a participant", winner_id)));
        };

        Ok(EligibleMatch {
            id: record.id,
            player_a_id: record.player_a_id,
            player_b_id: record.player_b_id,
            winner,
            outcome,
            position: Position::new(temporal_order, record.id),
            tier: TierCode::resolve(record.tier.as_deref(), record.tour.as_deref()),
            score: record.score.clone(),
            match_date: record.match_date.or_else(|| date_from_temporal_order(temporal_order)),
            previously_processed: record.is_processed()
        })
    }
}

/// Snapshot columns written for a processed match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_id: i32,
    pub rating_pre_player_a: Rating,
    pub rating_pre_player_b: Rating,
    pub rating_post_player_a: Rating,
    pub rating_post_player_b: Rating,
    pub params_version: String,
    pub processed_at: DateTime<Utc>
}

/// One processed match of a player, as seen from that player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedAppearance {
    pub match_id: i32,
    pub position: Position,
    pub opponent_id: i32
}

/// Extracts the calendar date encoded in the leading digits of a temporal order.
///
/// Orders are laid out as `YYYYMMDD` followed by seven digits of tie-break
/// (edition and round). Returns `None` for the far-future placeholder used for
/// undated matches and for anything that is not a valid date.
pub fn date_from_temporal_order(temporal_order: i64) -> Option<NaiveDate> {
    let date_part = temporal_order / 10_000_000;
    let year = date_part / 10_000;
    let month = (date_part % 10_000) / 100;
    let day = date_part % 100;

    if !(1..9999).contains(&year) {
        return None;
    }

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
}
