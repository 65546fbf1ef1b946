use crate::model::{
    selector::MatchFilter,
    structures::{
        match_record::{MatchRecord, MatchResult, ProcessedAppearance},
        parameter_set::ParameterSet,
        player_state::{HistorySummary, PlayerRatingState},
        position::Position
    }
};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown rating parameter set '{0}'")]
    UnknownParameterSet(String),

    #[error("In-memory store lock was poisoned")]
    Poisoned,

    #[error("Invalid row: {0}")]
    InvalidRow(String)
}

/// Durable storage used by the update engine.
///
/// Every method is a single storage round trip. Implementations do no locking
/// of their own beyond what is needed for memory safety; one run at a time is
/// assumed to own the rating columns and player states.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Every parameter set currently marked active. More than one is a configuration error.
    async fn active_parameter_sets(&self) -> Result<Vec<ParameterSet>, StoreError>;

    /// Stores a new parameter set, optionally making it the only active one.
    async fn insert_parameter_set(&self, set: &ParameterSet, activate: bool) -> Result<(), StoreError>;

    /// Activates `name` and deactivates every other set.
    async fn activate_parameter_set(&self, name: &str) -> Result<(), StoreError>;

    /// Pending matches in processing order.
    async fn select_pending(&self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError>;

    /// Current states of the given players. Players without a state are absent.
    async fn load_player_states(&self, player_ids: &[i32]) -> Result<HashMap<i32, PlayerRatingState>, StoreError>;

    /// Matches of `player_id` at or after `from` that carry rating snapshots.
    async fn processed_matches_from(
        &self,
        player_id: i32,
        from: Position
    ) -> Result<Vec<ProcessedAppearance>, StoreError>;

    /// Sets `rating_needs_recompute` on the given matches. Returns how many rows changed.
    async fn flag_for_recompute(&self, match_ids: &[i32]) -> Result<u64, StoreError>;

    /// Summary of the player's valid processed history strictly before `before`.
    async fn history_before(&self, player_id: i32, before: Position) -> Result<Option<HistorySummary>, StoreError>;

    async fn save_player_state(&self, state: &PlayerRatingState) -> Result<(), StoreError>;

    async fn delete_player_state(&self, player_id: i32) -> Result<(), StoreError>;

    /// Writes both snapshots and the version stamp, and clears the recompute flag.
    async fn write_match_result(&self, result: &MatchResult) -> Result<(), StoreError>;

    /// Removes every player state and every match snapshot.
    async fn reset_ratings(&self) -> Result<(), StoreError>;

    /// Points the pre-match snapshot of upcoming matches involving `player_ids`
    /// at the players' current ratings. Returns the number of matches updated.
    async fn refresh_upcoming_snapshots(&self, player_ids: &[i32], params_version: &str) -> Result<u64, StoreError>;
}
