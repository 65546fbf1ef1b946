use super::store::{RatingStore, StoreError};
use crate::model::{
    constants::DEFAULT_RATING,
    selector::{self, MatchFilter},
    structures::{
        match_outcome::UPCOMING_STATUSES,
        match_record::{date_from_temporal_order, MatchRecord, MatchResult, ProcessedAppearance},
        parameter_set::ParameterSet,
        player_state::{HistorySummary, PlayerRatingState},
        position::Position
    }
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard}
};

#[derive(Debug, Default)]
struct Tables {
    matches: BTreeMap<i32, MatchRecord>,
    states: BTreeMap<i32, PlayerRatingState>,
    parameter_sets: Vec<ParameterSet>,
    /// Match ids in the order their results were written
    write_log: Vec<i32>
}

/// A [`RatingStore`] kept entirely in process memory.
///
/// Behaves like the PostgreSQL store for every engine operation. Used by tests
/// and benchmarks, and by callers that want to replay a history without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// A store with `set` already inserted and active.
    pub fn with_parameter_set(set: ParameterSet) -> MemoryStore {
        let store = MemoryStore::new();
        if let Ok(mut tables) = store.tables.lock() {
            tables.parameter_sets.push(ParameterSet { is_active: true, ..set });
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Inserts or replaces a match row, as ingestion would.
    pub fn insert_match(&self, record: MatchRecord) -> Result<(), StoreError> {
        self.lock()?.matches.insert(record.id, record);
        Ok(())
    }

    pub fn match_record(&self, match_id: i32) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.lock()?.matches.get(&match_id).cloned())
    }

    /// All match rows ordered by id.
    pub fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.lock()?.matches.values().cloned().collect())
    }

    pub fn player_state(&self, player_id: i32) -> Result<Option<PlayerRatingState>, StoreError> {
        Ok(self.lock()?.states.get(&player_id).cloned())
    }

    /// All player states ordered by player id.
    pub fn player_states(&self) -> Result<Vec<PlayerRatingState>, StoreError> {
        Ok(self.lock()?.states.values().cloned().collect())
    }

    /// Ids of every match whose result was written, in write order.
    pub fn write_log(&self) -> Result<Vec<i32>, StoreError> {
        Ok(self.lock()?.write_log.clone())
    }

    pub fn clear_write_log(&self) -> Result<(), StoreError> {
        self.lock()?.write_log.clear();
        Ok(())
    }
}

fn has_snapshot(record: &MatchRecord) -> bool {
    record.rating_post_player_a.is_some() || record.rating_post_player_b.is_some()
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn active_parameter_sets(&self) -> Result<Vec<ParameterSet>, StoreError> {
        Ok(self
            .lock()?
            .parameter_sets
            .iter()
            .filter(|set| set.is_active)
            .cloned()
            .collect())
    }

    async fn insert_parameter_set(&self, set: &ParameterSet, activate: bool) -> Result<(), StoreError> {
        {
            let mut tables = self.lock()?;
            if tables.parameter_sets.iter().any(|existing| existing.name == set.name) {
                return Err(StoreError::InvalidRow(format!(
                    "parameter set '{}' already exists",
                    set.name
                )));
            }
            tables.parameter_sets.push(ParameterSet {
                is_active: false,
                ..set.clone()
            });
        }

        if activate {
            self.activate_parameter_set(&set.name).await?;
        }
        Ok(())
    }

    async fn activate_parameter_set(&self, name: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.parameter_sets.iter().any(|set| set.name == name) {
            return Err(StoreError::UnknownParameterSet(name.to_string()));
        }

        for set in tables.parameter_sets.iter_mut() {
            set.is_active = set.name == name;
        }
        Ok(())
    }

    async fn select_pending(&self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(selector::select(self.lock()?.matches.values(), filter))
    }

    async fn load_player_states(&self, player_ids: &[i32]) -> Result<HashMap<i32, PlayerRatingState>, StoreError> {
        let tables = self.lock()?;

        Ok(player_ids
            .iter()
            .filter_map(|id| tables.states.get(id).map(|state| (*id, state.clone())))
            .collect())
    }

    async fn processed_matches_from(
        &self,
        player_id: i32,
        from: Position
    ) -> Result<Vec<ProcessedAppearance>, StoreError> {
        let tables = self.lock()?;

        let mut appearances = tables
            .matches
            .values()
            .filter(|record| has_snapshot(record))
            .filter_map(|record| {
                let position = record.position().filter(|position| *position >= from)?;
                let opponent_id = record.opponent_of(player_id)?;
                Some(ProcessedAppearance {
                    match_id: record.id,
                    position,
                    opponent_id
                })
            })
            .collect::<Vec<_>>();
        appearances.sort_by_key(|appearance| appearance.position);

        Ok(appearances)
    }

    async fn flag_for_recompute(&self, match_ids: &[i32]) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let mut flagged = 0;

        for id in match_ids {
            if let Some(record) = tables.matches.get_mut(id) {
                if !record.rating_needs_recompute {
                    record.rating_needs_recompute = true;
                    flagged += 1;
                }
            }
        }
        Ok(flagged)
    }

    async fn history_before(&self, player_id: i32, before: Position) -> Result<Option<HistorySummary>, StoreError> {
        let tables = self.lock()?;

        let mut history = tables
            .matches
            .values()
            .filter(|record| record.is_processed() && !record.rating_needs_recompute)
            .filter_map(|record| {
                let position = record.position().filter(|position| *position < before)?;
                let rating = record.post_rating_of(player_id)?;
                Some((position, rating, record))
            })
            .collect::<Vec<_>>();
        history.sort_by_key(|(position, _, _)| *position);

        let Some((last_position, last_rating, _)) = history.last() else {
            return Ok(None);
        };

        // Undated matches keep the previous date, same as a forward replay
        let last_match_date = history.iter().rev().find_map(|(position, _, record)| {
            record
                .match_date
                .or_else(|| date_from_temporal_order(position.temporal_order))
        });

        Ok(Some(HistorySummary {
            last_rating: *last_rating,
            match_count: history.len() as i32,
            last_match_date,
            last_position: *last_position,
            peak_rating: history
                .iter()
                .map(|(_, rating, _)| *rating)
                .max()
                .unwrap_or(*last_rating)
        }))
    }

    async fn save_player_state(&self, state: &PlayerRatingState) -> Result<(), StoreError> {
        self.lock()?.states.insert(state.player_id, state.clone());
        Ok(())
    }

    async fn delete_player_state(&self, player_id: i32) -> Result<(), StoreError> {
        self.lock()?.states.remove(&player_id);
        Ok(())
    }

    async fn write_match_result(&self, result: &MatchResult) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .matches
            .get_mut(&result.match_id)
            .ok_or_else(|| StoreError::InvalidRow(format!("match {} does not exist", result.match_id)))?;

        record.rating_pre_player_a = Some(result.rating_pre_player_a);
        record.rating_pre_player_b = Some(result.rating_pre_player_b);
        record.rating_post_player_a = Some(result.rating_post_player_a);
        record.rating_post_player_b = Some(result.rating_post_player_b);
        record.rating_params_version = Some(result.params_version.clone());
        record.rating_processed_at = Some(result.processed_at);
        record.rating_needs_recompute = false;

        tables.write_log.push(result.match_id);
        Ok(())
    }

    async fn reset_ratings(&self) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        tables.states.clear();
        for record in tables.matches.values_mut() {
            record.clear_ratings();
        }
        Ok(())
    }

    async fn refresh_upcoming_snapshots(&self, player_ids: &[i32], params_version: &str) -> Result<u64, StoreError> {
        let mut tables = self.lock()?;
        let Tables { matches, states, .. } = &mut *tables;
        let rating_of = |id: i32| states.get(&id).map_or(DEFAULT_RATING, |state| state.rating);

        let mut refreshed = 0;
        for record in matches.values_mut() {
            let upcoming = UPCOMING_STATUSES.contains(&record.status.as_str()) && record.winner_id.is_none();
            let touched = player_ids.iter().any(|id| record.involves(*id));

            if upcoming && touched {
                record.rating_pre_player_a = Some(rating_of(record.player_a_id));
                record.rating_pre_player_b = Some(rating_of(record.player_b_id));
                record.rating_params_version = Some(params_version.to_string());
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }
}
