use super::{
    store::{RatingStore, StoreError},
    PENDING_PREDICATE, SCHEMA
};
use crate::model::{
    constants::DEFAULT_RATING,
    selector::MatchFilter,
    structures::{
        match_outcome::UPCOMING_STATUSES,
        match_record::{date_from_temporal_order, MatchRecord, MatchResult, ProcessedAppearance},
        parameter_set::{ParameterSet, RatingParameters},
        player_state::{HistorySummary, PlayerRatingState},
        position::Position,
        rating::Rating
    }
};
use async_trait::async_trait;
use chrono::NaiveDate;
use postgres_types::ToSql;
use std::{collections::HashMap, sync::Arc};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

const MATCH_COLUMNS: &str = "id, player_a_id, player_b_id, winner_id, status, temporal_order, tier, tour, score, \
    match_date, rating_pre_player_a, rating_pre_player_b, rating_post_player_a, rating_post_player_b, \
    rating_params_version, rating_processed_at, rating_needs_recompute";

const STATE_COLUMNS: &str =
    "player_id, rating, match_count, last_match_date, last_temporal_order, last_match_id, career_peak";

/// PostgreSQL-backed [`RatingStore`].
///
/// Wraps a single connection. Statements issued between [`DbClient::begin`] and
/// [`DbClient::commit`] / [`DbClient::rollback`] share one transaction.
#[derive(Clone)]
pub struct DbClient {
    client: Arc<Client>
}

impl DbClient {
    // Connect to the database and return a DbClient instance
    pub async fn connect(connection_str: &str) -> Result<Self, StoreError> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        info!("Connected to database");
        Ok(DbClient {
            client: Arc::new(client)
        })
    }

    /// Creates the processor's tables and indexes if they do not exist yet.
    pub async fn install_schema(&self) -> Result<(), StoreError> {
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<(), StoreError> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    pub async fn commit(&self) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    /// Takes the session-level advisory lock `key` without waiting.
    /// Returns false if another session holds it.
    pub async fn try_advisory_lock(&self, key: i64) -> Result<bool, StoreError> {
        let row = self.client.query_one("SELECT pg_try_advisory_lock($1)", &[&key]).await?;
        Ok(row.try_get(0)?)
    }

    pub async fn advisory_unlock(&self, key: i64) -> Result<bool, StoreError> {
        let row = self.client.query_one("SELECT pg_advisory_unlock($1)", &[&key]).await?;
        Ok(row.try_get(0)?)
    }

    // Access the underlying Client
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, StoreError> {
        Ok(self.client.execute(sql, params).await?)
    }

    fn rating(row: &Row, column: &str) -> Result<Option<Rating>, StoreError> {
        Ok(row.try_get::<_, Option<f64>>(column)?.map(Rating::from_points))
    }

    fn match_from_row(row: &Row) -> Result<MatchRecord, StoreError> {
        Ok(MatchRecord {
            id: row.try_get("id")?,
            player_a_id: row.try_get("player_a_id")?,
            player_b_id: row.try_get("player_b_id")?,
            winner_id: row.try_get("winner_id")?,
            status: row.try_get("status")?,
            temporal_order: row.try_get("temporal_order")?,
            tier: row.try_get("tier")?,
            tour: row.try_get("tour")?,
            score: row.try_get("score")?,
            match_date: row.try_get("match_date")?,
            rating_pre_player_a: Self::rating(row, "rating_pre_player_a")?,
            rating_pre_player_b: Self::rating(row, "rating_pre_player_b")?,
            rating_post_player_a: Self::rating(row, "rating_post_player_a")?,
            rating_post_player_b: Self::rating(row, "rating_post_player_b")?,
            rating_params_version: row.try_get("rating_params_version")?,
            rating_processed_at: row.try_get("rating_processed_at")?,
            rating_needs_recompute: row.try_get("rating_needs_recompute")?
        })
    }

    fn state_from_row(row: &Row) -> Result<PlayerRatingState, StoreError> {
        let player_id: i32 = row.try_get("player_id")?;
        let last_order: Option<i64> = row.try_get("last_temporal_order")?;
        let last_match_id: Option<i32> = row.try_get("last_match_id")?;

        let last_position = match (last_order, last_match_id) {
            (Some(order), Some(id)) => Some(Position::new(order, id)),
            (None, None) => None,
            _ => {
                return Err(StoreError::InvalidRow(format!(
                    "player {} has a partial last position",
                    player_id
                )))
            }
        };

        Ok(PlayerRatingState {
            player_id,
            rating: Rating::from_points(row.try_get("rating")?),
            match_count: row.try_get("match_count")?,
            last_match_date: row.try_get("last_match_date")?,
            last_position,
            career_peak: Rating::from_points(row.try_get("career_peak")?)
        })
    }

    fn parameter_set_from_row(row: &Row) -> Result<ParameterSet, StoreError> {
        let params: serde_json::Value = row.try_get("params")?;

        Ok(ParameterSet {
            name: row.try_get("name")?,
            params: serde_json::from_value::<RatingParameters>(params)?,
            source: row.try_get("source")?,
            is_active: row.try_get("is_active")?
        })
    }
}

#[async_trait]
impl RatingStore for DbClient {
    async fn active_parameter_sets(&self) -> Result<Vec<ParameterSet>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT name, params, source, is_active FROM rating_parameter_sets WHERE is_active ORDER BY name",
                &[]
            )
            .await?;

        rows.iter().map(Self::parameter_set_from_row).collect()
    }

    async fn insert_parameter_set(&self, set: &ParameterSet, activate: bool) -> Result<(), StoreError> {
        let params = serde_json::to_value(&set.params)?;
        self
            .execute(
                "INSERT INTO rating_parameter_sets (name, params, source, is_active) VALUES ($1, $2, $3, FALSE)",
                &[&set.name, &params, &set.source]
            )
            .await?;

        if activate {
            self.activate_parameter_set(&set.name).await?;
        }
        Ok(())
    }

    async fn activate_parameter_set(&self, name: &str) -> Result<(), StoreError> {
        // Touches nothing when the name is unknown
        let updated = self
            .execute(
                "UPDATE rating_parameter_sets SET is_active = (name = $1) \
                 WHERE EXISTS (SELECT 1 FROM rating_parameter_sets WHERE name = $1)",
                &[&name]
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::UnknownParameterSet(name.to_string()));
        }

        info!("Activated rating parameter set '{}'", name);
        Ok(())
    }

    async fn select_pending(&self, filter: &MatchFilter) -> Result<Vec<MatchRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM matches WHERE {} \
             AND ($1::INTEGER[] IS NULL OR player_a_id = ANY($1) OR player_b_id = ANY($1)) \
             ORDER BY temporal_order, id",
            MATCH_COLUMNS, PENDING_PREDICATE
        );
        let players = filter.player_ids();
        let rows = self.client.query(sql.as_str(), &[&players]).await?;

        debug!("Selected {} pending matches", rows.len());
        rows.iter().map(Self::match_from_row).collect()
    }

    async fn load_player_states(&self, player_ids: &[i32]) -> Result<HashMap<i32, PlayerRatingState>, StoreError> {
        let sql = format!(
            "SELECT {} FROM player_rating_states WHERE player_id = ANY($1)",
            STATE_COLUMNS
        );
        let rows = self.client.query(sql.as_str(), &[&player_ids]).await?;

        rows.iter()
            .map(|row| Self::state_from_row(row).map(|state| (state.player_id, state)))
            .collect()
    }

    async fn processed_matches_from(
        &self,
        player_id: i32,
        from: Position
    ) -> Result<Vec<ProcessedAppearance>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT id, temporal_order, \
                    CASE WHEN player_a_id = $1 THEN player_b_id ELSE player_a_id END AS opponent_id \
                 FROM matches \
                 WHERE (player_a_id = $1 OR player_b_id = $1) \
                   AND (rating_post_player_a IS NOT NULL OR rating_post_player_b IS NOT NULL) \
                   AND temporal_order IS NOT NULL \
                   AND (temporal_order, id) >= ($2, $3) \
                 ORDER BY temporal_order, id",
                &[&player_id, &from.temporal_order, &from.match_id]
            )
            .await?;

        rows.iter()
            .map(|row| -> Result<ProcessedAppearance, StoreError> {
                let match_id: i32 = row.try_get("id")?;
                Ok(ProcessedAppearance {
                    match_id,
                    position: Position::new(row.try_get("temporal_order")?, match_id),
                    opponent_id: row.try_get("opponent_id")?
                })
            })
            .collect()
    }

    async fn flag_for_recompute(&self, match_ids: &[i32]) -> Result<u64, StoreError> {
        Ok(self
            .execute(
                "UPDATE matches SET rating_needs_recompute = TRUE WHERE id = ANY($1) AND NOT rating_needs_recompute",
                &[&match_ids]
            )
            .await?)
    }

    async fn history_before(&self, player_id: i32, before: Position) -> Result<Option<HistorySummary>, StoreError> {
        let row = self
            .client
            .query_opt(
                "WITH history AS ( \
                    SELECT id, temporal_order, match_date, \
                        CASE WHEN player_a_id = $1 THEN rating_post_player_a ELSE rating_post_player_b END AS post \
                    FROM matches \
                    WHERE (player_a_id = $1 OR player_b_id = $1) \
                      AND rating_post_player_a IS NOT NULL AND rating_post_player_b IS NOT NULL \
                      AND NOT rating_needs_recompute \
                      AND temporal_order IS NOT NULL \
                      AND (temporal_order, id) < ($2, $3) \
                 ), \
                 dated AS ( \
                    SELECT id, temporal_order, match_date FROM history \
                    WHERE match_date IS NOT NULL \
                    ORDER BY temporal_order DESC, id DESC \
                    LIMIT 1 \
                 ) \
                 SELECT h.id, h.temporal_order, h.post, \
                    (SELECT COUNT(*) FROM history) AS match_count, \
                    (SELECT MAX(post) FROM history) AS peak, \
                    (SELECT match_date FROM dated) AS last_dated, \
                    ARRAY( \
                        SELECT u.temporal_order FROM history u \
                        WHERE u.match_date IS NULL \
                          AND NOT EXISTS ( \
                            SELECT 1 FROM dated d WHERE (d.temporal_order, d.id) > (u.temporal_order, u.id) \
                          ) \
                        ORDER BY u.temporal_order DESC, u.id DESC \
                    ) AS undated_orders \
                 FROM history h \
                 ORDER BY h.temporal_order DESC, h.id DESC \
                 LIMIT 1",
                &[&player_id, &before.temporal_order, &before.match_id]
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let last_position = Position::new(row.try_get("temporal_order")?, row.try_get("id")?);
        let match_count: i64 = row.try_get("match_count")?;
        let last_rating = Rating::from_points(row.try_get("post")?);

        // Undated matches after the last dated one may still encode a date in their order
        let last_dated: Option<NaiveDate> = row.try_get("last_dated")?;
        let undated_orders: Vec<i64> = row.try_get("undated_orders")?;
        let last_match_date = undated_orders
            .into_iter()
            .find_map(date_from_temporal_order)
            .or(last_dated);

        Ok(Some(HistorySummary {
            last_rating,
            match_count: match_count as i32,
            last_match_date,
            last_position,
            peak_rating: Self::rating(&row, "peak")?.unwrap_or(last_rating)
        }))
    }

    async fn save_player_state(&self, state: &PlayerRatingState) -> Result<(), StoreError> {
        let last_order = state.last_position.map(|p| p.temporal_order);
        let last_match_id = state.last_position.map(|p| p.match_id);

        self
            .execute(
                "INSERT INTO player_rating_states \
                    (player_id, rating, match_count, last_match_date, last_temporal_order, last_match_id, career_peak, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
                 ON CONFLICT (player_id) DO UPDATE SET \
                    rating = EXCLUDED.rating, \
                    match_count = EXCLUDED.match_count, \
                    last_match_date = EXCLUDED.last_match_date, \
                    last_temporal_order = EXCLUDED.last_temporal_order, \
                    last_match_id = EXCLUDED.last_match_id, \
                    career_peak = EXCLUDED.career_peak, \
                    updated_at = now()",
                &[
                    &state.player_id,
                    &state.rating.points(),
                    &state.match_count,
                    &state.last_match_date,
                    &last_order,
                    &last_match_id,
                    &state.career_peak.points()
                ]
            )
            .await?;
        Ok(())
    }

    async fn delete_player_state(&self, player_id: i32) -> Result<(), StoreError> {
        self.execute("DELETE FROM player_rating_states WHERE player_id = $1", &[&player_id]).await?;
        Ok(())
    }

    async fn write_match_result(&self, result: &MatchResult) -> Result<(), StoreError> {
        let updated = self
            .execute(
                "UPDATE matches SET \
                    rating_pre_player_a = $2, rating_pre_player_b = $3, \
                    rating_post_player_a = $4, rating_post_player_b = $5, \
                    rating_params_version = $6, rating_processed_at = $7, \
                    rating_needs_recompute = FALSE \
                 WHERE id = $1",
                &[
                    &result.match_id,
                    &result.rating_pre_player_a.points(),
                    &result.rating_pre_player_b.points(),
                    &result.rating_post_player_a.points(),
                    &result.rating_post_player_b.points(),
                    &result.params_version,
                    &result.processed_at
                ]
            )
            .await?;

        if updated == 0 {
            return Err(StoreError::InvalidRow(format!("match {} does not exist", result.match_id)));
        }
        Ok(())
    }

    async fn reset_ratings(&self) -> Result<(), StoreError> {
        self.client
            .batch_execute(
                "DELETE FROM player_rating_states; \
                 UPDATE matches SET \
                    rating_pre_player_a = NULL, rating_pre_player_b = NULL, \
                    rating_post_player_a = NULL, rating_post_player_b = NULL, \
                    rating_params_version = NULL, rating_processed_at = NULL, \
                    rating_needs_recompute = FALSE;"
            )
            .await?;

        info!("Cleared all player rating states and match snapshots");
        Ok(())
    }

    async fn refresh_upcoming_snapshots(&self, player_ids: &[i32], params_version: &str) -> Result<u64, StoreError> {
        let statuses = &UPCOMING_STATUSES[..];

        Ok(self
            .execute(
                "UPDATE matches AS m SET \
                    rating_pre_player_a = COALESCE((SELECT rating FROM player_rating_states WHERE player_id = m.player_a_id), $3), \
                    rating_pre_player_b = COALESCE((SELECT rating FROM player_rating_states WHERE player_id = m.player_b_id), $3), \
                    rating_params_version = $2 \
                 WHERE m.status = ANY($4) AND m.winner_id IS NULL \
                   AND (m.player_a_id = ANY($1) OR m.player_b_id = ANY($1))",
                &[&player_ids, &params_version, &DEFAULT_RATING.points(), &statuses]
            )
            .await?)
    }
}
