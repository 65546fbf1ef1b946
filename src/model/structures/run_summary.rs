use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Process pending and flagged matches, optionally only those touching `players`.
    Incremental { players: Option<BTreeSet<i32>> },
    /// Clear every derived rating and replay the whole history.
    Rebuild
}

impl RunMode {
    pub fn incremental() -> RunMode {
        RunMode::Incremental { players: None }
    }

    pub fn for_players<I: IntoIterator<Item = i32>>(players: I) -> RunMode {
        RunMode::Incremental {
            players: Some(players.into_iter().collect())
        }
    }

    pub fn kind(&self) -> RunKind {
        match self {
            RunMode::Incremental { .. } => RunKind::Incremental,
            RunMode::Rebuild => RunKind::Rebuild
        }
    }

    pub fn scope(&self) -> RunScope {
        match self {
            RunMode::Incremental { .. } => RunScope::Delta,
            RunMode::Rebuild => RunScope::FullHistory
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunKind {
    Incremental,
    Rebuild
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunScope {
    /// Only the matches that changed since the last run
    Delta,
    /// Every terminal match, from the beginning of time
    FullHistory
}

/// Operational report of one update run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: RunKind,
    pub scope: RunScope,
    pub parameter_version: String,
    pub player_filter: Option<Vec<i32>>,
    pub matches_processed: u64,
    pub fresh_snapshots: u64,
    pub cascade_refreshed_snapshots: u64,
    pub backfill_triggered: bool,
    pub backfill_earliest_temporal_order: Option<i64>,
    pub cascade_flagged_matches: u64,
    pub upcoming_snapshots_refreshed: u64,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>
}

impl RunSummary {
    pub fn new(mode: &RunMode, parameter_version: &str, started_at: DateTime<Utc>) -> RunSummary {
        let player_filter = match mode {
            RunMode::Incremental { players: Some(players) } => Some(players.iter().copied().collect()),
            _ => None
        };

        RunSummary {
            run_id: Uuid::new_v4(),
            mode: mode.kind(),
            scope: mode.scope(),
            parameter_version: parameter_version.to_string(),
            player_filter,
            matches_processed: 0,
            fresh_snapshots: 0,
            cascade_refreshed_snapshots: 0,
            backfill_triggered: false,
            backfill_earliest_temporal_order: None,
            cascade_flagged_matches: 0,
            upcoming_snapshots_refreshed: 0,
            cancelled: false,
            started_at,
            finished_at: None
        }
    }

    pub fn record_processed(&mut self, previously_processed: bool) {
        self.matches_processed += 1;
        if previously_processed {
            self.cascade_refreshed_snapshots += 1;
        } else {
            self.fresh_snapshots += 1;
        }
    }

    pub fn record_cascade(&mut self, earliest: Position, flagged: u64) {
        self.backfill_triggered = true;
        self.cascade_flagged_matches += flagged;
        self.backfill_earliest_temporal_order = Some(
            self.backfill_earliest_temporal_order
                .map_or(earliest.temporal_order, |current| current.min(earliest.temporal_order))
        );
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            RunScope::FullHistory => "FULL HISTORY REBUILD",
            RunScope::Delta => "INCREMENTAL (delta)"
        };

        writeln!(f, "Run {}  scope={}  params={}", self.run_id, scope, self.parameter_version)?;
        if let Some(players) = &self.player_filter {
            writeln!(f, "Player filter:          {:?}", players)?;
        }
        writeln!(
            f,
            "Processed:              {} ({} fresh, {} refreshed by cascade)",
            self.matches_processed, self.fresh_snapshots, self.cascade_refreshed_snapshots
        )?;
        writeln!(f, "Upcoming snapshots:     {}", self.upcoming_snapshots_refreshed)?;
        match self.backfill_earliest_temporal_order {
            Some(order) if self.backfill_triggered => writeln!(
                f,
                "Backfill triggered:     YES (earliest temporal_order={}, {} matches flagged)",
                order, self.cascade_flagged_matches
            )?,
            _ => writeln!(f, "Backfill triggered:     no")?
        }
        if self.cancelled {
            writeln!(f, "Cancelled at a match boundary")?;
        }

        Ok(())
    }
}
