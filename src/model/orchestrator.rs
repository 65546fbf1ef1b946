use super::{
    boost::boost,
    cascade::InvalidationCascade,
    decay::decay,
    error::ProcessorError,
    formula,
    margin::margin,
    params::{ActiveParameters, ParameterResolver},
    selector::MatchFilter,
    structures::{
        match_record::{EligibleMatch, MatchResult},
        player_state::{PlayerRatingState, ProcessedMatch},
        run_summary::{RunMode, RunSummary}
    }
};
use crate::{database::store::RatingStore, utils::progress_utils::progress_bar};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc
    }
};
use tracing::{debug, info, warn};

/// Runs the rating engine against a [`RatingStore`].
///
/// The orchestrator never opens, commits or rolls back transactions and takes
/// no locks. Callers own both: a dry run is simply a run whose enclosing
/// transaction is rolled back.
pub struct UpdateOrchestrator<'a, S: RatingStore + ?Sized> {
    store: &'a S,
    cancel: Arc<AtomicBool>,
    show_progress: bool
}

impl<'a, S: RatingStore + ?Sized> UpdateOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        UpdateOrchestrator {
            store,
            cancel: Arc::new(AtomicBool::new(false)),
            show_progress: false
        }
    }

    /// Shares `flag` as the cancellation signal. Setting it stops the run at
    /// the next match boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Executes one update run.
    ///
    /// # States
    /// `INIT -> SELECT -> (PROCESS -> DETECT -> [CASCADE])* -> FINALIZE`
    ///
    /// - INIT resolves the active parameters (nothing is written if that fails)
    ///     and, for a rebuild, clears every derived rating.
    /// - SELECT reads pending matches in processing order.
    /// - DETECT checks whether either participant already reflects a match at or
    ///     after this one. If so, CASCADE invalidates the affected history and the
    ///     run goes back to SELECT, widened to every rewound player.
    /// - FINALIZE refreshes upcoming-match snapshots for every touched player.
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary, ProcessorError> {
        let params = ParameterResolver::load(self.store).await?;
        let processed_at = Utc::now();
        let mut summary = RunSummary::new(&mode, &params.version, processed_at);

        info!(
            "Starting {} run {} ({} scope)",
            summary.mode, summary.run_id, summary.scope
        );

        let mut filter = match &mode {
            RunMode::Rebuild => {
                self.store.reset_ratings().await?;
                MatchFilter::All
            }
            RunMode::Incremental { players: Some(players) } => MatchFilter::Players(players.clone()),
            RunMode::Incremental { players: None } => MatchFilter::All
        };
        let mut touched: BTreeSet<i32> = BTreeSet::new();

        'select: loop {
            let pending = self.store.select_pending(&filter).await?;
            if pending.is_empty() {
                break;
            }

            let bar = if self.show_progress {
                progress_bar(pending.len() as u64, "Processing matches".to_string())
            } else {
                None
            };

            for record in &pending {
                if self.cancel.load(Ordering::SeqCst) {
                    warn!("Run cancelled after {} matches", summary.matches_processed);
                    summary.cancelled = true;
                    break 'select;
                }

                let eligible = EligibleMatch::try_from(record)?;
                // Both participants in one read, before anything is written
                let states = self.store.load_player_states(&eligible.player_ids()).await?;

                let late = eligible
                    .player_ids()
                    .into_iter()
                    .filter(|id| states.get(id).is_some_and(|state| state.already_reflects(eligible.position)))
                    .map(|id| (id, eligible.position))
                    .collect_vec();

                if !late.is_empty() {
                    warn!(
                        "Match {} at {} is behind already processed history for players {:?}; backfilling",
                        eligible.id,
                        eligible.position,
                        late.iter().map(|(id, _)| *id).collect_vec()
                    );

                    if let Some(outcome) = InvalidationCascade::new(self.store).run(&late).await? {
                        summary.record_cascade(outcome.earliest, outcome.flagged_matches);
                        touched.extend(outcome.players.iter().copied());
                        filter.widen(outcome.players);
                    }

                    if let Some(bar) = &bar {
                        bar.finish_and_clear();
                    }
                    continue 'select;
                }

                self.process_match(&eligible, &states, &params, processed_at).await?;
                summary.record_processed(eligible.previously_processed);
                touched.extend(eligible.player_ids());

                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }

            if let Some(bar) = &bar {
                bar.finish();
            }
        }

        if !touched.is_empty() {
            let players = touched.into_iter().collect_vec();
            summary.upcoming_snapshots_refreshed =
                self.store.refresh_upcoming_snapshots(&players, &params.version).await?;
        }
        summary.finished_at = Some(Utc::now());

        info!(
            "Run {} finished: {} matches processed ({} fresh, {} refreshed), backfill {}",
            summary.run_id,
            summary.matches_processed,
            summary.fresh_snapshots,
            summary.cascade_refreshed_snapshots,
            if summary.backfill_triggered { "triggered" } else { "not triggered" }
        );

        Ok(summary)
    }

    /// Rates one match against the participants' current states and persists the result.
    async fn process_match(
        &self,
        m: &EligibleMatch,
        states: &HashMap<i32, PlayerRatingState>,
        active: &ActiveParameters,
        processed_at: DateTime<Utc>
    ) -> Result<(), ProcessorError> {
        let params = &active.params;
        let state_a = states
            .get(&m.player_a_id)
            .cloned()
            .unwrap_or_else(|| PlayerRatingState::seed(m.player_a_id));
        let state_b = states
            .get(&m.player_b_id)
            .cloned()
            .unwrap_or_else(|| PlayerRatingState::seed(m.player_b_id));

        let idle_a = state_a.days_idle(m.match_date);
        let idle_b = state_b.days_idle(m.match_date);

        // Decay happens here, at the moment the stored rating becomes a pre-match rating
        let pre_a = decay(&params.decay, state_a.rating, idle_a);
        let pre_b = decay(&params.decay, state_b.rating, idle_b);

        let tier = active.tier_constants(m.tier);
        let margin_result = margin(&params.margin, m.outcome, m.score.as_deref(), m.winner);
        let change = formula::apply(
            pre_a,
            pre_b,
            m.winner,
            tier.k,
            tier.s,
            margin_result.multiplier,
            boost(&params.boost, state_a.match_count, idle_a),
            boost(&params.boost, state_b.match_count, idle_b)
        );

        debug!(
            "Match {} ({}): {} vs {} -> {} vs {} (E_A={:.4}, K={:.2}, margin={})",
            m.id, m.tier, pre_a, pre_b, change.rating_a_after, change.rating_b_after, change.expected_a,
            change.effective_k, margin_result.multiplier
        );

        self.store
            .write_match_result(&MatchResult {
                match_id: m.id,
                rating_pre_player_a: pre_a,
                rating_pre_player_b: pre_b,
                rating_post_player_a: change.rating_a_after,
                rating_post_player_b: change.rating_b_after,
                params_version: active.version.clone(),
                processed_at
            })
            .await?;

        for (state, rating_after) in [(state_a, change.rating_a_after), (state_b, change.rating_b_after)] {
            let updated = state.apply(&ProcessedMatch {
                position: m.position,
                match_date: m.match_date,
                rating_after
            })?;
            self.store.save_player_state(&updated).await?;
        }

        Ok(())
    }
}
