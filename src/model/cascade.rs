use super::{
    error::ProcessorError,
    structures::{player_state::PlayerRatingState, position::Position}
};
use crate::database::store::RatingStore;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// What an invalidation pass changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Earliest position any player was rewound to
    pub earliest: Position,
    /// Distinct processed matches now flagged for recompute
    pub flagged_matches: u64,
    /// Every player whose state was rewound
    pub players: BTreeSet<i32>
}

/// Invalidates history downstream of late matches.
///
/// Each `(player, from)` seed says the player's state must not reflect anything
/// at or after `from`. Every processed match of that player from there on is
/// flagged for recompute, and the opponent of each flagged match is queued with
/// that match's position, since their later history is stale too. The queue
/// drains to a fixpoint: a player is only revisited when their frontier moves
/// strictly earlier, so the pass is bounded by the number of matches.
///
/// Afterwards every affected player's state is rebuilt from their remaining
/// valid history, or removed if nothing valid is left.
pub struct InvalidationCascade<'a, S: RatingStore + ?Sized> {
    store: &'a S
}

impl<'a, S: RatingStore + ?Sized> InvalidationCascade<'a, S> {
    pub fn new(store: &'a S) -> Self {
        InvalidationCascade { store }
    }

    pub async fn run(&self, seeds: &[(i32, Position)]) -> Result<Option<CascadeOutcome>, ProcessorError> {
        let mut worklist = seeds.iter().copied().collect::<VecDeque<_>>();
        let mut frontier: BTreeMap<i32, Position> = BTreeMap::new();
        let mut flagged: BTreeSet<i32> = BTreeSet::new();

        while let Some((player_id, from)) = worklist.pop_front() {
            if frontier.get(&player_id).is_some_and(|current| *current <= from) {
                continue;
            }
            frontier.insert(player_id, from);

            let appearances = self.store.processed_matches_from(player_id, from).await?;
            debug!(
                "Player {} rewound to {}, {} processed matches downstream",
                player_id,
                from,
                appearances.len()
            );

            for appearance in appearances {
                flagged.insert(appearance.match_id);
                worklist.push_back((appearance.opponent_id, appearance.position));
            }
        }

        let Some(earliest) = frontier.values().min().copied() else {
            return Ok(None);
        };

        let match_ids = flagged.iter().copied().collect::<Vec<_>>();
        self.store.flag_for_recompute(&match_ids).await?;

        for (&player_id, &from) in &frontier {
            self.rewind(player_id, from).await?;
        }

        info!(
            "Invalidation cascade flagged {} matches across {} players (earliest {})",
            flagged.len(),
            frontier.len(),
            earliest
        );

        Ok(Some(CascadeOutcome {
            earliest,
            flagged_matches: flagged.len() as u64,
            players: frontier.into_keys().collect()
        }))
    }

    /// Resets a player's state to what it was just before `from`.
    async fn rewind(&self, player_id: i32, from: Position) -> Result<(), ProcessorError> {
        match self.store.history_before(player_id, from).await? {
            Some(history) => {
                self.store
                    .save_player_state(&PlayerRatingState::from_history(player_id, &history))
                    .await?
            }
            None => self.store.delete_player_state(player_id).await?
        }

        Ok(())
    }
}
