use super::structures::{match_outcome::MatchOutcome, match_record::MatchRecord, position::Position};
use std::{cmp::Ordering, collections::BTreeSet};

/// Which pending matches a run selects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchFilter {
    #[default]
    All,
    /// Only matches where at least one participant is in the set
    Players(BTreeSet<i32>)
}

impl MatchFilter {
    pub fn players<I: IntoIterator<Item = i32>>(players: I) -> MatchFilter {
        MatchFilter::Players(players.into_iter().collect())
    }

    pub fn admits(&self, record: &MatchRecord) -> bool {
        match self {
            MatchFilter::All => true,
            MatchFilter::Players(players) => {
                players.contains(&record.player_a_id) || players.contains(&record.player_b_id)
            }
        }
    }

    /// Adds players to a restricted filter. An unrestricted filter stays unrestricted.
    pub fn widen<I: IntoIterator<Item = i32>>(&mut self, players: I) {
        if let MatchFilter::Players(current) = self {
            current.extend(players);
        }
    }

    /// Player ids as a list for SQL `ANY($n)`, `None` when unrestricted.
    pub fn player_ids(&self) -> Option<Vec<i32>> {
        match self {
            MatchFilter::All => None,
            MatchFilter::Players(players) => Some(players.iter().copied().collect())
        }
    }
}

/// In-process form of the pending-match predicate.
///
/// A match is pending when it is terminal, has a winner and a temporal order,
/// and is either missing a post-match snapshot or flagged for recompute.
pub fn is_pending(record: &MatchRecord) -> bool {
    let terminal = MatchOutcome::TERMINAL_STATUSES.contains(&record.status.as_str());
    let missing_snapshot = record.rating_post_player_a.is_none() || record.rating_post_player_b.is_none();

    terminal
        && record.winner_id.is_some()
        && record.temporal_order.is_some()
        && (missing_snapshot || record.rating_needs_recompute)
}

/// Processing order: ascending temporal order, then match id.
pub fn processing_order(a: &MatchRecord, b: &MatchRecord) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

fn sort_key(record: &MatchRecord) -> Position {
    Position::new(record.temporal_order.unwrap_or(i64::MAX), record.id)
}

/// Applies the selection predicate, filter and ordering to a set of records.
pub fn select<'a, I>(records: I, filter: &MatchFilter) -> Vec<MatchRecord>
where
    I: IntoIterator<Item = &'a MatchRecord>
{
    let mut pending = records
        .into_iter()
        .filter(|record| is_pending(record) && filter.admits(record))
        .cloned()
        .collect::<Vec<_>>();
    pending.sort_by(processing_order);

    pending
}
