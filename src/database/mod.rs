pub mod db;
pub mod memory;
pub mod store;

/// DDL for every table and index the processor reads or writes.
pub const SCHEMA: &str = include_str!("schema.sql");

/// Selection predicate for matches that need (re)processing.
///
/// `schema.sql` declares the partial index `idx_matches_rating_pending` with
/// this exact text; keep the two in sync.
pub const PENDING_PREDICATE: &str = concat!(
    "status IN ('completed', 'retired', 'walkover', 'default') ",
    "AND winner_id IS NOT NULL AND temporal_order IS NOT NULL ",
    "AND (rating_post_player_a IS NULL OR rating_post_player_b IS NULL OR rating_needs_recompute)"
);
