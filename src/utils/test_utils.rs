//! Fixture builders shared by unit tests, integration tests and benches.

use crate::{
    database::{memory::MemoryStore, store::StoreError},
    model::structures::{
        match_record::{date_from_temporal_order, MatchRecord, Side},
        parameter_set::{ParameterSet, RatingParameters}
    }
};
use chrono::{Duration, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Name of the parameter bundle the fixtures run under.
pub const DEFAULT_PARAMS_VERSION: &str = "defaults-v1";

const LEVELS: [&str; 6] = ["Grand Slam", "Masters 1000", "ATP 500", "ATP 250", "Challenger", "ITF M25"];

/// A completed match with no score, tier or rating snapshots.
///
/// `match_date` is derived from `temporal_order` when it encodes a date.
pub fn generate_match_record(
    id: i32,
    player_a_id: i32,
    player_b_id: i32,
    winner_id: i32,
    temporal_order: i64
) -> MatchRecord {
    MatchRecord {
        id,
        player_a_id,
        player_b_id,
        winner_id: Some(winner_id),
        status: "completed".to_string(),
        temporal_order: Some(temporal_order),
        tier: None,
        tour: None,
        score: None,
        match_date: date_from_temporal_order(temporal_order),
        rating_pre_player_a: None,
        rating_pre_player_b: None,
        rating_post_player_a: None,
        rating_post_player_b: None,
        rating_params_version: None,
        rating_processed_at: None,
        rating_needs_recompute: false
    }
}

/// Temporal order for a match on `date`, with `sequence` as the tie-break digits.
pub fn temporal_order_for(date: NaiveDate, sequence: i64) -> i64 {
    let date_key = date.format("%Y%m%d").to_string().parse::<i64>().unwrap_or_default();
    date_key * 10_000_000 + sequence
}

/// The built-in parameters, active, under the default version name.
pub fn default_parameter_set() -> ParameterSet {
    ParameterSet {
        name: DEFAULT_PARAMS_VERSION.to_string(),
        params: RatingParameters::default(),
        source: "defaults".to_string(),
        is_active: true
    }
}

/// A reproducible random match history between `n_players` players.
///
/// Matches are spread a few days apart starting in 2020, so some players sit
/// idle long enough for decay and the returning boost to kick in. Most matches
/// are completed with a score; the rest are retirements, walkovers or defaults.
pub fn generate_history(seed: u64, n_players: i32, n_matches: i32) -> Vec<MatchRecord> {
    if n_players < 2 {
        panic!("A history needs at least two players");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut date = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap_or_default();
    let mut history = Vec::with_capacity(n_matches as usize);

    for i in 0..n_matches {
        date += Duration::days(rng.random_range(0..4));

        let player_a_id = rng.random_range(1..=n_players);
        let mut player_b_id = rng.random_range(1..n_players);
        if player_b_id >= player_a_id {
            player_b_id += 1;
        }

        let winner = if rng.random_bool(0.5) { Side::A } else { Side::B };
        let winner_id = match winner {
            Side::A => player_a_id,
            Side::B => player_b_id
        };

        let id = i + 1;
        let temporal_order = temporal_order_for(date, id as i64);
        let mut record = generate_match_record(id, player_a_id, player_b_id, winner_id, temporal_order);
        record.tier = Some(LEVELS[rng.random_range(0..LEVELS.len())].to_string());
        record.tour = Some(if rng.random_bool(0.3) { "WTA" } else { "ATP" }.to_string());

        let roll = rng.random_range(0..100);
        record.status = match roll {
            0..=2 => "retired",
            3..=4 => "walkover",
            5 => "default",
            _ => "completed"
        }
        .to_string();
        if record.status != "walkover" {
            record.score = Some(random_score(&mut rng, winner));
        }

        history.push(record);
    }

    history
}

/// A best-of-three score from player A's perspective.
pub fn random_score(rng: &mut ChaCha8Rng, winner: Side) -> String {
    let drop_a_set = rng.random_bool(0.35);
    let mut sets = Vec::new();

    for set in 0..(if drop_a_set { 3 } else { 2 }) {
        let winner_takes_set = !(drop_a_set && set == 1);
        let (w, l, tiebreak) = if rng.random_bool(0.15) {
            (7, 6, Some(rng.random_range(0..6)))
        } else if rng.random_bool(0.2) {
            (7, 5, None)
        } else {
            (6, rng.random_range(0..5), None)
        };

        let (won, lost) = if winner_takes_set { (w, l) } else { (l, w) };
        let (a, b) = match winner {
            Side::A => (won, lost),
            Side::B => (lost, won)
        };

        sets.push(match tiebreak {
            Some(points) => format!("{}-{}({})", a, b, points),
            None => format!("{}-{}", a, b)
        });
    }

    sets.join(" ")
}

/// A [`MemoryStore`] with the default parameters active and `history` loaded.
pub fn memory_store_with(history: Vec<MatchRecord>) -> Result<MemoryStore, StoreError> {
    let store = MemoryStore::with_parameter_set(default_parameter_set());
    for record in history {
        store.insert_match(record)?;
    }

    Ok(store)
}
