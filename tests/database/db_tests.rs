use super::test_helpers::TestDatabase;
use crate::common::init_test_env;
use chrono::{NaiveDate, Utc};
use rating_processor::{
    database::{store::RatingStore, store::StoreError},
    model::{
        constants::DEFAULT_RATING,
        selector::{self, MatchFilter},
        structures::{
            match_record::{MatchRecord, MatchResult},
            parameter_set::{ParameterSet, RatingParameters},
            player_state::PlayerRatingState,
            position::Position,
            rating::Rating
        }
    },
    utils::test_utils::{generate_match_record, temporal_order_for}
};
use serial_test::serial;

fn processed(mut record: MatchRecord) -> MatchRecord {
    record.rating_pre_player_a = Some(DEFAULT_RATING);
    record.rating_pre_player_b = Some(DEFAULT_RATING);
    record.rating_post_player_a = Some(Rating::from_points(1581.0));
    record.rating_post_player_b = Some(Rating::from_points(1419.0));
    record.rating_params_version = Some("v1".to_string());
    record.rating_processed_at = Some(Utc::now());
    record
}

/// One of each shape the pending predicate distinguishes.
fn selection_fixtures() -> Vec<MatchRecord> {
    let fresh = generate_match_record(1, 1, 2, 1, 10);
    let done = processed(generate_match_record(2, 1, 2, 2, 20));

    let mut flagged = processed(generate_match_record(3, 3, 1, 3, 30));
    flagged.rating_needs_recompute = true;

    let mut half = processed(generate_match_record(4, 4, 5, 4, 40));
    half.rating_post_player_b = None;

    let mut no_winner = generate_match_record(5, 1, 6, 1, 50);
    no_winner.winner_id = None;

    let mut unordered = generate_match_record(6, 2, 3, 2, 0);
    unordered.temporal_order = None;

    let mut upcoming = generate_match_record(7, 1, 4, 1, 70);
    upcoming.status = "upcoming".to_string();
    upcoming.winner_id = None;

    let mut cancelled = generate_match_record(8, 2, 5, 2, 80);
    cancelled.status = "cancelled".to_string();

    let mut walkover = generate_match_record(9, 6, 7, 7, 5);
    walkover.status = "walkover".to_string();

    let tie_low_id = generate_match_record(10, 8, 9, 8, 10);

    vec![fresh, done, flagged, half, no_winner, unordered, upcoming, cancelled, walkover, tie_low_id]
}

#[tokio::test]
#[serial]
async fn test_selection_agrees_with_in_process_predicate() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let fixtures = selection_fixtures();
    test_db.insert_matches(&fixtures).await.expect("Failed to insert matches");
    let client = test_db.db_client().await.expect("Failed to connect");

    for filter in [MatchFilter::All, MatchFilter::players([1]), MatchFilter::players([6, 8])] {
        let from_db = client
            .select_pending(&filter)
            .await
            .expect("Failed to select")
            .iter()
            .map(|m| m.id)
            .collect::<Vec<_>>();
        let in_process = selector::select(&fixtures, &filter)
            .iter()
            .map(|m| m.id)
            .collect::<Vec<_>>();

        assert_eq!(from_db, in_process, "filter {:?}", filter);
    }

    let all = client.select_pending(&MatchFilter::All).await.unwrap();
    assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![9, 1, 10, 3, 4]);
}

#[tokio::test]
#[serial]
async fn test_pending_partial_index_exists() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let client = test_db.get_client().await.expect("Failed to connect");

    let definition: String = client
        .query_one(
            "SELECT indexdef FROM pg_indexes WHERE indexname = 'idx_matches_rating_pending'",
            &[]
        )
        .await
        .expect("Pending index is missing")
        .get(0);

    assert!(definition.contains("WHERE"));
    assert!(definition.contains("rating_needs_recompute"));
    assert!(definition.contains("winner_id IS NOT NULL"));
}

#[tokio::test]
#[serial]
async fn test_only_one_parameter_set_can_be_active() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let client = test_db.db_client().await.expect("Failed to connect");

    let mut tuned = RatingParameters::default();
    tuned.decay.rate = 0.08;

    client
        .insert_parameter_set(&ParameterSet::new("v1", RatingParameters::default()), true)
        .await
        .unwrap();
    client
        .insert_parameter_set(&ParameterSet::new("v2", tuned.clone()), true)
        .await
        .unwrap();

    let active = client.active_parameter_sets().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "v2");
    assert_eq!(active[0].params, tuned);

    // Marking a second row active by hand violates the constraint
    let raw = test_db.get_client().await.unwrap();
    let result = raw
        .execute("UPDATE rating_parameter_sets SET is_active = TRUE WHERE name = 'v1'", &[])
        .await;
    assert!(result.is_err());

    let err = client.activate_parameter_set("v9").await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownParameterSet(_)));

    client.activate_parameter_set("v1").await.unwrap();
    let active = client.active_parameter_sets().await.unwrap();
    assert_eq!(active.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["v1"]);
}

#[tokio::test]
#[serial]
async fn test_player_state_round_trips() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let client = test_db.db_client().await.expect("Failed to connect");

    let state = PlayerRatingState {
        player_id: 42,
        rating: Rating::from_points(1581.37),
        match_count: 17,
        last_match_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 9),
        last_position: Some(Position::new(2024_03_09_0000017, 17)),
        career_peak: Rating::from_points(1602.01)
    };
    client.save_player_state(&state).await.unwrap();
    client.save_player_state(&state).await.unwrap();

    let loaded = client.load_player_states(&[42, 43]).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[&42], state);

    client.delete_player_state(42).await.unwrap();
    assert!(client.load_player_states(&[42]).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_history_and_flagging() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .insert_matches(&[
            processed(generate_match_record(1, 1, 2, 1, 10)),
            processed(generate_match_record(2, 3, 1, 3, 20)),
            processed(generate_match_record(3, 1, 4, 1, 30))
        ])
        .await
        .unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");

    let appearances = client.processed_matches_from(1, Position::new(20, 2)).await.unwrap();
    assert_eq!(
        appearances.iter().map(|a| (a.match_id, a.opponent_id)).collect::<Vec<_>>(),
        vec![(2, 3), (3, 4)]
    );

    assert_eq!(client.flag_for_recompute(&[2, 3]).await.unwrap(), 2);
    assert_eq!(client.flag_for_recompute(&[2]).await.unwrap(), 0);

    let history = client.history_before(1, Position::new(20, 2)).await.unwrap().unwrap();
    assert_eq!(history.match_count, 1);
    assert_eq!(history.last_rating, Rating::from_points(1581.0));
    assert_eq!(history.last_position, Position::new(10, 1));
    assert_eq!(client.history_before(1, Position::new(10, 1)).await.unwrap(), None);

    // Flagged matches do not count as valid history
    let history = client.history_before(1, Position::new(99, 99)).await.unwrap().unwrap();
    assert_eq!(history.match_count, 1);
}

#[tokio::test]
#[serial]
async fn test_history_keeps_last_known_date() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let mut dated = processed(generate_match_record(1, 1, 2, 1, 10));
    dated.match_date = NaiveDate::from_ymd_opt(2020, 1, 1);
    let encoded = temporal_order_for(NaiveDate::from_ymd_opt(2020, 3, 5).unwrap(), 3);
    let mut undated = processed(generate_match_record(3, 1, 4, 1, encoded));
    undated.match_date = None;
    test_db
        .insert_matches(&[
            dated,
            processed(generate_match_record(2, 3, 1, 3, 20)),
            undated
        ])
        .await
        .unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");

    let history = client.history_before(1, Position::new(30, 0)).await.unwrap().unwrap();
    assert_eq!(history.last_position, Position::new(20, 2));
    assert_eq!(history.last_match_date, NaiveDate::from_ymd_opt(2020, 1, 1));

    // An undated match whose order encodes a date is newer than the last dated one
    let history = client.history_before(1, Position::new(encoded + 1, 0)).await.unwrap().unwrap();
    assert_eq!(history.match_count, 3);
    assert_eq!(history.last_match_date, NaiveDate::from_ymd_opt(2020, 3, 5));
}

#[tokio::test]
#[serial]
async fn test_write_result_clears_flag() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let mut flagged = processed(generate_match_record(1, 1, 2, 1, 10));
    flagged.rating_needs_recompute = true;
    test_db.insert_matches(&[flagged]).await.unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");

    client
        .write_match_result(&MatchResult {
            match_id: 1,
            rating_pre_player_a: Rating::from_points(1512.34),
            rating_pre_player_b: Rating::from_points(1487.66),
            rating_post_player_a: Rating::from_points(1590.12),
            rating_post_player_b: Rating::from_points(1409.88),
            params_version: "v2".to_string(),
            processed_at: Utc::now()
        })
        .await
        .unwrap();

    assert!(client.select_pending(&MatchFilter::All).await.unwrap().is_empty());

    let missing = client
        .write_match_result(&MatchResult {
            match_id: 404,
            rating_pre_player_a: DEFAULT_RATING,
            rating_pre_player_b: DEFAULT_RATING,
            rating_post_player_a: DEFAULT_RATING,
            rating_post_player_b: DEFAULT_RATING,
            params_version: "v2".to_string(),
            processed_at: Utc::now()
        })
        .await;
    assert!(matches!(missing, Err(StoreError::InvalidRow(_))));
}
