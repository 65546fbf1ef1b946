use super::test_helpers::TestDatabase;
use crate::common::{init_test_env, run};
use rating_processor::{
    database::store::RatingStore,
    model::{
        error::ProcessorError,
        orchestrator::UpdateOrchestrator,
        structures::{rating::Rating, run_summary::RunMode}
    },
    utils::test_utils::{default_parameter_set, generate_match_record, temporal_order_for}
};
use serial_test::serial;

fn order(month: u32, day: u32, sequence: i64) -> i64 {
    temporal_order_for(chrono::NaiveDate::from_ymd_opt(2024, month, day).unwrap(), sequence)
}

#[tokio::test]
#[serial]
async fn test_dry_run_rolls_back_everything() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .insert_matches(&[
            generate_match_record(1, 1, 2, 1, order(1, 1, 1)),
            generate_match_record(2, 2, 3, 3, order(1, 2, 2))
        ])
        .await
        .unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");
    client.insert_parameter_set(&default_parameter_set(), true).await.unwrap();

    client.begin().await.unwrap();
    let summary = run(&client, RunMode::incremental()).await;
    assert_eq!(summary.matches_processed, 2);
    client.rollback().await.unwrap();

    assert_eq!(
        test_db.count("SELECT COUNT(*) FROM player_rating_states").await.unwrap(),
        0
    );
    assert_eq!(
        test_db
            .count("SELECT COUNT(*) FROM matches WHERE rating_post_player_a IS NOT NULL")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[serial]
async fn test_committed_run_is_visible_to_other_sessions() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let mut record = generate_match_record(1, 10, 20, 10, order(1, 15, 1));
    record.score = Some("6-2 6-2".to_string());
    test_db.insert_matches(&[record]).await.unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");
    client.insert_parameter_set(&default_parameter_set(), true).await.unwrap();

    client.begin().await.unwrap();
    run(&client, RunMode::incremental()).await;
    client.commit().await.unwrap();

    let raw = test_db.get_client().await.unwrap();
    let row = raw
        .query_one(
            "SELECT rating_post_player_a, rating_post_player_b, rating_params_version FROM matches WHERE id = 1",
            &[]
        )
        .await
        .unwrap();
    assert_eq!(Rating::from_points(row.get(0)), Rating::from_points(1581.0));
    assert_eq!(Rating::from_points(row.get(1)), Rating::from_points(1419.0));
    assert_eq!(row.get::<_, String>(2), "defaults-v1");
}

#[tokio::test]
#[serial]
async fn test_backfill_end_to_end_matches_rebuild() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .insert_matches(&[
            generate_match_record(10, 1, 2, 1, order(2, 10, 10)),
            generate_match_record(20, 1, 3, 3, order(2, 20, 20)),
            generate_match_record(30, 4, 1, 1, order(3, 1, 30))
        ])
        .await
        .unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");
    client.insert_parameter_set(&default_parameter_set(), true).await.unwrap();

    run(&client, RunMode::incremental()).await;
    test_db
        .insert_matches(&[generate_match_record(15, 5, 1, 5, order(2, 15, 15))])
        .await
        .unwrap();

    let summary = run(&client, RunMode::incremental()).await;
    assert!(summary.backfill_triggered);
    assert_eq!(summary.backfill_earliest_temporal_order, Some(order(2, 15, 15)));
    assert_eq!(summary.matches_processed, 3);
    assert_eq!(
        test_db
            .count("SELECT COUNT(*) FROM matches WHERE rating_needs_recompute")
            .await
            .unwrap(),
        0
    );

    let players = [1, 2, 3, 4, 5];
    let after_backfill = client.load_player_states(&players).await.unwrap();

    let rebuild = run(&client, RunMode::Rebuild).await;
    assert_eq!(rebuild.matches_processed, 4);
    let after_rebuild = client.load_player_states(&players).await.unwrap();

    assert_eq!(after_backfill, after_rebuild);
}

#[tokio::test]
#[serial]
async fn test_configuration_error_writes_nothing() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    test_db
        .insert_matches(&[generate_match_record(1, 1, 2, 1, order(1, 1, 1))])
        .await
        .unwrap();
    let client = test_db.db_client().await.expect("Failed to connect");

    let err = UpdateOrchestrator::new(&client).run(RunMode::Rebuild).await.unwrap_err();

    assert!(matches!(err, ProcessorError::NoActiveParameterSet));
    assert_eq!(
        test_db
            .count("SELECT COUNT(*) FROM matches WHERE rating_post_player_a IS NOT NULL")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[serial]
async fn test_advisory_lock_is_exclusive() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let first = test_db.db_client().await.expect("Failed to connect");
    let second = test_db.db_client().await.expect("Failed to connect");

    assert!(first.try_advisory_lock(7).await.unwrap());
    assert!(!second.try_advisory_lock(7).await.unwrap());

    assert!(first.advisory_unlock(7).await.unwrap());
    assert!(second.try_advisory_lock(7).await.unwrap());
}
