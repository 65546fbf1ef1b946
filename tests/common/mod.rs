use rating_processor::{
    database::{memory::MemoryStore, store::RatingStore},
    model::{
        orchestrator::UpdateOrchestrator,
        structures::{
            player_state::PlayerRatingState,
            run_summary::{RunMode, RunSummary}
        }
    }
};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment with RUST_LOG=WARN
pub fn init_test_env() {
    INIT.call_once(|| {
        std::env::set_var("RUST_LOG", "warn");
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub async fn run<S: RatingStore + ?Sized>(store: &S, mode: RunMode) -> RunSummary {
    UpdateOrchestrator::new(store)
        .run(mode)
        .await
        .expect("Rating run failed")
}

/// Ratings of every player, ordered by player id, for comparing stores.
pub fn ratings(store: &MemoryStore) -> Vec<PlayerRatingState> {
    store.player_states().expect("Failed to read player states")
}
