pub mod match_outcome;
pub mod match_record;
pub mod parameter_set;
pub mod player_state;
pub mod position;
pub mod rating;
pub mod run_summary;
pub mod tier;
