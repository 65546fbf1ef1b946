use super::structures::position::Position;
use crate::database::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("No active rating parameter set; activate exactly one before running")]
    NoActiveParameterSet,

    #[error("Multiple rating parameter sets are active: {0:?}")]
    MultipleActiveParameterSets(Vec<String>),

    #[error("Match {match_id} is eligible for rating but inconsistent: {reason}")]
    DataIntegrity { match_id: i32, reason: String },

    #[error("Player {player_id} cannot apply match at {position}; state already reflects {last_position}")]
    OutOfOrder {
        player_id: i32,
        position: Position,
        last_position: Position
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError)
}

impl ProcessorError {
    /// Configuration problems are detected before anything is written.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ProcessorError::NoActiveParameterSet | ProcessorError::MultipleActiveParameterSets(_)
        )
    }
}
