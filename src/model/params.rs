use super::{
    error::ProcessorError,
    structures::{
        parameter_set::{ParameterSet, RatingParameters, TierConstants},
        tier::TierCode
    }
};
use crate::database::store::RatingStore;
use itertools::Itertools;
use tracing::info;

/// The parameter bundle a run uses, resolved once and passed by value.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveParameters {
    /// Name of the bundle, stamped on every processed match
    pub version: String,
    pub params: RatingParameters
}

impl ActiveParameters {
    pub fn tier_constants(&self, tier: TierCode) -> TierConstants {
        self.params.tier_constants(tier)
    }
}

pub struct ParameterResolver;

impl ParameterResolver {
    /// Picks the single active bundle out of the rows marked active.
    ///
    /// Zero or several active rows is a configuration error and is never
    /// resolved by picking one.
    pub fn resolve(active: Vec<ParameterSet>) -> Result<ActiveParameters, ProcessorError> {
        let mut active = active;
        match active.len() {
            0 => Err(ProcessorError::NoActiveParameterSet),
            1 => {
                let set = active.remove(0);
                Ok(ActiveParameters {
                    version: set.name,
                    params: set.params
                })
            }
            _ => {
                let names = active.into_iter().map(|set| set.name).sorted().collect_vec();
                Err(ProcessorError::MultipleActiveParameterSets(names))
            }
        }
    }

    /// Reads and resolves the active bundle from `store`.
    pub async fn load<S: RatingStore + ?Sized>(store: &S) -> Result<ActiveParameters, ProcessorError> {
        let active = Self::resolve(store.active_parameter_sets().await?)?;
        info!("Using rating parameter set '{}'", active.version);

        Ok(active)
    }
}
