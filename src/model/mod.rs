/// The flow of the processor:
/// resolve parameters, select pending matches, rate them one at a time in
/// temporal order, and cascade invalidations when history arrives late.
pub mod boost;
pub mod cascade;
pub mod constants;
pub mod decay;
pub mod error;
pub mod formula;
pub mod margin;
pub mod orchestrator;
pub mod params;
pub mod selector;
pub mod structures;
