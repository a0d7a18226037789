//! Iteration history loaded from the optimizer's artifact tree.

pub mod artifacts;
pub mod detail;
pub mod store;

pub use artifacts::{DecodedObjective, JsonObjectiveDecoder, ObjectiveDecoder};
pub use detail::{objective_detail, ObjectiveDetail};
pub use store::{IterationStore, ObjectiveHistory, ObjectiveRecord, ParameterHistory};
