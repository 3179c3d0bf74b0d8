use thiserror::Error;

use super::config::ConfigError;
use super::pathway::PathwayError;
use crate::core::models::ids::{AtomId, ModelId};
use crate::core::symmetry::groups::GroupError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Atom not found in store: {0:?}")]
    AtomNotFound(AtomId),

    #[error("Model not found in store: {0:?}")]
    ModelNotFound(ModelId),

    #[error("Symmetry of model {model:?} could not be resolved: {source}")]
    Symmetry {
        model: ModelId,
        #[source]
        source: GroupError,
    },

    #[error("Rotation axis endpoints coincide")]
    DegenerateAxis,

    #[error("Pathway evaluation failed: {0}")]
    Pathway(#[from] PathwayError),

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}
