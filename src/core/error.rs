use thiserror::Error;

use super::types::SimulationType;

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("{0} simulation produced non-finite values; inputs are too extreme to project")]
    NonFiniteResult(SimulationType),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SimulationError {
    fn from(e: serde_json::Error) -> Self {
        SimulationError::Serialization(e.to_string())
    }
}

impl SimulationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
