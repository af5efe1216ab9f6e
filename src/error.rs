//! Error types for the sandbox engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while configuring or mutating the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid engine configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Neuron index out of range
    #[error("Neuron index {index} out of range (network has {count} neurons)")]
    NeuronNotFound {
        /// Offending index
        index: usize,
        /// Number of neurons in the network
        count: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Topology construction error
    #[error("Topology error: {reason}")]
    Topology {
        /// Reason for topology error
        reason: String,
    },
}

impl EngineError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a neuron-not-found error
    pub fn neuron_not_found(index: usize, count: usize) -> Self {
        Self::NeuronNotFound { index, count }
    }

    /// Create a topology error
    pub fn topology(reason: impl Into<String>) -> Self {
        Self::Topology {
            reason: reason.into(),
        }
    }
}
