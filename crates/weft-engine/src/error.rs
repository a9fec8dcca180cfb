//! Flow error types.

use thiserror::Error;

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur during flow operations.
///
/// Variants fall into four classes with distinct recovery rules:
/// structural errors ([`InvalidMutation`], [`NodeNotFound`],
/// [`ParameterNotFound`]) are raised at mutation time and leave the graph
/// unchanged; value-pipeline errors ([`ConversionFailed`],
/// [`ValidationFailed`]) leave the previous value in place; node-execution
/// errors ([`NodeFailed`], [`Cancelled`]) terminate a run; [`Internal`]
/// signals inconsistent engine state and always propagates to the caller.
///
/// [`InvalidMutation`]: FlowError::InvalidMutation
/// [`NodeNotFound`]: FlowError::NodeNotFound
/// [`ParameterNotFound`]: FlowError::ParameterNotFound
/// [`ConversionFailed`]: FlowError::ConversionFailed
/// [`ValidationFailed`]: FlowError::ValidationFailed
/// [`NodeFailed`]: FlowError::NodeFailed
/// [`Cancelled`]: FlowError::Cancelled
/// [`Internal`]: FlowError::Internal
#[derive(Debug, Error)]
pub enum FlowError {
    /// Graph mutation violates a structural invariant (mode direction,
    /// connection cardinality, duplicate node name, dangling endpoint).
    #[error("invalid graph mutation: {0}")]
    InvalidMutation(String),

    /// No node with the given identity exists in the flow.
    #[error("node not found: {node}")]
    NodeNotFound {
        /// Identity of the missing node.
        node: String,
    },

    /// A node exists but has no parameter with the given name.
    #[error("parameter not found: {node}.{parameter}")]
    ParameterNotFound {
        /// Name of the node.
        node: String,
        /// Name of the missing parameter.
        parameter: String,
    },

    /// A value converter rejected an assignment; the old value is retained.
    #[error("conversion failed for {node}.{parameter}: {message}")]
    ConversionFailed {
        /// Name of the node.
        node: String,
        /// Name of the parameter being assigned.
        parameter: String,
        /// Error message from the converter.
        message: String,
    },

    /// A value validator rejected an assignment; the old value is retained.
    #[error("validation failed for {node}.{parameter}: {message}")]
    ValidationFailed {
        /// Name of the node.
        node: String,
        /// Name of the parameter being assigned.
        parameter: String,
        /// Error message from the validator.
        message: String,
    },

    /// A node's pre-run validation or process execution failed.
    #[error("node {node} failed: {message}")]
    NodeFailed {
        /// Name of the failed node.
        node: String,
        /// Error message.
        message: String,
    },

    /// The run was cancelled before completion.
    #[error("flow run cancelled")]
    Cancelled,

    /// A run is already in progress on this flow.
    #[error("a run is already in progress")]
    RunInProgress,

    /// Value rejected by a node work unit or custom pipeline stage.
    #[error("{0}")]
    Value(String),

    /// Inconsistent engine state. Programming-error class; never caught
    /// internally.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FlowError {
    /// Creates a value-stage error from any displayable message.
    ///
    /// Convenience for converter, validator, and work-unit implementations.
    pub fn value(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    /// Returns whether this error terminates an in-progress run.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NodeFailed { .. } | Self::Cancelled | Self::Internal(_)
        )
    }
}
