//! Engine lifecycle events.

use std::collections::HashMap;

use serde::Serialize;

use crate::TRACING_TARGET;
use crate::param::Value;

/// Ordered lifecycle notification emitted during resolution.
///
/// Events are fire-and-forget: the engine never awaits acknowledgment,
/// and a slow sink must not block the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The sequential resolver entered a node.
    NodeFocused {
        /// Node display name.
        node: String,
    },
    /// The sequential resolver is about to evaluate a parameter.
    ParameterSelected {
        /// Node display name.
        node: String,
        /// Parameter under evaluation.
        parameter: String,
    },
    /// A node's execution started.
    ExecutionStarted {
        /// Node display name.
        node: String,
    },
    /// A node's execution finished.
    ExecutionFinished {
        /// Node display name.
        node: String,
    },
    /// A parameter received a new value.
    ParameterUpdated {
        /// Node display name.
        node: String,
        /// Assigned parameter.
        parameter: String,
        /// Declared type of the parameter.
        value_type: String,
        /// Serialized assigned value.
        value: String,
    },
    /// A node reached the resolved state.
    NodeResolved {
        /// Node display name.
        node: String,
        /// Snapshot of the node's outputs.
        outputs: HashMap<String, Value>,
    },
}

/// Consumer of engine lifecycle events.
pub trait EventSink: Send + Sync {
    /// Receives one event. Implementations must be fast and non-blocking.
    fn emit(&self, event: EngineEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Sink that logs events through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::NodeFocused { node } => {
                tracing::debug!(target: TRACING_TARGET, %node, "Node focused");
            }
            EngineEvent::ParameterSelected { node, parameter } => {
                tracing::trace!(target: TRACING_TARGET, %node, %parameter, "Parameter selected");
            }
            EngineEvent::ExecutionStarted { node } => {
                tracing::debug!(target: TRACING_TARGET, %node, "Node execution started");
            }
            EngineEvent::ExecutionFinished { node } => {
                tracing::debug!(target: TRACING_TARGET, %node, "Node execution finished");
            }
            EngineEvent::ParameterUpdated {
                node,
                parameter,
                value_type,
                value,
            } => {
                tracing::trace!(
                    target: TRACING_TARGET,
                    %node,
                    %parameter,
                    %value_type,
                    %value,
                    "Parameter updated"
                );
            }
            EngineEvent::NodeResolved { node, outputs } => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    %node,
                    output_count = outputs.len(),
                    "Node resolved"
                );
            }
        }
    }
}
