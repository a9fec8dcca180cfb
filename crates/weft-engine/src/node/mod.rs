//! Node abstractions.
//!
//! This module provides the capability contract every graph participant
//! implements:
//! - [`NodeId`]: Unique identifier for nodes
//! - [`NodeCommon`]: Storage shared by all nodes (parameters, state, values)
//! - [`ResolutionState`]: Unresolved/resolving/resolved lifecycle
//! - [`FlowNode`]: The node trait (hooks, validation, resumable process)
//! - [`ProcessStep`] / [`WorkUnit`]: The suspension contract
//! - [`assign_parameter_value`]: The value-assignment pipeline

mod common;
mod id;
mod state;
mod work;

pub use common::NodeCommon;
pub use id::NodeId;
pub use state::ResolutionState;
pub use work::{ProcessStep, WorkFn, WorkUnit};

use crate::error::{FlowError, FlowResult};
use crate::graph::ConnectionDirection;
use crate::param::Value;

/// Result of a node's pre-assignment hook: the value to store and any
/// other parameters the hook mutated.
#[derive(Debug)]
pub struct ValueUpdate {
    /// Value to store on the assigned parameter.
    pub value: Value,
    /// Names of other parameters the hook touched.
    pub touched: Vec<String>,
}

impl ValueUpdate {
    /// Passes the value through untouched.
    pub fn unchanged(value: Value) -> Self {
        Self {
            value,
            touched: Vec::new(),
        }
    }

    /// Replaces the value and reports additional touched parameters.
    pub fn with_touched(value: Value, touched: Vec<String>) -> Self {
        Self { value, touched }
    }
}

/// Capability contract for a graph participant.
///
/// Implementations describe their ports through [`NodeCommon`], validate
/// themselves before a run, and express execution as a resumable state
/// machine: [`begin_process`](FlowNode::begin_process) and
/// [`resume_process`](FlowNode::resume_process) return either
/// [`ProcessStep::Complete`] or [`ProcessStep::Suspend`] with a work unit
/// the resolver executes off the scheduling task.
pub trait FlowNode: Send {
    /// Returns the shared node storage.
    fn common(&self) -> &NodeCommon;

    /// Returns the shared node storage mutably.
    fn common_mut(&mut self) -> &mut NodeCommon;

    /// Checks the node is runnable; returns human-readable issues.
    /// An empty list means the node may execute.
    fn validate_before_run(&self) -> Vec<String> {
        Vec::new()
    }

    /// Hook run after converters and validators, before the value is
    /// stored. May transform the value further and report other
    /// parameters it mutated.
    fn before_value_set(&mut self, _parameter: &str, value: Value) -> FlowResult<ValueUpdate> {
        Ok(ValueUpdate::unchanged(value))
    }

    /// Hook run after the value is stored. Returns any additional
    /// parameters it mutated.
    fn after_value_set(&mut self, _parameter: &str) -> FlowResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// Starts the node's process. Inputs have been assigned; outputs
    /// should be stored through [`NodeCommon::set_output`].
    fn begin_process(&mut self) -> FlowResult<ProcessStep>;

    /// Resumes the process with the result of the last work unit.
    fn resume_process(&mut self, _outcome: Value) -> FlowResult<ProcessStep> {
        Ok(ProcessStep::Complete)
    }

    /// Discards any suspended execution state.
    fn reset_process(&mut self) {}

    /// Returns whether this node is a preferred run entry point.
    fn is_start_node(&self) -> bool {
        false
    }

    /// Overrides the traversal direction used when following connections
    /// from the given parameter. Paired loop constructs use this to walk a
    /// fixed direction regardless of parameter kind.
    fn traversal_override(&self, _parameter: &str) -> Option<ConnectionDirection> {
        None
    }
}

/// Runs the value-assignment pipeline for one parameter on a node.
///
/// Raw value → converters in order → validators in order → node pre-hook
/// (may transform and touch other parameters) → store → node post-hook.
/// The first converter or validator failure aborts the assignment and the
/// parameter keeps its previous value. Returns every parameter name the
/// assignment touched, starting with the assigned one, so callers can
/// cascade invalidation.
pub fn assign_parameter_value(
    node: &mut dyn FlowNode,
    parameter: &str,
    raw: Value,
) -> FlowResult<Vec<String>> {
    let node_name = node.common().name().to_owned();
    let (converters, validators) = {
        let param = node.common().parameter(parameter).ok_or_else(|| {
            FlowError::ParameterNotFound {
                node: node_name.clone(),
                parameter: parameter.to_owned(),
            }
        })?;
        (param.converter_chain(), param.validator_chain())
    };

    let mut value = raw;
    for converter in &converters {
        value = converter
            .convert(value)
            .map_err(|e| FlowError::ConversionFailed {
                node: node_name.clone(),
                parameter: parameter.to_owned(),
                message: e.to_string(),
            })?;
    }
    for validator in &validators {
        validator
            .validate(parameter, &value)
            .map_err(|e| FlowError::ValidationFailed {
                node: node_name.clone(),
                parameter: parameter.to_owned(),
                message: e.to_string(),
            })?;
    }

    let update = node.before_value_set(parameter, value)?;

    let mut touched = vec![parameter.to_owned()];
    for name in update.touched {
        if !touched.contains(&name) {
            touched.push(name);
        }
    }

    node.common_mut().store_value(parameter, update.value);

    for name in node.after_value_set(parameter)? {
        if !touched.contains(&name) {
            touched.push(name);
        }
    }

    Ok(touched)
}
