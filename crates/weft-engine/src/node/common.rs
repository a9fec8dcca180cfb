//! Shared node storage.

use std::collections::HashMap;

use crate::param::{ParamMode, Parameter, Value};

use super::id::NodeId;
use super::state::ResolutionState;

/// Storage every node carries: identity, ordered parameters, resolution
/// state, assigned values, and produced outputs.
#[derive(Debug)]
pub struct NodeCommon {
    id: NodeId,
    name: String,
    parameters: Vec<Parameter>,
    state: ResolutionState,
    locked: bool,
    values: HashMap<String, Value>,
    outputs: HashMap<String, Value>,
}

impl NodeCommon {
    /// Creates node storage with the given name and parameters.
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            parameters,
            state: ResolutionState::Unresolved,
            locked: false,
            values: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// Returns the node ID.
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordered parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns a mutable view of the ordered parameters.
    pub fn parameters_mut(&mut self) -> &mut Vec<Parameter> {
        &mut self.parameters
    }

    /// Returns the parameter with the given name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Returns a mutable reference to the parameter with the given name.
    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name() == name)
    }

    /// Replaces the parameter with the same name, returning whether a
    /// replacement happened. Used for in-place schema reloads; callers must
    /// rebind connections afterwards.
    pub fn replace_parameter(&mut self, parameter: Parameter) -> bool {
        match self.parameters.iter_mut().find(|p| p.name() == parameter.name()) {
            Some(slot) => {
                *slot = parameter;
                true
            }
            None => false,
        }
    }

    /// Returns the resolution state.
    pub const fn state(&self) -> ResolutionState {
        self.state
    }

    /// Sets the resolution state.
    pub fn set_state(&mut self, state: ResolutionState) {
        self.state = state;
    }

    /// Returns whether the node is locked. Locked nodes are treated as
    /// already resolved by the parallel resolver and never re-executed.
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks or unlocks the node.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Returns the currently-assigned value for a parameter, falling back
    /// to the parameter's declared default.
    pub fn value(&self, parameter: &str) -> Option<Value> {
        if let Some(value) = self.values.get(parameter) {
            return Some(value.clone());
        }
        self.parameter(parameter)
            .and_then(|p| p.default_value().cloned())
    }

    /// Stores an assigned value without running the pipeline. Engine
    /// internals and hooks use this; external callers go through
    /// [`assign_parameter_value`](super::assign_parameter_value).
    pub fn store_value(&mut self, parameter: impl Into<String>, value: Value) {
        self.values.insert(parameter.into(), value);
    }

    /// Returns the produced output for a parameter.
    pub fn output(&self, parameter: &str) -> Option<&Value> {
        self.outputs.get(parameter)
    }

    /// Returns all produced outputs.
    pub fn outputs(&self) -> &HashMap<String, Value> {
        &self.outputs
    }

    /// Stores a produced output value.
    pub fn set_output(&mut self, parameter: impl Into<String>, value: Value) {
        self.outputs.insert(parameter.into(), value);
    }

    /// Clears all produced outputs.
    pub fn clear_outputs(&mut self) {
        self.outputs.clear();
    }

    /// Returns the effective value visible on a parameter: produced output
    /// for output-capable ports, assigned value otherwise.
    pub fn effective_value(&self, parameter: &str) -> Option<Value> {
        if let Some(param) = self.parameter(parameter)
            && param.allows_mode(ParamMode::Output)
            && let Some(output) = self.outputs.get(parameter)
        {
            return Some(output.clone());
        }
        self.value(parameter)
    }
}
