//! Parameter port modes.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Role a parameter may play on its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamMode {
    /// Receives values from upstream connections.
    Input,
    /// Emits values to downstream connections.
    Output,
    /// Holds a locally-assigned value, not wired to other nodes.
    Property,
}

/// Set of modes a parameter allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParamModes {
    /// Allows incoming connections.
    pub input: bool,
    /// Allows outgoing connections.
    pub output: bool,
    /// Allows direct assignment as a property.
    pub property: bool,
}

impl ParamModes {
    /// Input-only mode set.
    pub const INPUT: Self = Self {
        input: true,
        output: false,
        property: false,
    };

    /// Output-only mode set.
    pub const OUTPUT: Self = Self {
        input: false,
        output: true,
        property: false,
    };

    /// Property-only mode set.
    pub const PROPERTY: Self = Self {
        input: false,
        output: false,
        property: true,
    };

    /// Input-or-property mode set, the common shape for configurable ports.
    pub const INPUT_PROPERTY: Self = Self {
        input: true,
        output: false,
        property: true,
    };

    /// Returns whether the given mode is allowed.
    pub const fn allows(&self, mode: ParamMode) -> bool {
        match mode {
            ParamMode::Input => self.input,
            ParamMode::Output => self.output,
            ParamMode::Property => self.property,
        }
    }

    /// Adds input to the allowed modes.
    #[must_use]
    pub const fn with_input(mut self) -> Self {
        self.input = true;
        self
    }

    /// Adds output to the allowed modes.
    #[must_use]
    pub const fn with_output(mut self) -> Self {
        self.output = true;
        self
    }

    /// Adds property to the allowed modes.
    #[must_use]
    pub const fn with_property(mut self) -> Self {
        self.property = true;
        self
    }

    /// Returns whether no mode is allowed.
    pub const fn is_empty(&self) -> bool {
        !self.input && !self.output && !self.property
    }
}
