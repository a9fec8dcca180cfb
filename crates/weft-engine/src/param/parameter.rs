//! Parameter: a named, typed port on a node.

use std::sync::Arc;

use derive_builder::Builder;

use super::capability::{ParamCapability, UiOption};
use super::mode::{ParamMode, ParamModes};
use super::pipeline::{ValueConverter, ValueValidator};
use super::types::{ValueType, type_allows};
use super::value::Value;

/// A typed port on a node.
///
/// A parameter declares the type of value it carries, which modes it allows
/// (input, output, property), the types it accepts from upstream, the type
/// it emits downstream, and a chain of converters and validators run on
/// every assignment. Attached [`ParamCapability`] objects contribute to the
/// chains and display metadata live, ahead of the parameter's own entries.
#[derive(Clone, Builder)]
#[builder(pattern = "owned", setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct Parameter {
    /// Port name, unique on its node.
    name: String,

    /// Declared value type of this port.
    #[builder(default = "ValueType::Any")]
    value_type: ValueType,

    /// Accepted upstream types. Empty means "the declared type only".
    #[builder(default)]
    input_types: Vec<ValueType>,

    /// Emitted downstream type. Unset means "the declared type".
    #[builder(default)]
    output_type: Option<ValueType>,

    /// Allowed modes for this port.
    #[builder(default)]
    modes: ParamModes,

    /// Value used when nothing has been assigned.
    #[builder(default)]
    default_value: Option<Value>,

    /// Human-readable description for editors.
    #[builder(default)]
    tooltip: Option<String>,

    /// Parameter-local converters, run after capability converters.
    #[builder(default)]
    converters: Vec<Arc<dyn ValueConverter>>,

    /// Parameter-local validators, run after capability validators.
    #[builder(default)]
    validators: Vec<Arc<dyn ValueValidator>>,

    /// Attached capability objects, merged live on every chain read.
    #[builder(default)]
    capabilities: Vec<Arc<dyn ParamCapability>>,

    /// Parameter-local display metadata.
    #[builder(default)]
    ui_options: Vec<UiOption>,
}

impl ParameterBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name
            && name.is_empty()
        {
            return Err("parameter name must not be empty".into());
        }
        let is_control = matches!(&self.value_type, Some(ValueType::Control));
        if is_control {
            let data_inputs = self
                .input_types
                .iter()
                .flatten()
                .any(|t| !t.is_control());
            let data_output = matches!(&self.output_type, Some(Some(t)) if !t.is_control());
            if data_inputs || data_output {
                return Err("control parameters cannot declare data types".into());
            }
        }
        Ok(())
    }
}

impl Parameter {
    /// Returns a builder for a parameter.
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    fn with_modes(name: impl Into<String>, value_type: ValueType, modes: ParamModes) -> Self {
        Self {
            name: name.into(),
            value_type,
            input_types: Vec::new(),
            output_type: None,
            modes,
            default_value: None,
            tooltip: None,
            converters: Vec::new(),
            validators: Vec::new(),
            capabilities: Vec::new(),
            ui_options: Vec::new(),
        }
    }

    /// Creates an input parameter that can also be set as a property.
    pub fn input(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_modes(name, value_type, ParamModes::INPUT_PROPERTY)
    }

    /// Creates an output parameter.
    pub fn output(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_modes(name, value_type, ParamModes::OUTPUT)
    }

    /// Creates a property parameter.
    pub fn property(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_modes(name, value_type, ParamModes::PROPERTY)
    }

    /// Creates a control input port.
    pub fn control_input(name: impl Into<String>) -> Self {
        Self::with_modes(name, ValueType::Control, ParamModes::INPUT)
    }

    /// Creates a control output port.
    pub fn control_output(name: impl Into<String>) -> Self {
        Self::with_modes(name, ValueType::Control, ParamModes::OUTPUT)
    }

    /// Returns the port name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared value type.
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Returns the allowed modes.
    pub const fn modes(&self) -> ParamModes {
        self.modes
    }

    /// Returns whether this is a control-flow port.
    pub const fn is_control(&self) -> bool {
        self.value_type.is_control()
    }

    /// Returns whether the given mode is allowed on this port.
    pub const fn allows_mode(&self, mode: ParamMode) -> bool {
        self.modes.allows(mode)
    }

    /// Returns the accepted upstream types; falls back to the declared
    /// type when none were listed.
    pub fn input_types(&self) -> &[ValueType] {
        if self.input_types.is_empty() {
            std::slice::from_ref(&self.value_type)
        } else {
            &self.input_types
        }
    }

    /// Returns the emitted downstream type; falls back to the declared
    /// type when unset.
    pub fn output_type(&self) -> &ValueType {
        self.output_type.as_ref().unwrap_or(&self.value_type)
    }

    /// Returns the default value, if one was declared.
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Returns the tooltip, if set.
    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// Returns whether a value of `candidate` type may flow into this port.
    pub fn accepts_incoming(&self, candidate: &ValueType) -> bool {
        self.input_types()
            .iter()
            .any(|declared| type_allows(candidate, declared))
    }

    /// Returns whether this port's output may flow into a port declaring
    /// `target` type.
    pub fn allows_outgoing(&self, target: &ValueType) -> bool {
        type_allows(self.output_type(), target)
    }

    /// Attaches a capability object.
    pub fn attach_capability(&mut self, capability: Arc<dyn ParamCapability>) {
        self.capabilities.push(capability);
    }

    /// Returns the attached capabilities.
    pub fn capabilities(&self) -> &[Arc<dyn ParamCapability>] {
        &self.capabilities
    }

    /// Appends a parameter-local converter.
    pub fn add_converter(&mut self, converter: Arc<dyn ValueConverter>) {
        self.converters.push(converter);
    }

    /// Appends a parameter-local validator.
    pub fn add_validator(&mut self, validator: Arc<dyn ValueValidator>) {
        self.validators.push(validator);
    }

    /// Returns the full converter chain: capability converters first, then
    /// parameter-local ones. Rebuilt on every call so capability mutation
    /// is visible immediately.
    pub fn converter_chain(&self) -> Vec<Arc<dyn ValueConverter>> {
        let mut chain: Vec<Arc<dyn ValueConverter>> = Vec::new();
        for capability in &self.capabilities {
            chain.extend(capability.converters());
        }
        chain.extend(self.converters.iter().cloned());
        chain
    }

    /// Returns the full validator chain: capability validators first, then
    /// parameter-local ones.
    pub fn validator_chain(&self) -> Vec<Arc<dyn ValueValidator>> {
        let mut chain: Vec<Arc<dyn ValueValidator>> = Vec::new();
        for capability in &self.capabilities {
            chain.extend(capability.validators());
        }
        chain.extend(self.validators.iter().cloned());
        chain
    }

    /// Returns merged display metadata: capability options first, then
    /// parameter-local ones.
    pub fn merged_ui_options(&self) -> Vec<UiOption> {
        let mut options: Vec<UiOption> = Vec::new();
        for capability in &self.capabilities {
            options.extend(capability.ui_options());
        }
        options.extend(self.ui_options.iter().cloned());
        options
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("modes", &self.modes)
            .field("input_types", &self.input_types)
            .field("output_type", &self.output_type)
            .field("converters", &self.converters.len())
            .field("validators", &self.validators.len())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;

    struct ClampCapability;

    impl ParamCapability for ClampCapability {
        fn name(&self) -> &str {
            "clamp"
        }

        fn converters(&self) -> Vec<Arc<dyn ValueConverter>> {
            vec![Arc::new(|value: Value| match value {
                Value::Int(i) => Ok(Value::Int(i.clamp(0, 100))),
                other => Ok(other),
            })]
        }

        fn ui_options(&self) -> Vec<UiOption> {
            vec![UiOption::new("slider_range", serde_json::json!([0, 100]))]
        }
    }

    #[test]
    fn test_builder_defaults() {
        let param = Parameter::input("count", ValueType::Int);
        assert_eq!(param.name(), "count");
        assert_eq!(param.input_types(), &[ValueType::Int]);
        assert_eq!(param.output_type(), &ValueType::Int);
        assert!(param.allows_mode(ParamMode::Input));
        assert!(param.allows_mode(ParamMode::Property));
        assert!(!param.allows_mode(ParamMode::Output));
    }

    #[test]
    fn test_control_param_rejects_data_types() {
        let result = Parameter::builder()
            .name("exec")
            .value_type(ValueType::Control)
            .input_types(vec![ValueType::Int])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_accepts_incoming_multi_types() {
        let param = Parameter::builder()
            .name("media")
            .value_type(ValueType::Bytes)
            .input_types(vec![ValueType::Bytes, ValueType::Text])
            .modes(ParamModes::INPUT)
            .build()
            .unwrap();

        assert!(param.accepts_incoming(&ValueType::Text));
        assert!(param.accepts_incoming(&ValueType::Bytes));
        assert!(!param.accepts_incoming(&ValueType::Int));
        assert!(!param.accepts_incoming(&ValueType::None));
    }

    #[test]
    fn test_allows_outgoing_uses_output_type() {
        let param = Parameter::builder()
            .name("result")
            .value_type(ValueType::Custom("mesh".into()))
            .output_type(ValueType::Bytes)
            .modes(ParamModes::OUTPUT)
            .build()
            .unwrap();

        assert!(param.allows_outgoing(&ValueType::Bytes));
        assert!(param.allows_outgoing(&ValueType::Any));
        assert!(!param.allows_outgoing(&ValueType::Custom("mesh".into())));
        assert!(!param.allows_outgoing(&ValueType::None));
    }

    #[test]
    fn test_capability_chain_runs_first() {
        let mut param = Parameter::input("count", ValueType::Int);
        param.attach_capability(Arc::new(ClampCapability));
        param.add_converter(Arc::new(|value: Value| match value {
            Value::Int(i) => Ok(Value::Int(i + 1)),
            other => Ok(other),
        }));

        let chain = param.converter_chain();
        assert_eq!(chain.len(), 2);

        // Capability clamp applies before the local increment.
        let mut value = Value::Int(250);
        for converter in &chain {
            value = converter.convert(value).unwrap();
        }
        assert_eq!(value, Value::Int(101));
    }

    #[test]
    fn test_capability_ui_options_merge_first() {
        let mut param = Parameter::builder()
            .name("count")
            .value_type(ValueType::Int)
            .modes(ParamModes::INPUT)
            .ui_options(vec![UiOption::new("label", serde_json::json!("Count"))])
            .build()
            .unwrap();
        param.attach_capability(Arc::new(ClampCapability));

        let options = param.merged_ui_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].key, "slider_range");
        assert_eq!(options[1].key, "label");
    }

    #[test]
    fn test_validator_chain_rejects() {
        let mut param = Parameter::input("count", ValueType::Int);
        param.add_validator(Arc::new(|parameter: &str, value: &Value| {
            match value.as_int() {
                Some(i) if i < 0 => Err(FlowError::value(format!("{parameter} must be >= 0"))),
                _ => Ok(()),
            }
        }));

        let chain = param.validator_chain();
        assert!(chain[0].validate("count", &Value::Int(-5)).is_err());
        assert!(chain[0].validate("count", &Value::Int(5)).is_ok());
    }
}
