//! Converter and validator stages for the value-assignment pipeline.

use crate::error::FlowResult;

use super::value::Value;

/// Transforms a value on its way into a parameter.
///
/// Converters run in order before validators; the first failure aborts the
/// assignment and the parameter keeps its previous value.
pub trait ValueConverter: Send + Sync {
    /// Converts the incoming value, or rejects the assignment.
    fn convert(&self, value: Value) -> FlowResult<Value>;
}

impl<F> ValueConverter for F
where
    F: Fn(Value) -> FlowResult<Value> + Send + Sync,
{
    fn convert(&self, value: Value) -> FlowResult<Value> {
        self(value)
    }
}

/// Checks a converted value before it is stored on a parameter.
///
/// Validators run after all converters; the first failure aborts the
/// assignment and the parameter keeps its previous value.
pub trait ValueValidator: Send + Sync {
    /// Accepts or rejects the converted value for the named parameter.
    fn validate(&self, parameter: &str, value: &Value) -> FlowResult<()>;
}

impl<F> ValueValidator for F
where
    F: Fn(&str, &Value) -> FlowResult<()> + Send + Sync,
{
    fn validate(&self, parameter: &str, value: &Value) -> FlowResult<()> {
        self(parameter, value)
    }
}
