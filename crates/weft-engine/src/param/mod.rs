//! Typed parameter model.
//!
//! This module provides the port/parameter abstractions nodes are built
//! from:
//! - [`Value`]: Type-erased runtime value flowing between nodes
//! - [`ValueType`]: Closed enum of builtin kinds plus registered custom types
//! - [`TypeRegistry`]: Alias-normalizing parser for type names
//! - [`ParamMode`] / [`ParamModes`]: Input/output/property port modes
//! - [`Parameter`]: A named, typed port with converter/validator chains
//! - [`ParamCapability`]: Composable capability objects merged live into a
//!   parameter's chains
//! - [`ValueConverter`] / [`ValueValidator`]: Pipeline stages run on value
//!   assignment

mod capability;
mod mode;
mod parameter;
mod pipeline;
mod types;
mod value;

pub use capability::{ParamCapability, UiOption};
pub use mode::{ParamMode, ParamModes};
pub use parameter::{Parameter, ParameterBuilder, ParameterBuilderError};
pub use pipeline::{ValueConverter, ValueValidator};
pub use types::{TypeRegistry, ValueType, type_allows};
pub use value::Value;
