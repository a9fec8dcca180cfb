//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use weft_engine::prelude::*;
//! ```

pub use crate::engine::{
    Engine, EngineConfig, EngineEvent, EventSink, NodeOutcome, NodeReport, NullSink,
    ResolveReport, RunFailure, RunStatus, SequentialResolver, StepPoint, TaskState, TracingSink,
};
pub use crate::error::{FlowError, FlowResult};
pub use crate::graph::{Connection, ConnectionDirection, ConnectionId, Flow};
pub use crate::node::{
    FlowNode, NodeCommon, NodeId, ProcessStep, ResolutionState, ValueUpdate, WorkUnit,
    assign_parameter_value,
};
pub use crate::param::{
    ParamCapability, ParamMode, ParamModes, Parameter, TypeRegistry, Value, ValueConverter,
    ValueType, ValueValidator,
};
pub use crate::service::{FlowService, ServiceConfig};
