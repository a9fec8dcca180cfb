//! Failing node.

use serde::{Deserialize, Serialize};
use weft_engine::node::{FlowNode, NodeCommon, ProcessStep, WorkUnit};
use weft_engine::param::{Parameter, Value, ValueType};
use weft_engine::{FlowError, FlowResult};

/// Where a [`FailingNode`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePoint {
    /// `validate_before_run` reports an issue.
    Validation,
    /// `begin_process` returns an error.
    Begin,
    /// The suspended work unit returns an error.
    Work,
}

/// Node that fails at a configurable point with a fixed message.
pub struct FailingNode {
    common: NodeCommon,
    point: FailurePoint,
    message: String,
}

impl FailingNode {
    /// Creates a node failing at the given point.
    pub fn new(name: impl Into<String>, point: FailurePoint) -> Self {
        Self {
            common: NodeCommon::new(
                name,
                vec![
                    Parameter::input("input", ValueType::Int),
                    Parameter::output("result", ValueType::Int),
                ],
            ),
            point,
            message: "intentional failure".to_owned(),
        }
    }

    /// Overrides the failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl FlowNode for FailingNode {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn validate_before_run(&self) -> Vec<String> {
        match self.point {
            FailurePoint::Validation => vec![self.message.clone()],
            _ => Vec::new(),
        }
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        match self.point {
            FailurePoint::Begin => Err(FlowError::value(self.message.clone())),
            _ => {
                let message = self.message.clone();
                Ok(ProcessStep::Suspend(WorkUnit::new("failing:work", move |_cancel| {
                    Err(FlowError::value(message))
                })))
            }
        }
    }

    fn resume_process(&mut self, _outcome: Value) -> FlowResult<ProcessStep> {
        Ok(ProcessStep::Complete)
    }
}
