//! Control-flow chain nodes.

use weft_engine::node::{FlowNode, NodeCommon, ProcessStep};
use weft_engine::param::Parameter;
use weft_engine::FlowResult;

/// Explicit start node driving a control chain through its `exec` output.
pub struct Trigger {
    common: NodeCommon,
}

impl Trigger {
    /// Creates a trigger node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: NodeCommon::new(name, vec![Parameter::control_output("exec")]),
        }
    }
}

impl FlowNode for Trigger {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn is_start_node(&self) -> bool {
        true
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        Ok(ProcessStep::Complete)
    }
}

/// Chain member with a control input and a control output.
pub struct ControlRelay {
    common: NodeCommon,
}

impl ControlRelay {
    /// Creates a control relay node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: NodeCommon::new(
                name,
                vec![
                    Parameter::control_input("exec"),
                    Parameter::control_output("next"),
                ],
            ),
        }
    }
}

impl FlowNode for ControlRelay {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        Ok(ProcessStep::Complete)
    }
}
