//! Mock value source node.

use weft_engine::node::{FlowNode, NodeCommon, ProcessStep};
use weft_engine::param::{Parameter, Value};
use weft_engine::FlowResult;

/// Node that emits a configured value on its `output` port.
pub struct ValueSource {
    common: NodeCommon,
}

impl ValueSource {
    /// Creates a source emitting the given value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        let value_type = value.value_type();
        let mut common = NodeCommon::new(
            name,
            vec![
                Parameter::property("value", value_type.clone()),
                Parameter::output("output", value_type),
            ],
        );
        common.store_value("value", value);
        Self { common }
    }
}

impl FlowNode for ValueSource {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        let value = self.common.value("value").unwrap_or(Value::Null);
        self.common.set_output("output", value);
        Ok(ProcessStep::Complete)
    }
}
