//! Pure numeric transform nodes.

use serde::{Deserialize, Serialize};
use weft_engine::FlowResult;
use weft_engine::node::{FlowNode, NodeCommon, ProcessStep};
use weft_engine::param::{ParamModes, Parameter, Value, ValueType};

/// Binary operation applied by [`Arithmetic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    /// `lhs + rhs`
    Add,
    /// `lhs * rhs`
    Mul,
}

/// Node combining its `lhs` and `rhs` inputs into `result`.
///
/// Unconnected inputs default to zero (`Add`) or one (`Mul`).
pub struct Arithmetic {
    common: NodeCommon,
    op: ArithmeticOp,
}

impl Arithmetic {
    /// Creates an adder node.
    pub fn add(name: impl Into<String>) -> Self {
        Self::new(name, ArithmeticOp::Add)
    }

    /// Creates a multiplier node.
    pub fn mul(name: impl Into<String>) -> Self {
        Self::new(name, ArithmeticOp::Mul)
    }

    fn new(name: impl Into<String>, op: ArithmeticOp) -> Self {
        let neutral = match op {
            ArithmeticOp::Add => 0,
            ArithmeticOp::Mul => 1,
        };
        let input = |port: &str| {
            Parameter::builder()
                .name(port)
                .value_type(ValueType::Int)
                .modes(ParamModes::INPUT_PROPERTY)
                .default_value(Value::Int(neutral))
                .build()
                .expect("static parameter shape")
        };
        Self {
            common: NodeCommon::new(
                name,
                vec![
                    input("lhs"),
                    input("rhs"),
                    Parameter::output("result", ValueType::Int),
                ],
            ),
            op,
        }
    }

    fn operand(&self, port: &str) -> i64 {
        self.common
            .value(port)
            .and_then(|v| v.as_int())
            .unwrap_or_default()
    }
}

impl FlowNode for Arithmetic {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        let lhs = self.operand("lhs");
        let rhs = self.operand("rhs");
        let result = match self.op {
            ArithmeticOp::Add => lhs + rhs,
            ArithmeticOp::Mul => lhs * rhs,
        };
        self.common.set_output("result", Value::Int(result));
        Ok(ProcessStep::Complete)
    }
}

/// Node scaling its `input` by a constant factor into `result`.
pub struct Scale {
    common: NodeCommon,
    factor: i64,
}

impl Scale {
    /// Creates a scaler with the given factor.
    pub fn new(name: impl Into<String>, factor: i64) -> Self {
        Self {
            common: NodeCommon::new(
                name,
                vec![
                    Parameter::input("input", ValueType::Int),
                    Parameter::output("result", ValueType::Int),
                ],
            ),
            factor,
        }
    }
}

impl FlowNode for Scale {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        let input = self
            .common
            .value("input")
            .and_then(|v| v.as_int())
            .unwrap_or_default();
        self.common
            .set_output("result", Value::Int(input * self.factor));
        Ok(ProcessStep::Complete)
    }
}
