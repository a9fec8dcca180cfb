//! Suspending sleeper node.

use std::sync::Arc;
use std::time::Duration;

use weft_engine::{FlowError, FlowResult};
use weft_engine::node::{FlowNode, NodeCommon, ProcessStep, WorkUnit};
use weft_engine::param::{Parameter, Value, ValueType};

use crate::probe::RunProbe;

/// Node that suspends on a sleeping work unit, then passes its `input`
/// through to `result`.
///
/// The work unit sleeps in small increments and observes cancellation
/// between them, so cancelled runs settle quickly. An attached
/// [`RunProbe`] records the work interval for concurrency assertions.
pub struct SleeperNode {
    common: NodeCommon,
    duration: Duration,
    probe: Option<Arc<RunProbe>>,
    sleeping: bool,
}

impl SleeperNode {
    /// Creates a sleeper with the given work duration.
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            common: NodeCommon::new(
                name,
                vec![
                    Parameter::input("input", ValueType::Int),
                    Parameter::output("result", ValueType::Int),
                ],
            ),
            duration,
            probe: None,
            sleeping: false,
        }
    }

    /// Attaches a probe recording this node's work interval.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<RunProbe>) -> Self {
        self.probe = Some(probe);
        self
    }
}

impl FlowNode for SleeperNode {
    fn common(&self) -> &NodeCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut NodeCommon {
        &mut self.common
    }

    fn begin_process(&mut self) -> FlowResult<ProcessStep> {
        if self.sleeping {
            return Err(FlowError::value("sleeper already has a suspended execution"));
        }
        self.sleeping = true;
        let name = self.common.name().to_owned();
        let duration = self.duration;
        let probe = self.probe.clone();
        let input = self
            .common
            .value("input")
            .and_then(|v| v.as_int())
            .unwrap_or_default();

        Ok(ProcessStep::Suspend(WorkUnit::new(
            format!("{name}:sleep"),
            move |cancel| {
                if let Some(probe) = &probe {
                    probe.begin(&name);
                }
                let mut remaining = duration;
                let result = loop {
                    if cancel.is_cancelled() {
                        break Err(FlowError::Cancelled);
                    }
                    if remaining.is_zero() {
                        break Ok(Value::Int(input));
                    }
                    let slice = remaining.min(Duration::from_millis(5));
                    std::thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                };
                if let Some(probe) = &probe {
                    probe.end(&name);
                }
                result
            },
        )))
    }

    fn resume_process(&mut self, outcome: Value) -> FlowResult<ProcessStep> {
        self.sleeping = false;
        self.common.set_output("result", outcome);
        Ok(ProcessStep::Complete)
    }

    fn reset_process(&mut self) {
        self.sleeping = false;
    }
}
