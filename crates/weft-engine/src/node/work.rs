//! Resumable process steps and off-scheduler work units.

use tokio_util::sync::CancellationToken;

use crate::error::FlowResult;
use crate::param::Value;

/// Boxed work closure executed off the scheduling task.
pub type WorkFn = Box<dyn FnOnce(CancellationToken) -> FlowResult<Value> + Send + 'static>;

/// A self-contained unit of slow or blocking work yielded by a node.
///
/// The closure must capture everything it needs and hold no references into
/// engine state; the resolver runs it on a worker thread and resumes the
/// node with its result. Cancellation is cooperative: the closure receives
/// a [`CancellationToken`] and is expected to observe it. The engine never
/// force-kills the underlying thread.
pub struct WorkUnit {
    label: String,
    run: WorkFn,
}

impl WorkUnit {
    /// Creates a work unit with a diagnostic label.
    pub fn new(
        label: impl Into<String>,
        run: impl FnOnce(CancellationToken) -> FlowResult<Value> + Send + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }

    /// Returns the diagnostic label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Consumes the unit and runs its closure.
    pub fn execute(self, cancel: CancellationToken) -> FlowResult<Value> {
        (self.run)(cancel)
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("label", &self.label)
            .finish()
    }
}

/// Next step of a node's resumable process.
#[derive(Debug)]
pub enum ProcessStep {
    /// The node needs `WorkUnit` executed off the scheduler; resume it
    /// with the unit's result.
    Suspend(WorkUnit),
    /// The node has finished and stored its outputs.
    Complete,
}

impl ProcessStep {
    /// Shorthand for suspending on a labeled closure.
    pub fn suspend(
        label: impl Into<String>,
        run: impl FnOnce(CancellationToken) -> FlowResult<Value> + Send + 'static,
    ) -> Self {
        Self::Suspend(WorkUnit::new(label, run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_unit_executes_closure() {
        let unit = WorkUnit::new("double", |_cancel| Ok(Value::Int(21 * 2)));
        assert_eq!(unit.label(), "double");
        let result = unit.execute(CancellationToken::new()).unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn test_work_unit_observes_cancellation() {
        let unit = WorkUnit::new("slow", |cancel: CancellationToken| {
            if cancel.is_cancelled() {
                return Err(crate::FlowError::Cancelled);
            }
            Ok(Value::Null)
        });
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            unit.execute(token),
            Err(crate::FlowError::Cancelled)
        ));
    }
}
