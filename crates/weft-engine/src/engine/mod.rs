//! Flow execution engine.
//!
//! This module provides the runtime for resolving flows:
//! - [`Engine`]: The main entry point
//! - [`EngineConfig`]: Configuration options
//! - [`SequentialResolver`] / [`StepPoint`]: Depth-first walker with step mode
//! - [`ParallelResolver`] / [`TaskState`]: Concurrent DAG scheduler
//! - [`EngineEvent`] / [`EventSink`]: Lifecycle notifications
//! - [`ResolveReport`]: Run summaries

mod config;
mod event;
mod executor;
mod parallel;
mod report;
mod sequential;

pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use event::{EngineEvent, EventSink, NullSink, TracingSink};
pub use executor::Engine;
pub use parallel::{ParallelResolver, TaskState};
pub use report::{NodeOutcome, NodeReport, ResolveReport, RunFailure, RunStatus};
pub use sequential::{SequentialResolver, StepPoint};

use tokio_util::sync::CancellationToken;

use crate::error::{FlowError, FlowResult};
use crate::node::{FlowNode, ProcessStep};

/// Drives a node's resumable process to completion.
///
/// Each suspend point hands a self-contained work unit to a blocking
/// worker thread; the node resumes with the unit's result. Cancellation is
/// checked between steps and delivered to the unit through the token; the
/// unit itself must observe it cooperatively.
pub(crate) async fn drive_process(
    node: &mut dyn FlowNode,
    cancel: &CancellationToken,
) -> FlowResult<()> {
    let mut step = node.begin_process()?;
    loop {
        match step {
            ProcessStep::Complete => return Ok(()),
            ProcessStep::Suspend(unit) => {
                if cancel.is_cancelled() {
                    return Err(FlowError::Cancelled);
                }
                let label = unit.label().to_owned();
                let token = cancel.clone();
                let outcome = tokio::task::spawn_blocking(move || unit.execute(token))
                    .await
                    .map_err(|e| {
                        FlowError::Internal(format!("work unit '{label}' aborted: {e}"))
                    })??;
                step = node.resume_process(outcome)?;
            }
        }
    }
}
