//! Run reports.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::param::Value;

/// Terminal status of a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Every participating node resolved.
    Completed,
    /// The run was cancelled before completion.
    Cancelled,
    /// A node failed; see the report's failure.
    Errored,
}

/// Terminal outcome of one node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeOutcome {
    /// The node executed (or was locked) and its outputs are current.
    Resolved,
    /// The node was cancelled before it could run.
    Cancelled,
    /// The node's validation or execution failed.
    Failed,
}

/// Per-node record in a run report.
#[derive(Debug, Clone, Serialize)]
pub struct NodeReport {
    /// Terminal outcome of the node.
    pub outcome: NodeOutcome,
    /// Output snapshot; populated for resolved nodes.
    pub outputs: HashMap<String, Value>,
}

/// The failing node of an errored run.
#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    /// Display name of the failing node.
    pub node: String,
    /// Underlying error message.
    pub message: String,
}

/// Summary of one resolution run.
///
/// Every participating node appears exactly once: resolved, cancelled, or
/// failed. A node that could not run is never silently omitted.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    /// Terminal status of the run.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: Timestamp,
    /// When the run reached its terminal state.
    pub finished_at: Timestamp,
    /// Per-node outcomes, keyed by node display name.
    pub nodes: HashMap<String, NodeReport>,
    /// Names of nodes in the order they resolved.
    pub resolution_order: Vec<String>,
    /// Failure details when `status` is [`RunStatus::Errored`].
    pub failure: Option<RunFailure>,
}

impl ResolveReport {
    /// Returns whether the run completed successfully.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Returns the report for a node by display name.
    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.get(name)
    }

    /// Returns a resolved node's output value.
    pub fn output(&self, node: &str, parameter: &str) -> Option<&Value> {
        self.nodes.get(node).and_then(|n| n.outputs.get(parameter))
    }
}
