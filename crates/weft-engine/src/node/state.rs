//! Node resolution lifecycle state.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Resolution lifecycle of a node.
///
/// Transitions: `Unresolved → Resolving → Resolved`. A resolved node
/// returns to `Unresolved` only through cascade invalidation or an
/// explicit reset. Only a `Resolving` node may hold a suspended execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolutionState {
    /// Outputs are stale or have never been produced.
    #[default]
    Unresolved,
    /// The node is being evaluated or executed.
    Resolving,
    /// Outputs are current.
    Resolved,
}

impl ResolutionState {
    /// Returns whether the node's outputs are current.
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Returns whether the node is mid-resolution.
    pub const fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving)
    }
}
