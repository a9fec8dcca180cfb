//! Composable parameter capabilities.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::pipeline::{ValueConverter, ValueValidator};

/// A display-metadata entry contributed to a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiOption {
    /// Option key, e.g. "choices" or "slider_range".
    pub key: String,
    /// Option payload.
    pub value: serde_json::Value,
}

impl UiOption {
    /// Creates a new display option.
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A capability object attached to a parameter.
///
/// Capabilities contribute converters, validators, and display metadata.
/// They stay attached as live children: a parameter merges their
/// contributions ahead of its own every time a chain is read, so mutating
/// a shared capability is visible immediately on every parameter holding
/// it.
pub trait ParamCapability: Send + Sync {
    /// Stable name of this capability, for diagnostics.
    fn name(&self) -> &str;

    /// Converters contributed by this capability, in order.
    fn converters(&self) -> Vec<Arc<dyn ValueConverter>> {
        Vec::new()
    }

    /// Validators contributed by this capability, in order.
    fn validators(&self) -> Vec<Arc<dyn ValueValidator>> {
        Vec::new()
    }

    /// Display metadata contributed by this capability.
    fn ui_options(&self) -> Vec<UiOption> {
        Vec::new()
    }
}
