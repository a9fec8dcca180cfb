//! Engine service wrapper with external configuration.

use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineConfig};

#[cfg(feature = "config")]
use clap::Args;

/// Configuration for the flow service with sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ServiceConfig {
    /// Maximum number of concurrently executing nodes (optional).
    #[cfg_attr(
        feature = "config",
        arg(long = "engine-max-concurrent-nodes", env = "ENGINE_MAX_CONCURRENT_NODES")
    )]
    pub engine_max_concurrent_nodes: Option<usize>,

    /// Pause the sequential resolver at every step point (optional).
    #[cfg_attr(
        feature = "config",
        arg(long = "engine-step-mode", env = "ENGINE_STEP_MODE")
    )]
    pub engine_step_mode: Option<bool>,
}

// Default values
const DEFAULT_MAX_CONCURRENT_NODES: usize = 5;

impl ServiceConfig {
    /// Creates a new service configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine_max_concurrent_nodes: None,
            engine_step_mode: None,
        }
    }

    /// Returns the concurrency cap, using the default if not set.
    #[inline]
    #[must_use]
    pub fn max_concurrent_nodes(&self) -> usize {
        self.engine_max_concurrent_nodes
            .unwrap_or(DEFAULT_MAX_CONCURRENT_NODES)
    }

    /// Returns whether step mode is enabled.
    #[inline]
    #[must_use]
    pub fn step_mode(&self) -> bool {
        self.engine_step_mode.unwrap_or(false)
    }

    /// Sets the concurrency cap.
    #[must_use]
    pub fn with_max_concurrent_nodes(mut self, max: usize) -> Self {
        self.engine_max_concurrent_nodes = Some(max);
        self
    }

    /// Enables or disables step mode.
    #[must_use]
    pub fn with_step_mode(mut self, step_mode: bool) -> Self {
        self.engine_step_mode = Some(step_mode);
        self
    }

    /// Validates the configuration and returns any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.engine_max_concurrent_nodes == Some(0) {
            return Err("Maximum concurrent nodes cannot be zero".to_string());
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Service wrapper around the flow engine.
///
/// This service derefs to the underlying [`Engine`], allowing direct
/// access to all engine methods.
#[derive(Debug, Deref, DerefMut)]
pub struct FlowService {
    #[deref]
    #[deref_mut]
    engine: Engine,
}

impl FlowService {
    /// Creates a new flow service with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engine: Engine::with_defaults(),
        }
    }

    /// Creates a new flow service with custom configuration.
    #[must_use]
    pub fn with_config(config: &ServiceConfig) -> Self {
        let engine_config = EngineConfig {
            max_concurrent_nodes: config.max_concurrent_nodes(),
            step_mode: config.step_mode(),
        };
        Self {
            engine: Engine::new(engine_config),
        }
    }

    /// Returns the underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Default for FlowService {
    fn default() -> Self {
        Self::new()
    }
}
