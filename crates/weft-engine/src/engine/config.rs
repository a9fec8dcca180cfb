//! Engine configuration.

use derive_builder::Builder;

/// Configuration for flow resolution.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of node executions running simultaneously in the
    /// parallel resolver.
    #[builder(default = "5")]
    pub max_concurrent_nodes: usize,

    /// Pause the sequential resolver before each parameter evaluation and
    /// each node execution, advancing only on explicit step calls.
    #[builder(default)]
    pub step_mode: bool,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_concurrent_nodes
            && max == 0
        {
            return Err("max_concurrent_nodes must be at least 1".into());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Returns a builder for the engine configuration.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: 5,
            step_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_nodes, 5);
        assert!(!config.step_mode);
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        let result = EngineConfig::builder().max_concurrent_nodes(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::builder()
            .max_concurrent_nodes(2usize)
            .step_mode(true)
            .build()
            .unwrap();
        assert_eq!(config.max_concurrent_nodes, 2);
        assert!(config.step_mode);
    }
}
