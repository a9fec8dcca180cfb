//! Engine entry point.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET;
use crate::error::FlowResult;
use crate::graph::Flow;
use crate::node::NodeId;

use super::config::EngineConfig;
use super::event::{EventSink, TracingSink};
use super::parallel::ParallelResolver;
use super::report::ResolveReport;
use super::sequential::SequentialResolver;

/// The flow execution engine.
///
/// Holds configuration and the event sink, and hands each run to one of
/// the two resolvers. A flow is owned by exactly one resolver for the
/// duration of a run.
pub struct Engine {
    config: EngineConfig,
    events: Arc<dyn EventSink>,
}

impl Engine {
    /// Creates an engine with the given configuration, logging events
    /// through `tracing`.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_events(config, Arc::new(TracingSink))
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Creates an engine with a custom event sink.
    pub fn with_events(config: EngineConfig, events: Arc<dyn EventSink>) -> Self {
        tracing::debug!(
            target: TRACING_TARGET,
            max_concurrent_nodes = config.max_concurrent_nodes,
            step_mode = config.step_mode,
            "Engine initialized"
        );
        Self { config, events }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the event sink.
    pub fn events(&self) -> Arc<dyn EventSink> {
        self.events.clone()
    }

    /// Resolves the flow sequentially from `start` (or the discovered
    /// start nodes), running to completion.
    pub async fn resolve(&self, flow: &mut Flow, start: Option<NodeId>) -> FlowResult<ResolveReport> {
        self.resolve_with(flow, start, CancellationToken::new()).await
    }

    /// Resolves the flow sequentially with an external cancellation token.
    pub async fn resolve_with(
        &self,
        flow: &mut Flow,
        start: Option<NodeId>,
        cancel: CancellationToken,
    ) -> FlowResult<ResolveReport> {
        let resolver = SequentialResolver::new(flow, self.events.clone(), cancel, start)?;
        resolver.run_to_completion().await
    }

    /// Resolves the dependency graph of `target` (or the whole flow)
    /// concurrently under the configured concurrency cap.
    pub async fn resolve_parallel(
        &self,
        flow: &mut Flow,
        target: Option<NodeId>,
    ) -> FlowResult<ResolveReport> {
        self.resolve_parallel_with(flow, target, CancellationToken::new())
            .await
    }

    /// Parallel resolution with an external cancellation token.
    pub async fn resolve_parallel_with(
        &self,
        flow: &mut Flow,
        target: Option<NodeId>,
        cancel: CancellationToken,
    ) -> FlowResult<ResolveReport> {
        let resolver =
            ParallelResolver::new(flow, self.events.clone(), &self.config, cancel, target)?;
        resolver.run().await
    }

    /// Starts a stepping sequential resolution, for debuggers and
    /// editors driving the walk one pause point at a time.
    pub fn stepper<'f>(
        &self,
        flow: &'f mut Flow,
        start: Option<NodeId>,
        cancel: CancellationToken,
    ) -> FlowResult<SequentialResolver<'f>> {
        SequentialResolver::new(flow, self.events.clone(), cancel, start)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish()
    }
}
