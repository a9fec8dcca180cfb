#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod engine;
mod error;
pub mod graph;
pub mod node;
pub mod param;
mod service;

#[doc(hidden)]
pub mod prelude;

pub use error::{FlowError, FlowResult};
pub use service::{FlowService, ServiceConfig};

/// Tracing target for engine operations.
pub const TRACING_TARGET: &str = "weft_engine";
