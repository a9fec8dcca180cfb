#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod mock;
mod probe;
mod sink;

pub use mock::{
    Arithmetic, ArithmeticOp, ControlRelay, FailingNode, FailurePoint, Scale, SleeperNode,
    Trigger, ValueSource,
};
pub use probe::{ProbeSpan, RunProbe};
pub use sink::CollectorSink;
