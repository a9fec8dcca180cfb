//! Mock node implementations for testing.
//!
//! This module provides deterministic fakes for the node contract:
//! - [`ValueSource`]: Emits a configured value
//! - [`Arithmetic`] / [`Scale`]: Pure numeric transforms
//! - [`SleeperNode`]: Suspends on a cancellable sleeping work unit
//! - [`FailingNode`]: Fails at a configurable point
//! - [`Trigger`] / [`ControlRelay`]: Control-flow chain members

mod control;
mod failing;
mod math;
mod sleeper;
mod source;

pub use control::{ControlRelay, Trigger};
pub use failing::{FailingNode, FailurePoint};
pub use math::{Arithmetic, ArithmeticOp, Scale};
pub use sleeper::SleeperNode;
pub use source::ValueSource;
