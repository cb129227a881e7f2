// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Timer expressions and the scheduled invocation state machine.

mod invocation;
mod rate;

pub use invocation::{InvocationBinding, InvocationMachine, InvocationState, TickOutcome};
pub use rate::{RateExpression, RateUnit};
