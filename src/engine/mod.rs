// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Planning and applying a stack against recorded state.
//!
//! [`plan`] diffs the declared stack with the state document and decides a
//! single [`Action`] per resource. [`Applier`] executes a plan through a
//! [`crate::traits::Provider`], one topological level at a time.

pub mod applier;
pub mod levels;
pub mod planner;

#[cfg(test)]
mod integration_tests;

pub use applier::{ApplyReport, Applier};
pub use levels::compute_levels;
pub use planner::{plan, plan_destroy, Action, Plan, PlanSummary, PlannedChange};
