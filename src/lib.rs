// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // providers
pub mod blueprint;     // config -> declared resources, invariants
pub mod catalog;       // export CSV contract
pub mod config;        // stack config + graph validation
pub mod engine;        // planner and applier
pub mod errors;        // error handling
pub mod observability;
pub mod resources;     // resource model and references
pub mod schedule;      // timer expressions, invocation state machine
pub mod state;         // state document, backend, lock
pub mod traits;        // provider and backend seams
