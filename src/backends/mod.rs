// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Provider implementations the engine can apply a plan through.
//!
//! Only the in-process [`SimulatedProvider`] ships here. It honors the
//! managed-service rules the blueprint depends on, so plans and failure
//! strategies can be exercised without a cloud account.

pub mod simulated;

pub use simulated::{ProviderCall, SimulatedProvider};
