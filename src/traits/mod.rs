// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backend;
pub mod provider;

pub use backend::StateBackend;
pub use provider::{Outputs, Provider};
