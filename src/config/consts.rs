// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Region used when the configuration does not name one
pub const DEFAULT_REGION: &str = "eu-west-1";
/// Account the simulated provider builds ARNs in when none is configured
pub const DEFAULT_ACCOUNT_ID: &str = "000000000000";
/// Port the graph database listens on
pub const DEFAULT_GRAPH_PORT: u16 = 8182;
/// Management port operators reach the bastion on
pub const MANAGEMENT_PORT: u16 = 22;
/// Timer expression for the compute job
pub const DEFAULT_SCHEDULE: &str = "rate(5 minutes)";
/// Address range matching every IPv4 source
pub const OPEN_CIDR: &str = "0.0.0.0/0";
/// The managed graph database rejects subnet groups covering fewer zones
pub const MIN_DATABASE_ZONES: usize = 2;

pub const DEFAULT_MEMORY_MB: u32 = 1024;
pub const MIN_MEMORY_MB: u32 = 128;
pub const MAX_MEMORY_MB: u32 = 10_240;
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 300;
pub const MAX_TIMEOUT_SECONDS: u32 = 900;

/// Partition key of the provisioning lock table
pub const LOCK_HASH_KEY: &str = "LockID";
/// Image tag an external build pipeline overwrites before the first real invocation
pub const PLACEHOLDER_IMAGE_TAG: &str = "bootstrap";
