// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resource names the blueprint assigns. Addresses are `kind.<name>`.

pub const MAIN: &str = "main";
pub const PUBLIC: &str = "public";
pub const PRIVATE: &str = "private";
pub const NAT: &str = "nat";

pub const COMPUTE: &str = "compute";
pub const GRAPH_DB: &str = "graph_db";
pub const BASTION: &str = "bastion";
pub const NOTEBOOK: &str = "notebook";
pub const GRAPH_LOADER: &str = "graph_loader";

pub const RAW: &str = "raw";
pub const ANALYSIS: &str = "analysis";
pub const SIGNALS: &str = "signals";
pub const STATE_LOCK: &str = "state";

pub const PRIMARY: &str = "primary";

pub const ETL: &str = "etl";
pub const LOADER: &str = "loader";

pub const SCHEDULE_PERMISSION: &str = "schedule_etl";
pub const RAW_LOADER_PERMISSION: &str = "raw_loader";
pub const ANALYSIS_SIGNALS_PERMISSION: &str = "analysis_signals";

pub const GRAPH_NOTEBOOK: &str = "graph";

/// `private_a`, `private_b`, ... one per availability zone.
pub fn private_subnet(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => format!("{}_{}", PRIVATE, char::from(b'a' + i)),
        _ => format!("{}_{}", PRIVATE, index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_subnets_are_lettered() {
        assert_eq!(private_subnet(0), "private_a");
        assert_eq!(private_subnet(1), "private_b");
        assert_eq!(private_subnet(30), "private_30");
    }
}
