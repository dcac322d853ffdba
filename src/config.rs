use std::time::Duration;

use crate::api::region::Region;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Current power of one device, in whole watts.
    Power,
    /// Yesterday's consumption of one device, in whole kWh.
    Yesterday,
    Json,
    Table,
    /// Refresh and/or switch without printing anything.
    Silent,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub output_mode: OutputMode,
    pub region: Region,
    /// Overrides the region's API host.
    pub api_url: Option<String>,
    pub timeout: Duration,
    pub history: bool,
}
