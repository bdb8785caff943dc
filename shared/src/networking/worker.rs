use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub reconnect_backoff: Duration,
    /// Interval between two rate budget lookups; lookups only happen between packets.
    pub refresh_interval: Duration,
    /// Attempts per point before the point is skipped.
    pub draw_attempts: u32,
    pub retry_backoff: Duration,
}

impl WorkerConfig {
    pub fn new(name: String, address: String, port: u16) -> Self {
        Self {
            name,
            address,
            port,
            reconnect_backoff: Duration::from_secs(5),
            refresh_interval: Duration::from_secs(10),
            draw_attempts: 3,
            retry_backoff: Duration::from_millis(250),
        }
    }

    pub fn coordinator_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
