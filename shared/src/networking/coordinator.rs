use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub address: String,
    pub port: u16,
    /// Where the progress checkpoint lives between runs.
    pub checkpoint_path: PathBuf,
    /// Seconds of drawing one packet should represent at the current rate.
    pub packet_seconds: f64,
    /// Canvas bounds and rate used when no canvas service is reachable.
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub points_per_second: f64,
    /// How long a worker has to acknowledge a packet.
    pub ack_timeout: Duration,
    /// How long an acknowledged packet may stay unfinished before it is handed out again.
    pub lease_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn new(address: String, port: u16) -> Self {
        Self {
            address,
            port,
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8787,
            checkpoint_path: PathBuf::from("progress.json"),
            packet_seconds: 40.0,
            canvas_width: 1920,
            canvas_height: 1080,
            points_per_second: 5.0,
            ack_timeout: Duration::from_secs(30),
            lease_timeout: Duration::from_secs(300),
        }
    }
}
