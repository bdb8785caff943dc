use std::time::Duration;

use clap::Parser;

use super::CanvasEndpoints;

#[derive(Parser, Debug)]
pub struct WorkerCommand {
    #[arg(short, long, env = "WORKER_NAME")]
    pub name: Option<String>,

    /// Coordinator host to connect to.
    #[arg(short, long, env = "COORDINATOR_HOST")]
    pub address: Option<String>,

    #[arg(short, long, env = "COORDINATOR_PORT")]
    pub port: Option<u16>,

    /// Canvas service base URL.
    #[arg(long, env = "CANVAS_URL")]
    pub canvas_url: String,

    #[command(flatten)]
    pub endpoints: CanvasEndpoints,

    /// Seconds to wait before reconnecting to the coordinator.
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub reconnect_backoff: u64,

    /// Seconds between two rate limit lookups.
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    pub refresh_interval: u64,

    /// Attempts per pixel before it is skipped.
    #[arg(long, default_value_t = 3)]
    pub draw_attempts: u32,

    /// Milliseconds to wait between two attempts on the same pixel.
    #[arg(long, value_name = "MILLIS", default_value_t = 250)]
    pub retry_backoff: u64,
}

impl WorkerCommand {
    pub fn backoffs(&self) -> (Duration, Duration, Duration) {
        (
            Duration::from_secs(self.reconnect_backoff),
            Duration::from_secs(self.refresh_interval),
            Duration::from_millis(self.retry_backoff),
        )
    }
}
