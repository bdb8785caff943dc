use clap::{Args, Subcommand};
use shared::canvas::http::HttpCanvasConfig;

use self::{coordinator::CoordinatorCommand, worker::WorkerCommand};

pub mod coordinator;
pub mod worker;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 🚀 Start Coordinator
    ///
    /// Split an image or pattern into work packets and hand them out to workers.
    Coordinator(CoordinatorCommand),

    /// 👷 Worker Mode
    ///
    /// Connect to a coordinator and draw the packets it hands out onto the canvas.
    Worker(WorkerCommand),
}

/// 🌐 Paths of the canvas service endpoints, relative to its base URL.
#[derive(Args, Debug)]
pub struct CanvasEndpoints {
    #[arg(long, env = "CANVAS_SIZE_ENDPOINT", default_value = "/canvas/size")]
    pub size_endpoint: String,

    #[arg(long, env = "CANVAS_RATE_ENDPOINT", default_value = "/canvas/pps")]
    pub rate_endpoint: String,

    #[arg(long, env = "CANVAS_PIXEL_ENDPOINT", default_value = "/canvas/pixel")]
    pub pixel_endpoint: String,
}

impl CanvasEndpoints {
    pub fn into_config(self, base_url: String) -> HttpCanvasConfig {
        HttpCanvasConfig {
            size_endpoint: self.size_endpoint,
            rate_endpoint: self.rate_endpoint,
            pixel_endpoint: self.pixel_endpoint,
            ..HttpCanvasConfig::new(base_url)
        }
    }
}
