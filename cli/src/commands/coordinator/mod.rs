use std::{path::PathBuf, time::Duration};

use clap::Parser;
use shared::networking::coordinator::CoordinatorConfig;

use super::CanvasEndpoints;

/// 🖥️ Coordinator Command
///
/// This command is used to configure and 🚀 start the coordinator.
#[derive(Parser, Debug)]
#[command(name = "coordinator", about = "🚀 Hand out an image to workers, packet by packet.", long_about = None)]
pub struct CoordinatorCommand {
    /// 🖼️ Image to draw
    ///
    /// Any format the `image` crate decodes. Required unless `--pattern` is given.
    #[arg(value_name = "IMAGE", required_unless_present = "pattern")]
    pub image: Option<PathBuf>,

    /// 🎨 Procedural pattern to draw instead of an image: `gradient` or `checkerboard`.
    #[arg(long, conflicts_with = "image")]
    pub pattern: Option<String>,

    /// 📐 Size of the generated pattern.
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "64x64")]
    pub pattern_size: String,

    /// 📌 Address workers connect to
    ///
    /// Interface the packet hand-out socket binds to, e.g. 127.0.0.1 to keep workers on
    /// this host. Defaults to 0.0.0.0.
    #[arg(short, long, value_name = "ADDRESS", env = "COORDINATOR_ADDRESS")]
    pub address: Option<String>,

    /// 🚪 Port workers connect to
    ///
    /// Workers must be started with the same `--port`. Defaults to 8787.
    #[arg(short, long, value_name = "PORT", env = "COORDINATOR_PORT")]
    pub port: Option<u16>,

    /// 💾 Checkpoint file used to resume an interrupted run.
    #[arg(long, value_name = "PATH", env = "COORDINATOR_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// ⏱️ Seconds of drawing a single packet should represent.
    #[arg(long, value_name = "SECONDS")]
    pub packet_seconds: Option<f64>,

    /// 🌐 Canvas service base URL, used to look up canvas size and rate limit.
    ///
    /// Without it the fixed canvas size and rate below are used.
    #[arg(long, value_name = "URL", env = "CANVAS_URL")]
    pub canvas_url: Option<String>,

    #[command(flatten)]
    pub endpoints: CanvasEndpoints,

    /// 📏 Canvas width when no canvas service is available.
    #[arg(long, value_name = "WIDTH")]
    pub canvas_width: Option<u32>,

    /// 📐 Canvas height when no canvas service is available.
    #[arg(long, value_name = "HEIGHT")]
    pub canvas_height: Option<u32>,

    /// 🐢 Points per second when no canvas service is available.
    #[arg(long, value_name = "PPS")]
    pub pps: Option<f64>,

    /// ✋ Seconds a worker has to acknowledge a packet.
    #[arg(long, value_name = "SECONDS")]
    pub ack_timeout: Option<u64>,

    /// ⌛ Seconds an acknowledged packet may stay unfinished before it is handed out again.
    #[arg(long, value_name = "SECONDS")]
    pub lease_timeout: Option<u64>,
}

impl CoordinatorCommand {
    pub fn config(&self) -> CoordinatorConfig {
        let defaults = CoordinatorConfig::default();
        CoordinatorConfig {
            address: self.address.clone().unwrap_or(defaults.address),
            port: self.port.unwrap_or(defaults.port),
            checkpoint_path: self.checkpoint.clone().unwrap_or(defaults.checkpoint_path),
            packet_seconds: self.packet_seconds.unwrap_or(defaults.packet_seconds),
            canvas_width: self.canvas_width.unwrap_or(defaults.canvas_width),
            canvas_height: self.canvas_height.unwrap_or(defaults.canvas_height),
            points_per_second: self.pps.unwrap_or(defaults.points_per_second),
            ack_timeout: self
                .ack_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.ack_timeout),
            lease_timeout: self
                .lease_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.lease_timeout),
        }
    }
}
