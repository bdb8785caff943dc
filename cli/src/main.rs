pub mod commands;

use std::error::Error;

use clap::Parser;
use commands::{coordinator::CoordinatorCommand, worker::WorkerCommand, Commands};
use log::error;
use shared::{
    canvas::http::HttpCanvas,
    env, logger,
    networking::worker::WorkerConfig,
    source::{pattern::PatternKind, ImageSource, PatternSource, PointSource},
};
use uuid::Uuid;

/// Draw an image on a shared pixel canvas with a fleet of workers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    env::init();
    logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Coordinator(args) => run_coordinator(args).await,
        Commands::Worker(args) => run_worker(args).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_coordinator(args: CoordinatorCommand) -> Result<(), Box<dyn Error>> {
    let config = args.config();

    let source: Box<dyn PointSource> = match (&args.image, &args.pattern) {
        (Some(path), _) => Box::new(ImageSource::open(path)?),
        (None, Some(pattern)) => {
            let kind: PatternKind = pattern.parse()?;
            let (width, height) = PatternSource::parse_size(&args.pattern_size)?;
            Box::new(PatternSource::new(kind, width, height))
        }
        (None, None) => return Err("either an image or --pattern is required".into()),
    };

    let canvas = match args.canvas_url {
        Some(url) => Some(HttpCanvas::new(args.endpoints.into_config(url))?),
        None => None,
    };

    coordinator::run_coordinator(config, source.as_ref(), canvas).await?;
    Ok(())
}

async fn run_worker(args: WorkerCommand) -> Result<(), Box<dyn Error>> {
    let (reconnect_backoff, refresh_interval, retry_backoff) = args.backoffs();

    let name = match &args.name {
        Some(name) => name.to_owned(),
        None => format!("worker-{}", Uuid::new_v4()),
    };

    let address = match &args.address {
        Some(address) => address.to_owned(),
        None => "localhost".to_string(),
    };

    let port = match args.port {
        Some(port) => port,
        None => 8787,
    };

    let worker = WorkerConfig {
        reconnect_backoff,
        refresh_interval,
        draw_attempts: args.draw_attempts,
        retry_backoff,
        ..WorkerConfig::new(name, address, port)
    };
    let canvas = HttpCanvas::new(args.endpoints.into_config(args.canvas_url))?;

    worker::run_worker(worker, canvas).await;
    Ok(())
}
