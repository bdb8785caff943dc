pub mod connection;
pub mod error;
pub mod progress;
pub mod queue;

use std::{future::Future, sync::Arc};

use log::{error, info, warn};
use rand::Rng;
use shared::{
    canvas::{http::HttpCanvas, Canvas, CanvasSize},
    models::checkpoint::ProgressCheckpoint,
    networking::coordinator::CoordinatorConfig,
    segmenter::{packet_size_for, segment},
    source::{Anchor, PointSource},
};
use tokio::{net::TcpListener, task::JoinSet};

use crate::{
    connection::handle_connection,
    error::CoordinatorResult,
    progress::{tracker::ProgressTracker, FileProgressStore, ProgressStore},
    queue::WorkQueue,
};

/// Hands packets of one run out to connecting workers until every packet is done.
pub struct Coordinator {
    config: Arc<CoordinatorConfig>,
    queue: Arc<WorkQueue>,
    progress: Arc<ProgressTracker>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, queue: WorkQueue, progress: ProgressTracker) -> Self {
        Self {
            config: Arc::new(config),
            queue: Arc::new(queue),
            progress: Arc::new(progress),
        }
    }

    /// Loads or starts a run for `source` and fills the queue with what is left of it.
    ///
    /// A fresh run picks a random anchor that keeps the source on the canvas and saves it
    /// right away; a resumed run reuses the saved anchor and skips the delivered points.
    pub fn prepare(
        config: CoordinatorConfig,
        source: &dyn PointSource,
        mut store: Box<dyn ProgressStore>,
        canvas: CanvasSize,
        points_per_second: f64,
    ) -> CoordinatorResult<Self> {
        let checkpoint = match store.load()? {
            Some(checkpoint) => {
                info!(
                    "Resuming run at point {} of {}, anchored at ({}, {})",
                    checkpoint.last_delivered_point_count,
                    source.len(),
                    checkpoint.anchor_x,
                    checkpoint.anchor_y
                );
                checkpoint
            }
            None => {
                let anchor = choose_anchor(canvas, source.dimensions(), &mut rand::thread_rng());
                let checkpoint = ProgressCheckpoint::new(anchor);
                store.save(&checkpoint)?;
                info!("Starting position on canvas: (x={}, y={})", anchor.x, anchor.y);
                checkpoint
            }
        };

        let packet_size = packet_size_for(points_per_second, config.packet_seconds);
        info!(
            "Packet size {} for {} points/s and {}s per packet",
            packet_size, points_per_second, config.packet_seconds
        );

        if config.lease_timeout.as_secs_f64() < config.packet_seconds {
            warn!(
                "Lease of {:?} is shorter than the {}s a packet should take, slow packets will be handed out twice",
                config.lease_timeout, config.packet_seconds
            );
        }

        let delivered = checkpoint.last_delivered_point_count;
        let remaining = source
            .points(checkpoint.anchor())
            .skip(usize::try_from(delivered).unwrap_or(usize::MAX));

        let queue = WorkQueue::new();
        for packet in segment(remaining, packet_size).starting_at(delivered) {
            queue.enqueue(packet);
        }
        info!(
            "Loaded {} remaining points into {} work packets",
            source.len().saturating_sub(delivered),
            queue.pending()
        );

        Ok(Self::new(config, queue, ProgressTracker::new(store, checkpoint)))
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Serves workers on `listener` until the queue drains, then clears the checkpoint.
    ///
    /// Returns early only on a fatal error, which leaves the checkpoint in place for a
    /// later resume.
    pub async fn run(self, listener: TcpListener) -> CoordinatorResult<()> {
        info!(
            "Coordinator listening on {} with {} packets pending",
            listener.local_addr()?,
            self.queue.pending()
        );

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                biased;

                _ = self.queue.drained() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    match joined {
                        Ok(result) => result?,
                        Err(e) => error!("Connection task failed: {}", e),
                    }
                }
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    connections.spawn(handle_connection(
                        socket,
                        peer,
                        Arc::clone(&self.config),
                        Arc::clone(&self.queue),
                        Arc::clone(&self.progress),
                    ));
                }
            }
        }

        drop(listener);
        // Connections still waiting on an expired lease hold nothing the run needs.
        connections.abort_all();
        while let Some(joined) = connections.join_next().await {
            match joined {
                Ok(result) => result?,
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!("Connection task failed: {}", e),
            }
        }

        self.progress.clear()?;
        info!("All work packets processed");
        Ok(())
    }
}

/// Picks a top-left position that keeps a `width` x `height` source inside the canvas.
///
/// Sources larger than the canvas are pinned to the edge on that axis.
pub fn choose_anchor<R: Rng>(
    canvas: CanvasSize,
    (width, height): (u32, u32),
    rng: &mut R,
) -> Anchor {
    Anchor::new(
        rng.gen_range(0..=canvas.x.saturating_sub(width)),
        rng.gen_range(0..=canvas.y.saturating_sub(height)),
    )
}

/// Canvas bounds and draw rate, asked from the canvas service when one is configured.
async fn canvas_budget<C: Canvas>(
    config: &CoordinatorConfig,
    canvas: Option<&C>,
) -> (CanvasSize, f64) {
    let mut size = CanvasSize {
        x: config.canvas_width,
        y: config.canvas_height,
    };
    let mut points_per_second = config.points_per_second;

    if let Some(canvas) = canvas {
        match canvas.get_canvas_size().await {
            Ok(fetched) => size = fetched,
            Err(e) => warn!(
                "Failed to get canvas size, using {}x{}: {}",
                size.x, size.y, e
            ),
        }
        match canvas.get_rate_limit().await {
            Ok(fetched) => points_per_second = fetched,
            Err(e) => warn!(
                "Failed to get rate limit, using {}: {}",
                points_per_second, e
            ),
        }
    }

    (size, points_per_second)
}

/// Runs the coordinator until every packet is done or Ctrl-C is pressed.
pub async fn run_coordinator(
    config: CoordinatorConfig,
    source: &dyn PointSource,
    canvas: Option<HttpCanvas>,
) -> CoordinatorResult<()> {
    run_until(config, source, canvas, interrupted()).await
}

/// Runs the coordinator until every packet is done or `shutdown` resolves.
///
/// Shutting down early keeps the checkpoint so the next run resumes where this one stopped.
pub async fn run_until<C: Canvas>(
    config: CoordinatorConfig,
    source: &dyn PointSource,
    canvas: Option<C>,
    shutdown: impl Future<Output = ()>,
) -> CoordinatorResult<()> {
    let (size, points_per_second) = canvas_budget(&config, canvas.as_ref()).await;
    let store = Box::new(FileProgressStore::new(config.checkpoint_path.clone()));
    let listener = start_server(&config.bind_addr()).await?;
    let coordinator = Coordinator::prepare(config, source, store, size, points_per_second)?;

    tokio::select! {
        result = coordinator.run(listener) => result,
        _ = shutdown => {
            info!("Interrupted, checkpoint kept for the next run");
            Ok(())
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, running until drained: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn start_server(addr: &str) -> CoordinatorResult<TcpListener> {
    Ok(TcpListener::bind(addr).await?)
}
