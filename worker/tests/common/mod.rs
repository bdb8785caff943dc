#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use coordinator::{
    error::CoordinatorResult,
    progress::{tracker::ProgressTracker, FileProgressStore, ProgressStore},
    queue::WorkQueue,
    Coordinator,
};
use shared::{
    canvas::{Canvas, CanvasError, CanvasResult, CanvasSize},
    models::{checkpoint::ProgressCheckpoint, color::Color, point::Point},
    networking::{coordinator::CoordinatorConfig, worker::WorkerConfig},
    segmenter::segment,
    source::Anchor,
};
use tokio::{net::TcpListener, task::JoinHandle, time::Instant};
use uuid::Uuid;

/// In-memory canvas that records every draw call.
#[derive(Default)]
pub struct FakeCanvas {
    points_per_second: Mutex<Option<f64>>,
    failing: HashSet<(u32, u32)>,
    drawn: Mutex<Vec<(Point, Instant)>>,
    attempts: Mutex<HashMap<(u32, u32), u32>>,
}

impl FakeCanvas {
    pub fn new(points_per_second: f64) -> Self {
        Self {
            points_per_second: Mutex::new(Some(points_per_second)),
            ..Self::default()
        }
    }

    /// Rejects every draw at the given coordinates.
    pub fn failing_at(mut self, x: u32, y: u32) -> Self {
        self.failing.insert((x, y));
        self
    }

    /// `None` makes the rate endpoint fail.
    pub fn set_rate(&self, points_per_second: Option<f64>) {
        *self.points_per_second.lock().unwrap() = points_per_second;
    }

    pub fn drawn(&self) -> Vec<Point> {
        self.drawn.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    pub fn draw_times(&self) -> Vec<Instant> {
        self.drawn.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn attempts_at(&self, x: u32, y: u32) -> u32 {
        self.attempts.lock().unwrap().get(&(x, y)).copied().unwrap_or(0)
    }
}

impl Canvas for FakeCanvas {
    async fn get_canvas_size(&self) -> CanvasResult<CanvasSize> {
        Ok(CanvasSize { x: 1920, y: 1080 })
    }

    async fn get_rate_limit(&self) -> CanvasResult<f64> {
        let rate = *self.points_per_second.lock().unwrap();
        rate.ok_or(CanvasError::Status {
            endpoint: "/canvas/pps".into(),
            status: 503,
        })
    }

    async fn put_pixel(&self, point: Point) -> CanvasResult<()> {
        *self
            .attempts
            .lock()
            .unwrap()
            .entry((point.x, point.y))
            .or_default() += 1;

        if self.failing.contains(&(point.x, point.y)) {
            return Err(CanvasError::Status {
                endpoint: "/canvas/pixel".into(),
                status: 500,
            });
        }
        self.drawn.lock().unwrap().push((point, Instant::now()));
        Ok(())
    }
}

pub fn points(n: u32) -> Vec<Point> {
    (0..n)
        .map(|i| Point::new(i, 0, Color::new(i as u8, 0x80, 0xff)))
        .collect()
}

pub fn worker_config(port: u16) -> WorkerConfig {
    WorkerConfig {
        reconnect_backoff: Duration::from_millis(50),
        retry_backoff: Duration::from_millis(5),
        ..WorkerConfig::new("test-worker".into(), "127.0.0.1".into(), port)
    }
}

pub struct RunningCoordinator {
    pub port: u16,
    pub checkpoint_path: PathBuf,
    pub handle: JoinHandle<CoordinatorResult<()>>,
}

/// Starts a coordinator on an ephemeral port serving `points` in packets of `packet_size`.
pub async fn start_coordinator(points: Vec<Point>, packet_size: usize) -> RunningCoordinator {
    start_coordinator_leased(points, packet_size, Duration::from_secs(30)).await
}

pub async fn start_coordinator_leased(
    points: Vec<Point>,
    packet_size: usize,
    lease_timeout: Duration,
) -> RunningCoordinator {
    let checkpoint_path =
        std::env::temp_dir().join(format!("pixel-relay-test-{}.json", Uuid::new_v4()));
    let mut store = FileProgressStore::new(&checkpoint_path);
    let checkpoint = ProgressCheckpoint::new(Anchor::new(0, 0));
    store.save(&checkpoint).unwrap();

    let queue = WorkQueue::new();
    for packet in segment(points, packet_size.try_into().unwrap()) {
        queue.enqueue(packet);
    }
    let config = CoordinatorConfig {
        ack_timeout: Duration::from_secs(5),
        lease_timeout,
        ..CoordinatorConfig::default()
    };
    let coordinator = Coordinator::new(
        config,
        queue,
        ProgressTracker::new(Box::new(store), checkpoint),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(coordinator.run(listener));

    RunningCoordinator {
        port,
        checkpoint_path,
        handle,
    }
}

pub fn spawn_worker(port: u16, canvas: &Arc<FakeCanvas>) -> JoinHandle<()> {
    tokio::spawn(worker::run_worker(worker_config(port), Arc::clone(canvas)))
}

/// Waits for the coordinator to finish, failing the test if it takes too long.
pub async fn finished(coordinator: RunningCoordinator) -> PathBuf {
    tokio::time::timeout(Duration::from_secs(20), coordinator.handle)
        .await
        .expect("coordinator did not drain in time")
        .unwrap()
        .unwrap();
    coordinator.checkpoint_path
}
