use log::{debug, warn};
use shared::{
    canvas::Canvas,
    models::{packet::WorkPacket, point::Point},
    networking::worker::WorkerConfig,
};
use tokio::time::sleep;

use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub drawn: usize,
    pub skipped: usize,
}

/// Draws every point of `packet` in order, at most one call per rate limiter slot.
///
/// A point that still fails after `draw_attempts` tries is skipped; the packet as a whole
/// never fails.
pub async fn draw_packet<C: Canvas>(
    canvas: &C,
    packet: &WorkPacket,
    limiter: &mut RateLimiter,
    config: &WorkerConfig,
) -> DrawReport {
    let mut report = DrawReport::default();
    for point in &packet.points {
        if draw_point(canvas, *point, limiter, config).await {
            report.drawn += 1;
        } else {
            report.skipped += 1;
        }
    }
    report
}

async fn draw_point<C: Canvas>(
    canvas: &C,
    point: Point,
    limiter: &mut RateLimiter,
    config: &WorkerConfig,
) -> bool {
    let attempts = config.draw_attempts.max(1);
    for attempt in 1..=attempts {
        limiter.acquire().await;
        match canvas.put_pixel(point).await {
            Ok(()) => return true,
            Err(e) if attempt < attempts => {
                debug!(
                    "Attempt {}/{} to set pixel at ({}, {}) failed: {}",
                    attempt, attempts, point.x, point.y, e
                );
                sleep(config.retry_backoff).await;
            }
            Err(e) => warn!(
                "Failed to set pixel at ({}, {}) with color {} after {} attempts, skipping: {}",
                point.x, point.y, point.color, attempts, e
            ),
        }
    }
    false
}
