use std::time::Duration;

use log::{info, warn};
use shared::canvas::Canvas;
use tokio::time::{sleep_until, Instant};

/// Budget assumed until the canvas has told us one.
pub const DEFAULT_POINTS_PER_SECOND: f64 = 1.0;

/// Slowest budget taken from the canvas: one point per hour. Anything below is ignored.
pub const MIN_POINTS_PER_SECOND: f64 = 1.0 / 3600.0;

/// Longest wait between two draw slots.
pub const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Paces draw calls to the canvas' points-per-second budget.
///
/// Consecutive [`acquire`](Self::acquire) calls return at least `1 / points_per_second`
/// apart. The budget is refreshed from the canvas on demand; a failed refresh keeps the last
/// known budget, or [`DEFAULT_POINTS_PER_SECOND`] if there is none yet.
#[derive(Debug)]
pub struct RateLimiter {
    points_per_second: Option<f64>,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
    next_slot: Option<Instant>,
}

impl RateLimiter {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            points_per_second: None,
            refresh_interval,
            last_refresh: None,
            next_slot: None,
        }
    }

    pub fn points_per_second(&self) -> f64 {
        self.points_per_second.unwrap_or(DEFAULT_POINTS_PER_SECOND)
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.points_per_second())
            .map_or(MAX_DELAY, |delay| delay.min(MAX_DELAY))
    }

    pub async fn refresh<C: Canvas>(&mut self, canvas: &C) {
        match canvas.get_rate_limit().await {
            Ok(pps) if pps.is_finite() && pps >= MIN_POINTS_PER_SECOND => {
                if self.points_per_second != Some(pps) {
                    info!(
                        "PPS rate limit obtained: {}, delay {:.3}s",
                        pps,
                        1.0 / pps
                    );
                }
                self.points_per_second = Some(pps);
            }
            Ok(pps) => warn!(
                "Ignoring unusable rate limit {}, keeping {} points/s",
                pps,
                self.points_per_second()
            ),
            Err(e) => warn!(
                "Failed to get rate limit, keeping {} points/s: {}",
                self.points_per_second(),
                e
            ),
        }
        self.last_refresh = Some(Instant::now());
    }

    /// Refreshes the budget if the refresh interval has passed since the last attempt.
    pub async fn refresh_if_due<C: Canvas>(&mut self, canvas: &C) {
        let due = self
            .last_refresh
            .map_or(true, |last| last.elapsed() >= self.refresh_interval);
        if due {
            self.refresh(canvas).await;
        }
    }

    /// Waits for the next draw slot.
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        let slot = match self.next_slot {
            Some(slot) if slot > now => {
                sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        self.next_slot = slot.checked_add(self.delay());
    }
}
