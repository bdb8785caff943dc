use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::debug;
use shared::models::{checkpoint::ProgressCheckpoint, packet::WorkPacket};
use tokio::task;

use super::{ProgressStore, StoreError};

struct TrackerState {
    checkpoint: ProgressCheckpoint,
    /// Retired packets above the watermark, keyed by offset, valued by end.
    retired: BTreeMap<u64, u64>,
}

struct SavedState {
    store: Box<dyn ProgressStore>,
    /// Highest watermark written so far; older saves finishing late are skipped.
    saved: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Turns packet retirements into checkpoint updates.
///
/// Requeued packets may finish out of order, so the saved count is the end of the longest
/// run of retired packets starting at the previous count. Everything below it is done;
/// anything above it is drawn again after a restart, which only repaints the same colors.
///
/// Saves run on the blocking pool so a slow disk does not hold up other connections.
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    saved: Arc<Mutex<SavedState>>,
}

impl ProgressTracker {
    pub fn new(store: Box<dyn ProgressStore>, checkpoint: ProgressCheckpoint) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                checkpoint,
                retired: BTreeMap::new(),
            }),
            saved: Arc::new(Mutex::new(SavedState {
                store,
                saved: checkpoint.last_delivered_point_count,
            })),
        }
    }

    pub fn checkpoint(&self) -> ProgressCheckpoint {
        lock(&self.state).checkpoint
    }

    /// Records a retired packet and saves the checkpoint if the watermark moved.
    pub async fn record(&self, packet: &WorkPacket) -> Result<ProgressCheckpoint, StoreError> {
        let checkpoint = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            let watermark = state.checkpoint.last_delivered_point_count;

            if packet.end() <= watermark {
                debug!("Packet #{} was already accounted for", packet.sequence);
                return Ok(state.checkpoint);
            }
            state.retired.insert(packet.offset, packet.end());

            let mut advanced = watermark;
            while let Some(end) = state.retired.remove(&advanced) {
                advanced = end;
            }
            if advanced == watermark {
                return Ok(state.checkpoint);
            }
            state.checkpoint.last_delivered_point_count = advanced;
            state.checkpoint
        };

        let shared = Arc::clone(&self.saved);
        task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut saved = lock(&*shared);
            if checkpoint.last_delivered_point_count <= saved.saved {
                return Ok(());
            }
            saved.store.save(&checkpoint)?;
            saved.saved = checkpoint.last_delivered_point_count;
            Ok(())
        })
        .await??;

        Ok(checkpoint)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        lock(&self.state).retired.clear();
        lock(&*self.saved).store.clear()
    }
}
