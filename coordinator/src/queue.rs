//! The shared hand-out queue of pending packets.
//!
//! A packet taken from the queue is "in flight" until the connection that took it either
//! retires it (the worker finished it) or requeues it (anything else). Requeued packets
//! go to the back so a flaky worker cannot starve the others.
//!
//! A packet whose lease expired is requeued while its first holder may still finish it.
//! [`WorkQueue::settle_late`] records such a late completion so the copy is dropped
//! instead of being drawn again or blocking the drain.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::trace;
use shared::models::packet::WorkPacket;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no packet is pending")]
pub struct Empty;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<WorkPacket>,
    in_flight: usize,
    /// Sequences completed late whose copy is in flight elsewhere.
    settled: HashSet<u64>,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    changed: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, packet: WorkPacket) {
        self.lock().pending.push_back(packet);
        self.changed.notify_waiters();
    }

    /// Removes the head packet and marks it in flight.
    pub fn try_take(&self) -> Result<WorkPacket, Empty> {
        let mut state = self.lock();
        let packet = state.pending.pop_front().ok_or(Empty)?;
        state.in_flight += 1;
        trace!("Took packet #{} ({} in flight)", packet.sequence, state.in_flight);
        Ok(packet)
    }

    /// Puts an in-flight packet back at the tail after a failed or uncertain delivery.
    pub fn requeue(&self, packet: WorkPacket) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            if state.settled.remove(&packet.sequence) {
                trace!(
                    "Dropped settled packet #{} ({} in flight)",
                    packet.sequence,
                    state.in_flight
                );
            } else {
                trace!("Requeued packet #{} ({} in flight)", packet.sequence, state.in_flight);
                state.pending.push_back(packet);
            }
        }
        self.changed.notify_waiters();
    }

    /// Drops an in-flight packet for good once its worker reported completion.
    pub fn retire(&self, packet: &WorkPacket) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.settled.remove(&packet.sequence);
            trace!("Retired packet #{} ({} in flight)", packet.sequence, state.in_flight);
        }
        self.changed.notify_waiters();
    }

    /// Records that a packet finished after its lease expired and it was requeued.
    ///
    /// A copy still pending is removed. A copy already in flight elsewhere is dropped when
    /// that connection retires or requeues it.
    pub fn settle_late(&self, packet: &WorkPacket) {
        {
            let mut state = self.lock();
            let before = state.pending.len();
            state.pending.retain(|p| p.sequence != packet.sequence);
            if state.pending.len() == before {
                state.settled.insert(packet.sequence);
            }
            trace!("Settled packet #{} after its lease", packet.sequence);
        }
        self.changed.notify_waiters();
    }

    /// True once nothing is pending and nothing is in flight.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight == 0
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Waits for a packet to become available.
    ///
    /// While other connections still hold packets this keeps waiting, since any of them may
    /// be requeued. Returns `None` once the queue is drained.
    pub async fn next_packet(&self) -> Option<WorkPacket> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_take() {
                Ok(packet) => return Some(packet),
                Err(Empty) if self.is_drained() => return None,
                Err(Empty) => notified.await,
            }
        }
    }

    /// Resolves once the queue is drained.
    pub async fn drained(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }
}
