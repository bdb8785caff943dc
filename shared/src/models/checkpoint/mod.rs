use serde::{Deserialize, Serialize};

use crate::source::Anchor;

/// Durable record of how far a run has progressed.
///
/// `last_delivered_point_count` only ever grows during a run; points below it are never
/// handed out again after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCheckpoint {
    pub last_delivered_point_count: u64,
    pub anchor_x: u32,
    pub anchor_y: u32,
}

impl ProgressCheckpoint {
    pub fn new(anchor: Anchor) -> Self {
        Self {
            last_delivered_point_count: 0,
            anchor_x: anchor.x,
            anchor_y: anchor.y,
        }
    }

    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.anchor_x, self.anchor_y)
    }
}
