use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{message::Message, point::Point};

/// An ordered, bounded run of points handed to one worker as a unit.
///
/// `sequence` is the packet's index within the run and `offset` the index of its first
/// point in the source, so `offset..offset + len` is the slice of the source it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPacket {
    pub sequence: u64,
    pub offset: u64,
    pub points: Vec<Point>,
}

impl WorkPacket {
    pub fn new(sequence: u64, offset: u64, points: Vec<Point>) -> Self {
        Self {
            sequence,
            offset,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index one past the last source point this packet covers.
    pub fn end(&self) -> u64 {
        self.offset + self.points.len() as u64
    }
}

impl Message for WorkPacket {
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        let wrapped = serde_json::json!({ "WorkPacket": self });
        serde_json::to_value(&wrapped)
    }

    fn from_json(message: &str) -> Result<Self, serde_json::Error> {
        let mut v: Value = serde_json::from_str(message)?;
        let inner = v.get_mut("WorkPacket").map(Value::take).unwrap_or(Value::Null);
        serde_json::from_value(inner)
    }
}
