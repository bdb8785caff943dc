use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value that travels between coordinator and worker as one JSON frame.
pub trait Message: Sized {
    fn to_json(&self) -> Result<Value, serde_json::Error>;

    fn from_json(message: &str) -> Result<Self, serde_json::Error>;
}

/// The two tokens a worker answers a packet with: receipt, then completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Receipt {
    Ack,
    Done,
}

impl Message for Receipt {
    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn from_json(message: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(message)
    }
}
