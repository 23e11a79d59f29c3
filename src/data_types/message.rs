use serde::{Deserialize, Serialize};
use std::fmt;

use super::ViewportRange;

/// Identifier of one chart instance inside a sync group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartId(pub String);

impl ChartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChartId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ChartId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    RangeChange,
    RangeRequest,
    CrosshairMove,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum SyncPayload {
    RangeChange(ViewportRange),
    RangeRequest,
    /// `None` clears the highlight on every other chart.
    CrosshairMove { time: Option<f64> },
}

impl SyncPayload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::RangeChange(_) => MessageKind::RangeChange,
            Self::RangeRequest => MessageKind::RangeRequest,
            Self::CrosshairMove { .. } => MessageKind::CrosshairMove,
        }
    }
}

/// One message on the viewport bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub source_id: ChartId,
    pub sequence: u64,
    pub payload: SyncPayload,
}

impl SyncMessage {
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }
}
