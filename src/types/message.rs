use crate::messaging::FrameType;
use crate::types::timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Server → client frame: `{type, data, timestamp}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl InboundFrame {
    pub fn new(frame_type: FrameType, data: serde_json::Value) -> Self {
        Self {
            frame_type,
            data,
            timestamp: None,
        }
    }
}

/// Client → server frame: `{type, timestamp}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub timestamp: String,
}

impl OutboundFrame {
    /// Liveness probe
    pub fn heartbeat() -> Self {
        Self {
            frame_type: FrameType::Heartbeat,
            timestamp: timestamp::format(&Utc::now()),
        }
    }
}
