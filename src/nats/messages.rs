use crate::recognition::RecognitionConfig;
use serde::{Deserialize, Serialize};

/// Opens a recognition stream on the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamStartMessage {
    pub stream_id: String,
    pub config: RecognitionConfig,
    pub timestamp: String, // RFC3339 timestamp
}

/// Audio chunk published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub stream_id: String,
    pub sequence: u64,
    pub audio: String, // Base64-encoded audio bytes
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Stream failure reported by the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamErrorMessage {
    #[serde(default)]
    pub stream_id: Option<String>,
    pub message: String,
}
