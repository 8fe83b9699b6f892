use serde::{Deserialize, Serialize};

/// Recognition request configuration
///
/// Static per process: every upstream stream is opened with the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Audio encoding of the inbound chunks (e.g., "WEBM_OPUS", "LINEAR16")
    pub encoding: String,

    /// Sample rate of the inbound audio
    pub sample_rate_hertz: u32,

    /// BCP-47 language tag
    pub language_code: String,

    /// Recognition model name
    pub model: String,

    pub enable_automatic_punctuation: bool,
    pub enable_word_time_offsets: bool,
    pub enable_word_confidence: bool,
    pub use_enhanced: bool,

    /// Emit interim (non-final) results
    pub interim_results: bool,

    pub metadata: RecognitionMetadata,
}

/// Hints about the audio source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionMetadata {
    pub interaction_type: String,
    pub microphone_distance: String,
    pub original_media_type: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            encoding: "WEBM_OPUS".to_string(),
            sample_rate_hertz: 48000, // Browser MediaRecorder default
            language_code: "en-US".to_string(),
            model: "latest_long".to_string(),
            enable_automatic_punctuation: true,
            enable_word_time_offsets: true,
            enable_word_confidence: true,
            use_enhanced: true,
            interim_results: true,
            metadata: RecognitionMetadata::default(),
        }
    }
}

impl Default for RecognitionMetadata {
    fn default() -> Self {
        Self {
            interaction_type: "PRESENTATION".to_string(),
            microphone_distance: "NEARFIELD".to_string(),
            original_media_type: "AUDIO".to_string(),
        }
    }
}
