//! Recognition backend abstractions
//!
//! A session talks to the speech-recognition service only through these types:
//! - `RecognitionBackend` opens upstream streams
//! - `RecognitionStream` is the write/close handle of one stream
//! - `StreamEvent` is the single event channel a stream reports on
//! - `RecognitionConfig` is the static request configuration sent on open

mod config;
mod stream;

pub use self::config::{RecognitionConfig, RecognitionMetadata};
pub use stream::{
    ErrorInfo, OpenedStream, RecognitionBackend, RecognitionStream, ResultEvent, StreamEvent,
};
