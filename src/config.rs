use crate::recognition::RecognitionConfig;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable prefix, e.g. `LOQA_GATEWAY__SERVICE__HTTP__PORT=9000`
const ENV_PREFIX: &str = "LOQA_GATEWAY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub retry: RetryConfig,
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Messages buffered per connection before new ones are dropped
    pub outbound_queue: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    pub audio_subject_prefix: String,
    pub result_subject_prefix: String,
    pub error_subject_prefix: String,
    pub control_subject_prefix: String,
    /// Capacity of each stream's event channel
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-speech-gateway".to_string(),
            http: HttpConfig::default(),
            outbound_queue: 256,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            audio_subject_prefix: "stt.audio".to_string(),
            result_subject_prefix: "stt.result".to_string(),
            error_subject_prefix: "stt.error".to_string(),
            control_subject_prefix: "stt.control".to_string(),
            event_buffer: 64,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Config {
    /// Load configuration from an optional file plus `LOQA_GATEWAY__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.http.port == 0 {
            bail!("service.http.port must be non-zero");
        }

        let prefixes = [
            ("nats.audio_subject_prefix", &self.nats.audio_subject_prefix),
            ("nats.result_subject_prefix", &self.nats.result_subject_prefix),
            ("nats.error_subject_prefix", &self.nats.error_subject_prefix),
            ("nats.control_subject_prefix", &self.nats.control_subject_prefix),
        ];
        for (key, prefix) in prefixes {
            if prefix.is_empty() {
                bail!("{} must not be empty", key);
            }
        }

        if self.service.outbound_queue == 0 {
            bail!("service.outbound_queue must be at least 1");
        }
        if self.nats.event_buffer == 0 {
            bail!("nats.event_buffer must be at least 1");
        }
        if self.recognition.sample_rate_hertz == 0 {
            bail!("recognition.sample_rate_hertz must be non-zero");
        }
        if self.recognition.language_code.is_empty() {
            bail!("recognition.language_code must not be empty");
        }

        Ok(())
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
