//! Client configuration for compiling, submitting and streaming workflows.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_endpoint() -> String {
    "https://workflows.example.com/v1".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_connect_retries() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_max_line_bytes() -> usize {
    1024 * 1024
}

fn default_execution_timeout() -> Duration {
    Duration::from_secs(60 * 30)
}

/// Configuration for [`crate::transport::TransportClient`] and
/// [`crate::controller::ExecutionController`].
///
/// Mirrors the surface in spec.md §6: endpoint, credential, connection and
/// request timeouts, retry budget, and the streaming backpressure knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer credential sent as `Authorization: Bearer <credential>`.
    pub credential: String,

    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Number of connection attempts before giving up, including the first.
    #[serde(default = "default_max_connect_retries")]
    pub max_connect_retries: u32,

    /// Capacity of the bounded channel the stream parser delivers events on.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Maximum bytes buffered for a single unterminated line before it is
    /// reported as [`crate::stream::StreamError::LineTooLong`].
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Wall-clock budget for an entire execution, regardless of progress.
    #[serde(default = "default_execution_timeout", with = "duration_secs")]
    pub execution_timeout: Duration,

    /// Whether to ask the platform for native SSE framing
    /// (`native_sse=true`) rather than the default mixed framing.
    #[serde(default)]
    pub native_sse: bool,
}

impl ClientConfig {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            credential: credential.into(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_connect_retries: default_max_connect_retries(),
            event_channel_capacity: default_event_channel_capacity(),
            max_line_bytes: default_max_line_bytes(),
            execution_timeout: default_execution_timeout(),
            native_sse: false,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_connect_retries(mut self, retries: u32) -> Self {
        self.max_connect_retries = retries;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn with_max_line_bytes(mut self, bytes: usize) -> Self {
        self.max_line_bytes = bytes;
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn with_native_sse(mut self, native_sse: bool) -> Self {
        self.native_sse = native_sse;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ClientConfig::new("token");
        assert!(config.max_connect_retries >= 1);
        assert!(config.event_channel_capacity > 0);
        assert!(config.max_line_bytes > 0);
    }

    #[test]
    fn round_trips_through_json() {
        let config = ClientConfig::new("token").with_native_sse(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.credential, "token");
        assert!(back.native_sse);
    }
}
