use crate::errors::{ExtractorError, ExtractorResult};
use serde::{Deserialize, Serialize};

/// Tuning knobs for an extraction session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Capacity of the pending picture buffer filled by decode-ahead.
    pub max_pending_pictures: usize,
    /// Samples submitted per decode-ahead round before a flush.
    pub decode_batch: usize,
    /// Chunks a byte source may read ahead of ingestion.
    pub max_pending_chunks: usize,
    /// Timeout for HTTP byte sources, in seconds.
    pub http_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_pending_pictures: 32,
            decode_batch: 8,
            max_pending_chunks: 16,
            http_timeout_secs: 30,
        }
    }
}

impl ExtractorConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> ExtractorResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExtractorError::Io(std::io::Error::other(e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExtractorResult<()> {
        let zero = [
            ("max_pending_pictures", self.max_pending_pictures as u64),
            ("decode_batch", self.decode_batch as u64),
            ("max_pending_chunks", self.max_pending_chunks as u64),
            ("http_timeout_secs", self.http_timeout_secs),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        match zero {
            Some((name, _)) => Err(ExtractorError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} must be greater than zero", name),
            ))),
            None => Ok(()),
        }
    }
}
