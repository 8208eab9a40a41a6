use super::ByteSource;
use crate::errors::{ExtractorError, ExtractorResult, StreamError};
use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Response};

/// Streams an HTTP response body chunk by chunk.
pub struct HttpSource {
    url: String,
    response: Response,
    length: Option<u64>,
    chunks_received: u64,
    bytes_read: u64,
}

impl HttpSource {
    pub async fn new(url: String, timeout_secs: u64) -> ExtractorResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StreamError::new(e.to_string()))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtractorError::Stream(StreamError::new(format!(
                "HTTP error: {}",
                response.status()
            ))));
        }

        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        Ok(Self {
            url,
            response,
            length,
            chunks_received: 0,
            bytes_read: 0,
        })
    }

    /// Body chunks handed out so far.
    pub fn chunks_received(&self) -> u64 {
        self.chunks_received
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn next_chunk(&mut self) -> ExtractorResult<Option<Bytes>> {
        let chunk = self
            .response
            .chunk()
            .await
            .map_err(|e| StreamError::new(format!("{}: {}", self.url, e)))?;
        if let Some(chunk) = &chunk {
            self.chunks_received += 1;
            self.bytes_read += chunk.len() as u64;
        }
        Ok(chunk)
    }

    fn content_length(&self) -> Option<u64> {
        self.length
    }

    fn print_stats(&self) {
        info!("📊 Download Statistics:");
        info!("   🔢 Body chunks: {}", self.chunks_received);
        info!(
            "   📥 Total Downloaded: {} bytes ({:.2} KB, {:.2} MB)",
            self.bytes_read,
            self.bytes_read as f64 / 1024.0,
            self.bytes_read as f64 / 1024.0 / 1024.0
        );
        if let Some(length) = self.length {
            let percentage = (self.bytes_read as f64 / length as f64) * 100.0;
            info!("   📊 Downloaded: {:.2}% of total file", percentage);
        }
    }
}
