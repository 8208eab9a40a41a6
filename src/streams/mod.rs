//! Sequential byte sources feeding the demuxer.

pub mod file;
pub mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::errors::ExtractorResult;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A supplier of consecutive byte chunks with arbitrary boundaries.
#[async_trait]
pub trait ByteSource: Send {
    /// Next chunk, or `None` at end of input.
    async fn next_chunk(&mut self) -> ExtractorResult<Option<Bytes>>;

    /// Total size when known up front.
    fn content_length(&self) -> Option<u64> {
        None
    }

    fn print_stats(&self) {}
}

/// In-memory source handing out fixed-size chunks.
pub struct MemorySource {
    chunks: VecDeque<Bytes>,
    length: u64,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        let data: Bytes = data.into();
        let length = data.len() as u64;
        let chunk_size = chunk_size.max(1);
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
            .collect();
        Self { chunks, length }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn next_chunk(&mut self) -> ExtractorResult<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }
}

/// Reads a source on a background task, at most `max_pending_chunks` ahead
/// of the consumer.
pub struct PrefetchSource {
    rx: mpsc::Receiver<ExtractorResult<Bytes>>,
    task: JoinHandle<()>,
    length: Option<u64>,
}

impl PrefetchSource {
    pub fn spawn(mut source: Box<dyn ByteSource>, max_pending_chunks: usize) -> Self {
        let (tx, rx) = mpsc::channel(max_pending_chunks.max(1));
        let length = source.content_length();
        let task = tokio::spawn(async move {
            loop {
                match source.next_chunk().await {
                    Ok(Some(chunk)) => {
                        if tx.send(Ok(chunk)).await.is_err() {
                            debug!("prefetch consumer gone");
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
            source.print_stats();
        });
        Self { rx, task, length }
    }
}

#[async_trait]
impl ByteSource for PrefetchSource {
    async fn next_chunk(&mut self) -> ExtractorResult<Option<Bytes>> {
        match self.rx.recv().await {
            Some(chunk) => chunk.map(Some),
            None => Ok(None),
        }
    }

    fn content_length(&self) -> Option<u64> {
        self.length
    }
}

impl Drop for PrefetchSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}
