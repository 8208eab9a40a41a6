use super::ByteSource;
use crate::errors::ExtractorResult;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_SIZE: usize = 64 * 1024;

/// Local file read front to back.
pub struct FileSource {
    file: File,
    length: u64,
}

impl FileSource {
    pub async fn open<P: AsRef<Path>>(path: P) -> ExtractorResult<Self> {
        let file = File::open(path).await?;
        let length = file.metadata().await?.len();
        Ok(Self { file, length })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn next_chunk(&mut self) -> ExtractorResult<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(READ_SIZE);
        let read = self.file.read_buf(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        let mut source = FileSource::open(file.path()).await.unwrap();
        assert_eq!(source.content_length(), Some(data.len() as u64));
        let mut read = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            assert!(chunk.len() <= READ_SIZE);
            read.extend_from_slice(&chunk);
        }
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_missing_file() {
        assert!(FileSource::open("/nonexistent/clip.mp4").await.is_err());
    }
}
