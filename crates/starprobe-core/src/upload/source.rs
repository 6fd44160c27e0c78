// # Chunk Sources
//
// Defines the raw byte-stream handle the upload consumer reads from.
//
// The boundary layer hands the core "something that can be read in bounded
// chunks until exhausted", never a decoded body. Two adapters cover the
// common shapes:
//
// - [`StreamChunkSource`]: a `Stream` of `Bytes` frames (HTTP bodies)
// - [`ReaderChunkSource`]: anything implementing `AsyncRead`

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_stream::{Stream, StreamExt};

use crate::Result;

/// A raw inbound byte stream, read one bounded chunk at a time
///
/// Implementations must not buffer more than one underlying frame (or one
/// `max_len` read) at a time.
#[async_trait]
pub trait ChunkSource: Send {
    /// Read the next chunk of at most `max_len` bytes
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: a non-empty chunk, `bytes.len() <= max_len`
    /// - `Ok(None)`: the stream signalled end of data
    /// - `Err(Error)`: transport-level failure while reading
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>>;
}

/// Chunk source over a stream of byte frames
///
/// Frames larger than `max_len` are split without copying.
pub struct StreamChunkSource<S> {
    inner: S,
    pending: Bytes,
}

impl<S> StreamChunkSource<S> {
    /// Wrap a frame stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: Bytes::new(),
        }
    }
}

#[async_trait]
impl<S, E> ChunkSource for StreamChunkSource<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let max_len = max_len.max(1);

        while self.pending.is_empty() {
            match self.inner.next().await {
                Some(Ok(frame)) => self.pending = frame,
                Some(Err(e)) => return Err(std::io::Error::other(e).into()),
                None => return Ok(None),
            }
        }

        let take = self.pending.len().min(max_len);
        Ok(Some(self.pending.split_to(take)))
    }
}

/// Chunk source over an `AsyncRead`
///
/// Reuses one read buffer; the allocation is reclaimed once the previous
/// chunk has been dropped.
pub struct ReaderChunkSource<R> {
    reader: R,
    buf: BytesMut,
}

impl<R> ReaderChunkSource<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: BytesMut::new(),
        }
    }
}

#[async_trait]
impl<R> ChunkSource for ReaderChunkSource<R>
where
    R: AsyncRead + Send + Unpin,
{
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let max_len = max_len.max(1);

        self.buf.clear();
        self.buf.resize(max_len, 0);

        let n = self.reader.read(&mut self.buf[..]).await?;
        if n == 0 {
            return Ok(None);
        }

        Ok(Some(self.buf.split_to(n).freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_source_splits_large_frames() {
        let frames = vec![
            Ok::<_, std::io::Error>(Bytes::from(vec![7u8; 200_000])),
            Ok(Bytes::from_static(b"tail")),
        ];
        let mut source = StreamChunkSource::new(tokio_stream::iter(frames));

        let mut sizes = Vec::new();
        while let Some(chunk) = source.next_chunk(65536).await.unwrap() {
            sizes.push(chunk.len());
        }

        assert_eq!(sizes, vec![65536, 65536, 65536, 3392, 4]);
    }

    #[tokio::test]
    async fn test_stream_source_skips_empty_frames() {
        let frames = vec![
            Ok::<_, std::io::Error>(Bytes::new()),
            Ok(Bytes::from_static(b"abc")),
            Ok(Bytes::new()),
        ];
        let mut source = StreamChunkSource::new(tokio_stream::iter(frames));

        assert_eq!(source.next_chunk(16).await.unwrap(), Some(Bytes::from_static(b"abc")));
        assert_eq!(source.next_chunk(16).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stream_source_surfaces_transport_errors() {
        let frames = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut source = StreamChunkSource::new(tokio_stream::iter(frames));

        assert!(source.next_chunk(16).await.unwrap().is_some());
        assert!(source.next_chunk(16).await.is_err());
    }

    #[tokio::test]
    async fn test_reader_source_bounds_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(&[1u8; 100])
            .read(&[2u8; 30])
            .build();
        let mut source = ReaderChunkSource::new(reader);

        let mut sizes = Vec::new();
        while let Some(chunk) = source.next_chunk(64).await.unwrap() {
            assert!(chunk.len() <= 64);
            sizes.push(chunk.len());
        }

        assert_eq!(sizes.iter().sum::<usize>(), 130);
        assert_eq!(sizes, vec![64, 36, 30]);
    }
}
