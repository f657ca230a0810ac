//! Hashing stream copier
//!
//! Copies a byte stream into a sink in bounded chunks while folding every
//! chunk into a SHA-256 digest.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::types::{ContentDigest, COPY_CHUNK_SIZE};

/// Copy `source` into `sink`, returning the digest and length of the copied
/// bytes.
///
/// Fails on the first read or write error. Whatever already reached the sink
/// is left there for the caller to discard.
pub async fn copy_hashing<R, W>(source: &mut R, sink: &mut W) -> std::io::Result<(ContentDigest, u64)>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    let digest: [u8; 32] = hasher.finalize().into();
    Ok((ContentDigest::from_bytes(digest), total))
}

/// Compute the SHA-256 hex digest of in-memory data
pub fn compute_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Reader that yields `data` and then fails
    pub(crate) struct FailingReader {
        data: Vec<u8>,
        served: bool,
    }

    impl FailingReader {
        pub(crate) fn new(data: &[u8]) -> Self {
            Self {
                data: data.to_vec(),
                served: false,
            }
        }
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.served {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                )));
            }
            self.served = true;
            buf.put_slice(&self.data);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_copy_matches_in_memory_hash() {
        let data = b"hello, world\nthis is log test\n";
        let mut sink = Vec::new();

        let (digest, count) = copy_hashing(&mut &data[..], &mut sink).await.unwrap();

        assert_eq!(sink, data);
        assert_eq!(count, data.len() as u64);
        assert_eq!(digest.to_hex(), compute_hash(data));
    }

    #[tokio::test]
    async fn test_copy_spans_multiple_chunks() {
        let data: Vec<u8> = (0..COPY_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let mut sink = Vec::new();

        let (digest, count) = copy_hashing(&mut data.as_slice(), &mut sink).await.unwrap();

        assert_eq!(count, data.len() as u64);
        assert_eq!(sink, data);
        assert_eq!(digest.to_hex(), compute_hash(&data));
    }

    #[tokio::test]
    async fn test_copy_empty_stream() {
        let mut sink = Vec::new();
        let (digest, count) = copy_hashing(&mut &b""[..], &mut sink).await.unwrap();

        assert_eq!(count, 0);
        assert_eq!(
            digest.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_copy_propagates_read_error() {
        let mut source = FailingReader::new(b"partial");
        let mut sink = Vec::new();

        let err = copy_hashing(&mut source, &mut sink).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(sink, b"partial");
    }
}
