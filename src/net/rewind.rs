//! IO wrapper that replays already-consumed bytes.
//!
//! Classifying a connection consumes the request head off the socket
//! before any HTTP machinery runs. [`Rewind`] puts those bytes back in
//! front of the stream so the framing layer sees an untouched
//! connection.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Stream adapter yielding a prefix buffer before the inner stream.
#[derive(Debug)]
pub struct Rewind<T> {
    pre: Option<Bytes>,
    inner: T,
}

impl<T> Rewind<T> {
    /// Wrap `inner`, serving `pre` first on reads.
    pub fn new(pre: Bytes, inner: T) -> Self {
        let pre = if pre.is_empty() { None } else { Some(pre) };
        Self { pre, inner }
    }
}

impl<T> AsyncRead for Rewind<T>
where
    T: AsyncRead + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(mut pre) = self.pre.take() {
            let copy_len = std::cmp::min(pre.len(), buf.remaining());
            buf.put_slice(&pre[..copy_len]);
            pre.advance(copy_len);
            if !pre.is_empty() {
                self.pre = Some(pre);
            }
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T> AsyncWrite for Rewind<T>
where
    T: AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn replays_prefix_before_inner_stream() {
        let (mut writer, reader) = tokio::io::duplex(256);
        writer.write_all(b" world").await.unwrap();
        drop(writer);

        let mut rewound = Rewind::new(Bytes::from_static(b"hello"), reader);
        let mut out = Vec::new();
        rewound.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn serves_prefix_across_small_reads() {
        let (writer, reader) = tokio::io::duplex(256);
        drop(writer);

        let mut rewound = Rewind::new(Bytes::from_static(b"abcdef"), reader);
        let mut buf = [0u8; 4];

        let n = rewound.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"abcd");
        let n = rewound.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");
        assert_eq!(rewound.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_prefix_is_transparent() {
        let (mut writer, reader) = tokio::io::duplex(256);
        writer.write_all(b"direct").await.unwrap();
        drop(writer);

        let mut rewound = Rewind::new(Bytes::new(), reader);
        let mut out = Vec::new();
        rewound.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"direct");
    }

    #[tokio::test]
    async fn writes_pass_through() {
        let (client, mut server) = tokio::io::duplex(256);

        let mut rewound = Rewind::new(Bytes::from_static(b"ignored"), client);
        rewound.write_all(b"ping").await.unwrap();
        rewound.flush().await.unwrap();

        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }
}
