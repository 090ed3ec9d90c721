//! Unix domain socket transport

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};
use vfprint_core::{constants::DEFAULT_CONNECT_TIMEOUT_MS, FrameCodec, VirtualFrame};

use crate::{error::*, Transport};

/// Driver side of the virtual device channel
pub struct UnixTransport {
    path: PathBuf,
    stream: Option<UnixStream>,
    codec: FrameCodec,
    read_buf: BytesMut,
    connect_timeout: Duration,
}

impl UnixTransport {
    /// Create new transport for the socket at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
            codec: FrameCodec::new(),
            read_buf: BytesMut::with_capacity(4096),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the frame codec (e.g. for a different image size limit)
    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Connecting to {}...", self.path.display());

        let stream = timeout(self.connect_timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => Error::Unreachable {
                    path: self.path.display().to_string(),
                    source: e,
                },
                _ => Error::Io(e),
            })?;

        debug!("Connected to {}", self.path.display());

        self.read_buf.clear();
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            debug!("Disconnecting from {}...", self.remote_addr());

            // Graceful shutdown
            let _ = stream.shutdown().await;
        }

        self.read_buf.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn receive(&mut self) -> Result<VirtualFrame> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        loop {
            // A malformed header is consumed by the codec, so later
            // frames in the buffer stay readable after this error.
            if let Some(frame) = self.codec.decode(&mut self.read_buf)? {
                trace!("Received {}", frame);
                return Ok(frame);
            }

            let n = stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }

            trace!("Received {} bytes ({} buffered)", n, self.read_buf.len());
        }
    }

    fn remote_addr(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for UnixTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Unix transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::VirtualHardware;
    use pretty_assertions::assert_eq;
    use vfprint_core::RetryCode;
    use vfprint_types::Image;

    #[tokio::test]
    async fn test_unix_transport_create() {
        let transport = UnixTransport::new("/tmp/vfprint-none.sock");
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "/tmp/vfprint-none.sock");
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = UnixTransport::new(dir.path().join("missing.sock"))
            .with_connect_timeout(Duration::from_millis(100));

        let result = transport.connect().await;
        assert!(matches!(result, Err(Error::Unreachable { .. })));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_receive_not_connected() {
        let mut transport = UnixTransport::new("/tmp/vfprint-none.sock");
        assert!(matches!(transport.receive().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_receive_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let hardware = VirtualHardware::bind(dir.path().join("dev.sock")).unwrap();
        let mut transport = UnixTransport::new(hardware.path());

        transport.connect().await.unwrap();
        let mut link = hardware.accept().await.unwrap();

        let image = Image::new(8, 4, vec![0x5A; 32]).unwrap();
        link.send_finger_report(true).await.unwrap();
        link.send_image(image.clone()).await.unwrap();
        link.send_retry(RetryCode::TooShort).await.unwrap();

        assert_eq!(transport.receive().await.unwrap(), VirtualFrame::FingerReport(true));
        assert_eq!(transport.receive().await.unwrap(), VirtualFrame::Image(image));
        assert_eq!(
            transport.receive().await.unwrap(),
            VirtualFrame::Retry(RetryCode::TooShort)
        );

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_then_valid() {
        let dir = tempfile::tempdir().unwrap();
        let hardware = VirtualHardware::bind(dir.path().join("dev.sock")).unwrap();
        let mut transport = UnixTransport::new(hardware.path());

        transport.connect().await.unwrap();
        let mut link = hardware.accept().await.unwrap();

        link.send_raw_header(5, -2).await.unwrap();
        link.send_finger_automatic(false).await.unwrap();

        assert!(matches!(
            transport.receive().await,
            Err(Error::Malformed { first: 5, second: -2 })
        ));
        assert_eq!(
            transport.receive().await.unwrap(),
            VirtualFrame::FingerAutomatic(false)
        );

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_image_then_valid() {
        let dir = tempfile::tempdir().unwrap();
        let hardware = VirtualHardware::bind(dir.path().join("dev.sock")).unwrap();
        let mut transport =
            UnixTransport::new(hardware.path()).with_codec(FrameCodec::with_max_image_pixels(16));

        transport.connect().await.unwrap();
        let mut link = hardware.accept().await.unwrap();

        link.send_image(Image::new(8, 8, vec![0x41; 64]).unwrap()).await.unwrap();
        link.send_retry(RetryCode::TooShort).await.unwrap();

        assert!(matches!(
            transport.receive().await,
            Err(Error::Malformed { first: 8, second: 8 })
        ));
        assert_eq!(
            transport.receive().await.unwrap(),
            VirtualFrame::Retry(RetryCode::TooShort)
        );

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close() {
        let dir = tempfile::tempdir().unwrap();
        let hardware = VirtualHardware::bind(dir.path().join("dev.sock")).unwrap();
        let mut transport = UnixTransport::new(hardware.path());

        transport.connect().await.unwrap();
        let link = hardware.accept().await.unwrap();
        link.close().await.unwrap();

        assert!(matches!(transport.receive().await, Err(Error::ConnectionClosed)));
        transport.disconnect().await.unwrap();
    }
}
