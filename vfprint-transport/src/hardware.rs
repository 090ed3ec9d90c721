//! Simulated hardware side of the channel
//!
//! The harness binds a [`VirtualHardware`] listener at the socket path the
//! driver will connect to, accepts the driver's connection and then pushes
//! frames through the resulting [`HardwareLink`].

use std::path::{Path, PathBuf};

use futures::SinkExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, trace, warn};
use vfprint_core::{
    constants::env, DeviceErrorCode, FrameCodec, RetryCode, VirtualFrame,
};
use vfprint_types::Image;

use crate::error::*;

/// Listening socket of the simulated device
#[derive(Debug)]
pub struct VirtualHardware {
    path: PathBuf,
    listener: UnixListener,
}

impl VirtualHardware {
    /// Bind a listener at `path`, replacing a stale socket file
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            debug!("Removing stale socket {}", path.display());
            std::fs::remove_file(&path)?;
        }

        let listener = UnixListener::bind(&path)?;
        info!("Virtual device listening on {}", path.display());

        Ok(Self { path, listener })
    }

    /// Bind at the path named by `FP_VIRTUAL_IMAGE`
    pub fn bind_from_env() -> Result<Self> {
        let path = std::env::var_os(env::VIRTUAL_IMAGE)
            .ok_or_else(|| Error::InvalidAddress(format!("{} is not set", env::VIRTUAL_IMAGE)))?;
        Self::bind(PathBuf::from(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the driver to connect
    pub async fn accept(&self) -> Result<HardwareLink> {
        let (stream, _) = self.listener.accept().await?;
        debug!("Driver connected to {}", self.path.display());
        Ok(HardwareLink::new(stream))
    }
}

impl Drop for VirtualHardware {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove socket {}: {}", self.path.display(), e);
        }
    }
}

/// One accepted driver connection, used to push frames
#[derive(Debug)]
pub struct HardwareLink {
    framed: FramedWrite<UnixStream, FrameCodec>,
}

impl HardwareLink {
    fn new(stream: UnixStream) -> Self {
        Self {
            framed: FramedWrite::new(stream, FrameCodec::new()),
        }
    }

    /// Send a frame and flush it to the socket
    pub async fn send(&mut self, frame: VirtualFrame) -> Result<()> {
        trace!("Hardware sending {}", frame);
        self.framed.send(frame).await?;
        Ok(())
    }

    pub async fn send_image(&mut self, image: Image) -> Result<()> {
        self.send(VirtualFrame::Image(image)).await
    }

    pub async fn send_retry(&mut self, code: RetryCode) -> Result<()> {
        self.send(VirtualFrame::Retry(code)).await
    }

    pub async fn send_error(&mut self, code: DeviceErrorCode) -> Result<()> {
        self.send(VirtualFrame::Error(code)).await
    }

    pub async fn send_finger_automatic(&mut self, enabled: bool) -> Result<()> {
        self.send(VirtualFrame::FingerAutomatic(enabled)).await
    }

    pub async fn send_finger_report(&mut self, present: bool) -> Result<()> {
        self.send(VirtualFrame::FingerReport(present)).await
    }

    /// Write bytes as-is, bypassing frame encoding
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.framed.flush().await?;
        trace!("Hardware sending {} raw bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        let stream = self.framed.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Write an arbitrary header pair with no payload
    pub async fn send_raw_header(&mut self, first: i32, second: i32) -> Result<()> {
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&first.to_ne_bytes());
        data[4..].copy_from_slice(&second.to_ne_bytes());
        self.send_raw(&data).await
    }

    /// Shut down the connection
    pub async fn close(mut self) -> Result<()> {
        self.framed.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_removes_socket_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.sock");

        let hardware = VirtualHardware::bind(&path).unwrap();
        assert!(path.exists());
        assert_eq!(hardware.path(), path.as_path());

        drop(hardware);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.sock");
        std::fs::write(&path, b"stale").unwrap();

        let hardware = VirtualHardware::bind(&path).unwrap();
        assert!(path.exists());
        drop(hardware);
    }
}
