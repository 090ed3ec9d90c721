//! In-memory transport
//!
//! Frames queued through a [`MockHandle`] are delivered by
//! [`MockTransport::receive`] in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;
use vfprint_core::VirtualFrame;

use crate::{error::*, Transport};

#[derive(Debug, Default)]
struct Shared {
    unreachable: AtomicBool,
    connects: Mutex<usize>,
}

/// Driver side of an in-memory channel
#[derive(Debug)]
pub struct MockTransport {
    rx: mpsc::UnboundedReceiver<Result<VirtualFrame>>,
    shared: Arc<Shared>,
    connected: bool,
}

/// Test side of an in-memory channel
#[derive(Debug, Clone)]
pub struct MockHandle {
    tx: mpsc::UnboundedSender<Result<VirtualFrame>>,
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a connected pair
    pub fn pair() -> (Self, MockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        (
            Self {
                rx,
                shared: shared.clone(),
                connected: false,
            },
            MockHandle { tx, shared },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }
        if self.shared.unreachable.load(Ordering::Acquire) {
            return Err(Error::Unreachable {
                path: self.remote_addr(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }
        *self.shared.connects.lock() += 1;
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn receive(&mut self) -> Result<VirtualFrame> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let frame = self.rx.recv().await.unwrap_or(Err(Error::ConnectionClosed))?;
        trace!("Mock received {}", frame);
        Ok(frame)
    }

    fn remote_addr(&self) -> String {
        "mock".to_string()
    }
}

impl MockHandle {
    /// Queue a frame for the driver
    pub fn push(&self, frame: VirtualFrame) {
        let _ = self.tx.send(Ok(frame));
    }

    /// Queue a receive failure for the driver
    pub fn push_error(&self, error: Error) {
        let _ = self.tx.send(Err(error));
    }

    /// Make subsequent connects fail with `Unreachable`
    pub fn set_unreachable(&self, unreachable: bool) {
        self.shared.unreachable.store(unreachable, Ordering::Release);
    }

    /// Number of successful connects
    pub fn connects(&self) -> usize {
        *self.shared.connects.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_mock_delivers_in_order() {
        let (mut transport, handle) = MockTransport::pair();
        transport.connect().await.unwrap();

        handle.push(VirtualFrame::FingerReport(true));
        handle.push(VirtualFrame::FingerReport(false));

        assert_eq!(transport.receive().await.unwrap(), VirtualFrame::FingerReport(true));
        assert_eq!(transport.receive().await.unwrap(), VirtualFrame::FingerReport(false));
        assert_eq!(handle.connects(), 1);
    }

    #[tokio::test]
    async fn test_mock_unreachable() {
        let (mut transport, handle) = MockTransport::pair();
        handle.set_unreachable(true);
        assert!(matches!(transport.connect().await, Err(Error::Unreachable { .. })));
        assert_eq!(handle.connects(), 0);
    }

    #[tokio::test]
    async fn test_mock_closed() {
        let (mut transport, handle) = MockTransport::pair();
        transport.connect().await.unwrap();
        drop(handle);
        assert!(matches!(transport.receive().await, Err(Error::ConnectionClosed)));
    }
}
