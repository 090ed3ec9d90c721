//! High-level device interface

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use vfprint_core::{Action, DeviceErrorCode, Session, VirtualFrame};
use vfprint_transport::{Transport, UnixTransport};
use vfprint_types::{
    DeviceFeature, DeviceInfo, FingerStatusFlags, Image, MatchPayload, Print, ScanType,
};

use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::matcher::{GridMatcher, MatchEngine};

/// Progress of an enrollment, reported after every accepted capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollProgress {
    /// 1-based index of the completed stage
    pub stage: u32,
    pub nr_stages: u32,
}

impl EnrollProgress {
    pub fn is_last(&self) -> bool {
        self.stage == self.nr_stages
    }
}

/// Result of [`Device::verify`]
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub matched: bool,
    /// The captured print, carrying the scanned image
    pub print: Print,
}

/// Result of [`Device::identify`]
#[derive(Debug, Clone)]
pub struct IdentifyOutcome {
    /// Index into the gallery of the first matching print
    pub matched: Option<usize>,
    /// The captured print, carrying the scanned image
    pub print: Print,
}

impl IdentifyOutcome {
    /// The matching print within the gallery passed to identify
    pub fn matched_in<'a>(&self, gallery: &'a [Print]) -> Option<&'a Print> {
        self.matched.and_then(|index| gallery.get(index))
    }
}

/// Virtual image fingerprint device
///
/// Cheap to clone; clones share the same session and channel. At most one
/// capture, enroll, verify or identify may run at a time. Each of these
/// takes a [`CancellationToken`]; cancelling it ends the operation with
/// [`Error::Cancelled`].
///
/// # Examples
///
/// ```no_run
/// use vfprint::{CancellationToken, Device, DeviceConfig};
///
/// #[tokio::main]
/// async fn main() -> vfprint::Result<()> {
///     let device = Device::new(DeviceConfig::from_env()?);
///
///     device.open().await?;
///     println!("Opened {}", device.info());
///
///     let image = device.capture(true, &CancellationToken::new()).await?;
///     println!("Captured {}x{}", image.width(), image.height());
///
///     device.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    info: DeviceInfo,
    session: Session,
    transport: Mutex<Box<dyn Transport>>,
    matcher: Arc<dyn MatchEngine>,
}

impl Device {
    /// Create a device talking to the simulated hardware over a Unix socket
    pub fn new(config: DeviceConfig) -> Self {
        let transport = UnixTransport::new(config.socket_path.clone())
            .with_connect_timeout(config.connect_timeout);
        Self::with_parts(
            config.device_info(),
            Box::new(transport),
            Arc::new(GridMatcher::new()),
        )
    }

    /// Create a device from `FP_VIRTUAL_IMAGE`
    pub fn from_env() -> Result<Self> {
        let config = DeviceConfig::from_env()?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create a device from explicit parts
    pub fn with_parts(
        info: DeviceInfo,
        transport: Box<dyn Transport>,
        matcher: Arc<dyn MatchEngine>,
    ) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                info,
                session: Session::new(),
                transport: Mutex::new(transport),
                matcher,
            }),
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.inner.info
    }

    pub fn driver(&self) -> &str {
        &self.inner.info.driver
    }

    pub fn device_id(&self) -> &str {
        &self.inner.info.device_id
    }

    pub fn name(&self) -> &str {
        &self.inner.info.name
    }

    pub fn features(&self) -> DeviceFeature {
        self.inner.info.features
    }

    pub fn has_feature(&self, feature: DeviceFeature) -> bool {
        self.inner.info.has_feature(feature)
    }

    pub fn nr_enroll_stages(&self) -> u32 {
        self.inner.info.nr_enroll_stages
    }

    pub fn scan_type(&self) -> ScanType {
        self.inner.info.scan_type
    }

    /// Current finger status
    pub fn finger_status(&self) -> FingerStatusFlags {
        self.inner.session.finger_status()
    }

    /// Receiver notified on every finger status change
    pub fn finger_status_watch(&self) -> watch::Receiver<FingerStatusFlags> {
        self.inner.session.subscribe()
    }

    /// Check if open
    pub fn is_open(&self) -> bool {
        self.inner.session.is_open()
    }

    /// The outstanding operation, if any
    pub fn action(&self) -> Action {
        self.inner.session.action()
    }

    /// Open the device
    ///
    /// # Errors
    ///
    /// - `AlreadyOpen` if the device is open
    /// - `Busy` while another operation is outstanding
    /// - `General` (with [`ChannelError::Unreachable`](crate::ChannelError)
    ///   as source) if the simulated hardware is not listening
    pub async fn open(&self) -> Result<()> {
        let _guard = self.inner.session.begin_open()?;

        info!("Opening {}...", self.inner.info);

        let mut transport = self.inner.transport.lock().await;
        transport.connect().await?;
        self.inner.session.set_open();

        info!("Opened {} via {}", self.inner.info, transport.remote_addr());
        Ok(())
    }

    /// Close the device
    ///
    /// Fails with `Busy` while an operation is outstanding, including one
    /// whose cancellation has been requested but not yet processed.
    pub async fn close(&self) -> Result<()> {
        let _guard = self.inner.session.begin_close()?;

        info!("Closing {}...", self.inner.info);

        let mut transport = self.inner.transport.lock().await;
        let result = transport.disconnect().await;
        self.inner.session.set_closed();
        result?;

        info!("Closed");
        Ok(())
    }

    /// Prepare for system suspend
    ///
    /// Allowed whether or not the device is open. An outstanding operation
    /// completes with `Busy` before this returns; until [`resume`](Self::resume)
    /// every open, close and capture-family call fails with `Busy`.
    /// Suspending twice is `Busy`.
    pub async fn suspend(&self) -> Result<()> {
        let outstanding = self.inner.session.suspend()?;
        info!("Suspending {}...", self.inner.info);

        if outstanding != Action::None {
            debug!("Abandoning {} for suspend", outstanding);
        }
        // The outstanding operation holds the channel until it has ended
        drop(self.inner.transport.lock().await);

        info!("Suspended");
        Ok(())
    }

    /// Resume after [`suspend`](Self::suspend); `Busy` if not suspended
    pub async fn resume(&self) -> Result<()> {
        self.inner.session.resume()?;
        info!("Resumed {}", self.inner.info);
        Ok(())
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.session.is_suspended()
    }

    /// Wait until the finger status contains all of `flags`
    ///
    /// Returns the status that satisfied the wait. The timer is dropped on
    /// whichever path completes first.
    pub async fn wait_for_finger_status(
        &self,
        flags: FingerStatusFlags,
        timeout: Duration,
    ) -> Result<FingerStatusFlags> {
        let mut rx = self.inner.session.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(|status| status.contains(flags))
                .await
                .map(|status| *status)
        })
        .await;

        match waited {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(_)) => Err(Error::device(DeviceErrorCode::Removed)),
            Err(_) => Err(Error::Timeout {
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Capture one image
    ///
    /// Image devices only capture once a finger is present, so
    /// `wait_for_finger == false` is `NotSupported`.
    pub async fn capture(
        &self,
        wait_for_finger: bool,
        cancel: &CancellationToken,
    ) -> Result<Image> {
        let guard = self.begin(Action::Capture, DeviceFeature::CAPTURE, cancel)?;
        if !wait_for_finger {
            return Err(Error::device(DeviceErrorCode::NotSupported));
        }

        debug!("Capturing image...");

        let mut transport = self.inner.transport.lock().await;
        let image = self.await_image(transport.as_mut(), cancel).await?;
        drop(guard);

        debug!("Captured {:?}", image);
        Ok(image)
    }

    /// Enroll a print
    ///
    /// Runs [`nr_enroll_stages`](Self::nr_enroll_stages) captures, calling
    /// `on_progress` after each. The returned print keeps `template`'s
    /// metadata and carries no image.
    ///
    /// A `template` that already holds matching data is updated rather
    /// than replaced; this needs `UPDATE_PRINT` and a print from this
    /// device, otherwise it fails with `DataInvalid`.
    pub async fn enroll<F>(
        &self,
        template: Print,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Print>
    where
        F: FnMut(EnrollProgress) + Send,
    {
        let guard = self.begin(Action::Enroll { stage: 1 }, DeviceFeature::empty(), cancel)?;

        let mut payload = template.payload().cloned();
        if payload.is_some() {
            if !self.has_feature(DeviceFeature::UPDATE_PRINT) {
                return Err(Error::device(DeviceErrorCode::DataInvalid));
            }
            if !template.compatible(&self.inner.info) {
                debug!(
                    "Refusing to update print from {}/{}",
                    template.driver(),
                    template.device_id()
                );
                return Err(Error::device(DeviceErrorCode::DataInvalid));
            }
        }

        let nr_stages = self.nr_enroll_stages();
        if nr_stages == 0 {
            return Err(Error::device(DeviceErrorCode::DataInvalid));
        }
        debug!(
            "Enrolling {} in {} stages{}...",
            template.finger(),
            nr_stages,
            if payload.is_some() { " (update)" } else { "" }
        );

        let mut transport = self.inner.transport.lock().await;
        for stage in 1..=nr_stages {
            self.inner.session.set_enroll_stage(stage)?;

            let image = self.await_image(transport.as_mut(), cancel).await?;
            payload = Some(self.inner.matcher.enroll_accumulate(payload.take(), &image)?);

            trace!("Enroll stage {}/{} accepted", stage, nr_stages);
            on_progress(EnrollProgress { stage, nr_stages });
        }
        drop(transport);
        drop(guard);

        let print = template
            .to_builder()
            .device(&self.inner.info)
            .image(None)
            .payload(payload)
            .build();

        debug!("Enrolled {}", print);
        Ok(print)
    }

    /// Capture once and compare against `template`
    pub async fn verify(
        &self,
        template: &Print,
        cancel: &CancellationToken,
    ) -> Result<VerifyOutcome> {
        let guard = self.begin(Action::Verify, DeviceFeature::VERIFY, cancel)?;
        let payload = template
            .payload()
            .ok_or_else(|| Error::device(DeviceErrorCode::DataInvalid))?;

        debug!("Verifying against {}...", template);

        let mut transport = self.inner.transport.lock().await;
        let image = self.await_image(transport.as_mut(), cancel).await?;
        let matched = self.inner.matcher.verify(payload, &image)?;
        drop(transport);
        drop(guard);

        debug!("Verify {}", if matched { "matched" } else { "did not match" });
        Ok(VerifyOutcome {
            matched,
            print: self.scanned_print(image),
        })
    }

    /// Capture once and search `gallery` in order
    pub async fn identify(
        &self,
        gallery: &[Print],
        cancel: &CancellationToken,
    ) -> Result<IdentifyOutcome> {
        let guard = self.begin(Action::Identify, DeviceFeature::IDENTIFY, cancel)?;
        let payloads = gallery
            .iter()
            .map(|print| print.payload().cloned())
            .collect::<Option<Vec<MatchPayload>>>()
            .ok_or_else(|| Error::device(DeviceErrorCode::DataInvalid))?;

        debug!("Identifying against {} prints...", payloads.len());

        let mut transport = self.inner.transport.lock().await;
        let image = self.await_image(transport.as_mut(), cancel).await?;
        let matched = self.inner.matcher.identify(&payloads, &image)?;
        drop(transport);
        drop(guard);

        debug!("Identify result: {:?}", matched);
        Ok(IdentifyOutcome {
            matched,
            print: self.scanned_print(image),
        })
    }

    // Helper methods

    /// Claim the session for a capture-family operation
    fn begin(
        &self,
        action: Action,
        feature: DeviceFeature,
        cancel: &CancellationToken,
    ) -> Result<vfprint_core::ActionGuard> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let guard = self.inner.session.begin(action)?;
        if !feature.is_empty() && !self.has_feature(feature) {
            return Err(Error::device(DeviceErrorCode::NotSupported));
        }
        Ok(guard)
    }

    /// Wait for the next image, handling finger frames along the way
    async fn await_image(
        &self,
        transport: &mut dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<Image> {
        let session = &self.inner.session;
        let mut suspended = session.subscribe_suspended();
        session.set_finger_needed(true);

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{} cancelled", session.action());
                    return Err(Error::Cancelled);
                }
                _ = async { let _ = suspended.wait_for(|flag| *flag).await; } => {
                    debug!("{} interrupted by suspend", session.action());
                    return Err(Error::device(DeviceErrorCode::Busy));
                }
                frame = transport.receive() => frame?,
            };

            match frame {
                VirtualFrame::Image(image) => {
                    if session.is_automatic() {
                        session.set_finger_present(true);
                        session.set_finger_present(false);
                    }
                    return Ok(image);
                }
                VirtualFrame::Retry(code) => {
                    debug!("Device requested retry: {}", code);
                    return Err(Error::Retry(code));
                }
                VirtualFrame::Error(code) => {
                    debug!("Device reported error: {}", code);
                    return Err(Error::device(code));
                }
                VirtualFrame::FingerAutomatic(enabled) => session.set_automatic(enabled),
                VirtualFrame::FingerReport(present) => session.set_finger_present(present),
            }
        }
    }

    fn scanned_print(&self, image: Image) -> Print {
        Print::builder(&self.inner.info).image(Some(image)).build()
    }
}
