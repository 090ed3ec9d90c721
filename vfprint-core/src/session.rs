//! Driver session state
//!
//! A session tracks the live association between an open device and its
//! channel:
//! - Open/closed state
//! - The outstanding operation (at most one at a time)
//! - Finger status, published through a watch channel
//! - Automatic finger reporting mode
//! - System suspend, during which nothing may start

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use vfprint_types::FingerStatusFlags;

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel
    Closed,

    /// Channel established, operations accepted
    Open,
}

/// Operation kind currently outstanding on the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    None,
    Open,
    Close,
    Capture,
    /// Enrollment, with the 1-based stage being captured
    Enroll {
        stage: u32,
    },
    Verify,
    Identify,
}

impl Action {
    /// Check if this is a capture, enroll, verify or identify operation
    pub fn is_capture_family(self) -> bool {
        matches!(
            self,
            Self::Capture | Self::Enroll { .. } | Self::Verify | Self::Identify
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Capture => write!(f, "capture"),
            Self::Enroll { stage } => write!(f, "enroll (stage {})", stage),
            Self::Verify => write!(f, "verify"),
            Self::Identify => write!(f, "identify"),
        }
    }
}

#[derive(Debug)]
struct Slots {
    state: SessionState,
    action: Action,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    slots: parking_lot::RwLock<Slots>,

    finger_status: watch::Sender<FingerStatusFlags>,

    /// Written only while holding `slots`
    suspended: watch::Sender<bool>,

    /// Implicit PRESENT/removal around image frames
    automatic: AtomicBool,
}

impl Session {
    /// Create a new closed session
    pub fn new() -> Self {
        let (finger_status, _) = watch::channel(FingerStatusFlags::NONE);
        let (suspended, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                slots: parking_lot::RwLock::new(Slots {
                    state: SessionState::Closed,
                    action: Action::None,
                }),
                finger_status,
                suspended,
                automatic: AtomicBool::new(true),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.inner.slots.read().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Get the outstanding operation
    pub fn action(&self) -> Action {
        self.inner.slots.read().action
    }

    /// Check if any operation is outstanding
    pub fn is_busy(&self) -> bool {
        self.action() != Action::None
    }

    /// Start opening the session
    ///
    /// Fails with `Busy` while another operation is outstanding, with
    /// `Suspended` while suspended and with `AlreadyOpen` if the session is
    /// open.
    pub fn begin_open(&self) -> Result<ActionGuard> {
        let mut slots = self.inner.slots.write();
        if slots.action != Action::None {
            return Err(Error::Busy(slots.action));
        }
        if self.is_suspended() {
            return Err(Error::Suspended);
        }
        if slots.state == SessionState::Open {
            return Err(Error::AlreadyOpen);
        }
        slots.action = Action::Open;
        Ok(ActionGuard::new(self.clone()))
    }

    /// Start closing the session
    pub fn begin_close(&self) -> Result<ActionGuard> {
        self.begin_with(Action::Close)
    }

    /// Start a capture-family operation
    ///
    /// The returned guard resets the action and finger status when dropped,
    /// on every exit path of the operation.
    pub fn begin(&self, action: Action) -> Result<ActionGuard> {
        debug_assert!(action.is_capture_family());
        self.begin_with(action)
    }

    fn begin_with(&self, action: Action) -> Result<ActionGuard> {
        let mut slots = self.inner.slots.write();
        if slots.action != Action::None {
            return Err(Error::Busy(slots.action));
        }
        if self.is_suspended() {
            return Err(Error::Suspended);
        }
        if slots.state != SessionState::Open {
            return Err(Error::NotOpen);
        }
        slots.action = action;
        Ok(ActionGuard::new(self.clone()))
    }

    pub fn is_suspended(&self) -> bool {
        *self.inner.suspended.borrow()
    }

    /// Receiver notified when the session is suspended or resumed
    pub fn subscribe_suspended(&self) -> watch::Receiver<bool> {
        self.inner.suspended.subscribe()
    }

    /// Enter suspend; returns the operation that must now be abandoned
    pub fn suspend(&self) -> Result<Action> {
        let slots = self.inner.slots.write();
        if self.is_suspended() {
            return Err(Error::Suspended);
        }
        self.inner.suspended.send_replace(true);
        debug!("Session suspended ({} outstanding)", slots.action);
        Ok(slots.action)
    }

    /// Leave suspend
    pub fn resume(&self) -> Result<()> {
        let _slots = self.inner.slots.write();
        if !self.is_suspended() {
            return Err(Error::NotSuspended);
        }
        self.inner.suspended.send_replace(false);
        debug!("Session resumed");
        Ok(())
    }

    /// Mark the session open; resets automatic finger reporting
    pub fn set_open(&self) {
        self.inner.slots.write().state = SessionState::Open;
        self.inner.automatic.store(true, Ordering::Release);
        self.report_finger_status(FingerStatusFlags::NONE);
    }

    /// Mark the session closed
    pub fn set_closed(&self) {
        self.inner.slots.write().state = SessionState::Closed;
        self.report_finger_status(FingerStatusFlags::NONE);
    }

    /// Update the stage of an outstanding enrollment
    pub fn set_enroll_stage(&self, stage: u32) -> Result<()> {
        let mut slots = self.inner.slots.write();
        match slots.action {
            Action::Enroll { .. } => {
                slots.action = Action::Enroll { stage };
                Ok(())
            }
            other => Err(Error::Busy(other)),
        }
    }

    /// Get current finger status
    pub fn finger_status(&self) -> FingerStatusFlags {
        *self.inner.finger_status.borrow()
    }

    /// Subscribe to finger status changes
    pub fn subscribe(&self) -> watch::Receiver<FingerStatusFlags> {
        self.inner.finger_status.subscribe()
    }

    /// Publish a new finger status
    ///
    /// PRESENT without NEEDED is dropped, since presence only means
    /// something while a finger is awaited.
    pub fn report_finger_status(&self, status: FingerStatusFlags) {
        let mut status = status;
        if !status.is_consistent() {
            warn!("Dropping PRESENT from finger status {} without NEEDED", status);
            status.remove(FingerStatusFlags::PRESENT);
        }

        self.inner.finger_status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!("Finger status {} -> {}", current, status);
            *current = status;
            true
        });
    }

    /// Set or clear NEEDED
    ///
    /// Clearing NEEDED also clears PRESENT.
    pub fn set_finger_needed(&self, needed: bool) {
        let status = if needed {
            self.finger_status() | FingerStatusFlags::NEEDED
        } else {
            FingerStatusFlags::NONE
        };
        self.report_finger_status(status);
    }

    /// Set or clear PRESENT; ignored while no finger is needed
    pub fn set_finger_present(&self, present: bool) {
        let current = self.finger_status();
        if !current.contains(FingerStatusFlags::NEEDED) {
            debug!("Ignoring finger report ({}) while no finger is needed", present);
            return;
        }
        let mut status = current;
        status.set(FingerStatusFlags::PRESENT, present);
        self.report_finger_status(status);
    }

    /// Check if finger presence is inferred from image frames
    pub fn is_automatic(&self) -> bool {
        self.inner.automatic.load(Ordering::Acquire)
    }

    pub fn set_automatic(&self, automatic: bool) {
        debug!("Automatic finger reporting {}", if automatic { "enabled" } else { "disabled" });
        self.inner.automatic.store(automatic, Ordering::Release);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of the session's single operation slot
///
/// Dropping the guard marks the session idle and clears the finger status.
#[derive(Debug)]
#[must_use = "the operation ends when the guard is dropped"]
pub struct ActionGuard {
    session: Session,
}

impl ActionGuard {
    fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn action(&self) -> Action {
        self.session.action()
    }
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        self.session.report_finger_status(FingerStatusFlags::NONE);
        self.session.inner.slots.write().action = Action::None;
    }
}
