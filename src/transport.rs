//! HID transport for emitting digitizer frames.
//!
//! Frames go out through a Linux USB HID gadget character device. Sending is
//! best-effort: while the link is down every send is a silent no-op.

use crate::error::TransportError;
use crate::protocol::{Frame, FRAME_LEN, REPORT_ID};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default HID gadget device node.
pub const DEFAULT_HID_DEVICE: &str = "/dev/hidg0";

/// The channel frames are sent over.
pub trait HidTransport {
    fn is_connected(&self) -> bool;

    /// Send one frame. Returns true when the frame was transmitted; a
    /// disconnected link returns false without side effects.
    fn send_frame(&mut self, frame: Frame) -> bool;

    /// Try to re-establish a dropped link.
    fn reconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Observer notified after each transmitted frame.
pub trait ActivitySink {
    fn notify_activity(&self);
}

/// Activity sink that ignores notifications.
#[cfg(test)]
pub struct NoActivity;

#[cfg(test)]
impl ActivitySink for NoActivity {
    fn notify_activity(&self) {}
}

/// Transport writing reports to a HID gadget device (e.g. `/dev/hidg0`).
pub struct HidGadgetTransport {
    path: PathBuf,
    device: Option<File>,
    dropped_frames: u64,
}

impl HidGadgetTransport {
    /// Create a transport for `path` and try to open it once.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let mut transport = Self {
            path: path.into(),
            device: None,
            dropped_frames: 0,
        };
        if let Err(e) = transport.reconnect() {
            warn!("HID device not available yet: {}", e);
        }
        transport
    }

    /// Device node this transport writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_report(&mut self, frame: Frame) -> Result<(), TransportError> {
        let device = self.device.as_mut().ok_or(TransportError::NotConnected)?;

        let mut report = [0u8; FRAME_LEN + 1];
        report[0] = REPORT_ID;
        report[1..].copy_from_slice(&frame.encode());

        device.write_all(&report)?;
        Ok(())
    }
}

impl HidTransport for HidGadgetTransport {
    fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    fn send_frame(&mut self, frame: Frame) -> bool {
        if self.device.is_none() {
            return false;
        }

        match self.write_report(frame) {
            Ok(()) => true,
            Err(TransportError::WriteFailed(e)) if e.kind() == ErrorKind::WouldBlock => {
                // Host is not polling fast enough; keep the link.
                self.dropped_frames += 1;
                debug!("HID report dropped (host busy), {} so far", self.dropped_frames);
                false
            }
            Err(e) => {
                self.dropped_frames += 1;
                warn!("HID link lost: {} ({} frames dropped so far)", e, self.dropped_frames);
                self.device = None;
                false
            }
        }
    }

    /// Open the device if it is not already open.
    fn reconnect(&mut self) -> Result<(), TransportError> {
        if self.device.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| TransportError::OpenFailed {
                path: self.path.display().to_string(),
                source: e,
            })?;

        info!("HID device opened at {:?}", self.path);
        self.device = Some(file);
        Ok(())
    }
}

/// In-memory transport recording every frame, used by tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingTransport {
    pub connected: bool,
    pub frames: Vec<Frame>,
}

#[cfg(test)]
impl RecordingTransport {
    pub fn connected() -> Self {
        Self {
            connected: true,
            frames: Vec::new(),
        }
    }
}

#[cfg(test)]
impl HidTransport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_frame(&mut self, frame: Frame) -> bool {
        if !self.connected {
            return false;
        }
        self.frames.push(frame);
        true
    }
}
