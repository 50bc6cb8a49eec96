pub mod v4l2;

pub use v4l2::{list_cameras, CameraInfo, V4lCamera};

use crate::common::Result;
use image::DynamicImage;

/// A frame source that must be opened before reading and released afterwards.
pub trait CameraDevice {
    fn open(&mut self) -> Result<()>;

    /// Next frame, or `Ok(None)` once the stream has ended.
    fn read_frame(&mut self) -> Result<Option<DynamicImage>>;

    /// Must be safe to call repeatedly and on a device that never opened.
    fn release(&mut self);

    fn is_open(&self) -> bool;
}

/// Exclusive hold on a camera for the duration of one loop.
///
/// The device is released when the session is dropped, whichever way the
/// loop exits.
pub struct CameraSession<'a> {
    device: &'a mut dyn CameraDevice,
}

impl<'a> CameraSession<'a> {
    pub fn start(device: &'a mut dyn CameraDevice) -> Result<Self> {
        if let Err(e) = device.open() {
            // A half-opened device still holds resources
            device.release();
            return Err(e);
        }
        Ok(Self { device })
    }

    /// `None` signals end-of-stream or a read failure; either way the loop should stop.
    pub fn capture_frame(&mut self) -> Option<DynamicImage> {
        match self.device.read_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                tracing::info!("Camera stream ended");
                None
            }
            Err(e) => {
                tracing::warn!("Failed to capture frame: {}", e);
                None
            }
        }
    }
}

impl Drop for CameraSession<'_> {
    fn drop(&mut self) {
        self.device.release();
        tracing::debug!("Camera released");
    }
}
