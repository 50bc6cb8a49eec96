use crate::camera::CameraDevice;
use crate::common::{Config, FaceRecError, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::fs;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Grey,
    Yuyv,
    Mjpg,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        if fourcc == FourCC::new(b"GREY") {
            Some(Self::Grey)
        } else if fourcc == FourCC::new(b"YUYV") {
            Some(Self::Yuyv)
        } else if fourcc == FourCC::new(b"MJPG") {
            Some(Self::Mjpg)
        } else {
            None
        }
    }
}

/// A capture device found under /dev.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub formats: Vec<String>,
}

struct OpenCamera {
    stream: MmapStream<'static>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    _device: Device,
}

/// V4L2 webcam opened lazily by `open()` and closed by `release()`.
pub struct V4lCamera {
    index: u32,
    width: u32,
    height: u32,
    warmup_frames: u32,
    warmup_delay: Duration,
    frame_timeout: Duration,
    open: Option<OpenCamera>,
}

impl V4lCamera {
    pub fn new(config: &Config) -> Self {
        Self {
            index: config.camera.device_index,
            width: config.camera.width,
            height: config.camera.height,
            warmup_frames: config.camera.warmup_frames,
            warmup_delay: Duration::from_millis(config.camera.warmup_delay_ms),
            frame_timeout: Duration::from_millis(config.camera.frame_timeout_ms),
            open: None,
        }
    }

    fn open_device(&self) -> Result<OpenCamera> {
        tracing::info!("Opening camera device {}...", self.index);

        let device = Device::new(self.index as usize)
            .map_err(|e| FaceRecError::Camera(format!("Failed to open camera {}: {}", self.index, e)))?;

        let caps = device.query_caps()
            .map_err(|e| FaceRecError::Camera(format!("Failed to query capabilities: {}", e)))?;

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            tracing::warn!("Device {} may not support standard video capture", self.index);
        }

        let mut fmt = device.format()
            .map_err(|e| FaceRecError::Camera(format!("Failed to get format: {}", e)))?;

        fmt.width = self.width;
        fmt.height = self.height;

        // Keep GREY for IR sensors, otherwise ask for MJPG
        if fmt.fourcc != FourCC::new(b"GREY") {
            fmt.fourcc = FourCC::new(b"MJPG");
        }

        if let Err(e) = device.set_format(&fmt) {
            tracing::warn!("Could not set exact format: {}. Using device defaults.", e);
        }

        let final_fmt = device.format()
            .map_err(|e| FaceRecError::Camera(format!("Failed to get final format: {}", e)))?;

        let pixel_format = PixelFormat::from_fourcc(final_fmt.fourcc).ok_or_else(|| {
            FaceRecError::Camera(format!(
                "Unsupported pixel format {} (need GREY, YUYV or MJPG)",
                final_fmt.fourcc
            ))
        })?;

        tracing::info!(
            width = final_fmt.width,
            height = final_fmt.height,
            fourcc = %final_fmt.fourcc,
            "Negotiated camera format"
        );

        if final_fmt.width != self.width || final_fmt.height != self.height {
            tracing::warn!(
                "Camera resolution {}x{} differs from requested {}x{}",
                final_fmt.width, final_fmt.height, self.width, self.height
            );
        }

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, 4)
            .map_err(|e| FaceRecError::Camera(format!("Failed to create stream: {}", e)))?;
        stream.set_timeout(self.frame_timeout);

        for i in 0..self.warmup_frames {
            stream.next()
                .map_err(|e| FaceRecError::Camera(format!("Failed to capture warmup frame {}: {}", i, e)))?;
            std::thread::sleep(self.warmup_delay);
        }

        Ok(OpenCamera {
            stream,
            width: final_fmt.width,
            height: final_fmt.height,
            pixel_format,
            _device: device,
        })
    }
}

impl CameraDevice for V4lCamera {
    fn open(&mut self) -> Result<()> {
        if self.open.is_none() {
            self.open = Some(self.open_device()?);
            tracing::info!("Camera ready");
        }
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        let camera = match self.open.as_mut() {
            Some(camera) => camera,
            None => return Ok(None),
        };

        let (buf, _meta) = camera.stream.next()
            .map_err(|e| FaceRecError::Camera(format!("Failed to capture: {}", e)))?;

        decode_frame(buf, camera.width, camera.height, camera.pixel_format).map(Some)
    }

    fn release(&mut self) {
        if self.open.take().is_some() {
            tracing::info!("Camera device {} released", self.index);
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        self.release();
    }
}

fn decode_frame(buf: &[u8], width: u32, height: u32, pixel_format: PixelFormat) -> Result<DynamicImage> {
    let pixels = (width * height) as usize;

    match pixel_format {
        PixelFormat::Grey => {
            if buf.len() < pixels {
                return Err(FaceRecError::Camera(format!(
                    "GREY buffer too short: expected {}, got {}", pixels, buf.len()
                )));
            }
            grey_to_image(buf[..pixels].to_vec(), width, height)
        }
        PixelFormat::Yuyv => {
            // Packed [Y0, U, Y1, V]: luma is every even byte
            let expected = pixels * 2;
            if buf.len() < expected {
                return Err(FaceRecError::Camera(format!(
                    "YUYV buffer too short: expected {}, got {}", expected, buf.len()
                )));
            }
            let luma = buf[..expected].iter().step_by(2).copied().collect();
            grey_to_image(luma, width, height)
        }
        PixelFormat::Mjpg => {
            let image = image::load_from_memory_with_format(buf, ImageFormat::Jpeg)?;
            Ok(image)
        }
    }
}

fn grey_to_image(data: Vec<u8>, width: u32, height: u32) -> Result<DynamicImage> {
    let img_buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data)
        .ok_or_else(|| FaceRecError::Camera("Failed to create grayscale image buffer".into()))?;

    Ok(DynamicImage::ImageLuma8(img_buffer))
}

/// List all video capture devices with the pixel formats they offer.
pub fn list_cameras() -> Result<Vec<CameraInfo>> {
    let mut cameras = Vec::new();

    for entry in fs::read_dir("/dev")? {
        let entry = entry?;
        let path = entry.path();
        let filename = path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        let Some(index) = filename.strip_prefix("video").and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(device) = Device::new(index as usize) else {
            continue;
        };
        let Ok(caps) = device.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            continue;
        }

        let formats = device.enum_formats()
            .unwrap_or_default()
            .iter()
            .map(|fmt| fmt.fourcc.to_string())
            .collect();

        cameras.push(CameraInfo {
            index,
            name: caps.card.clone(),
            formats,
        });
    }

    cameras.sort_by_key(|c| c.index);
    Ok(cameras)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_grey() {
        let frame = decode_frame(&[7u8; 12], 4, 3, PixelFormat::Grey).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.to_luma8().get_pixel(0, 0)[0], 7);
    }

    #[test]
    fn test_decode_yuyv_takes_luma() {
        let buf = [10u8, 128, 20, 128, 30, 128, 40, 128];
        let frame = decode_frame(&buf, 2, 2, PixelFormat::Yuyv).unwrap().to_luma8();
        assert_eq!(frame.as_raw(), &vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        assert!(decode_frame(&[0u8; 3], 2, 2, PixelFormat::Grey).is_err());
        assert!(decode_frame(&[0u8; 6], 2, 2, PixelFormat::Yuyv).is_err());
    }

    #[test]
    fn test_unknown_fourcc() {
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"H264")), None);
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"YUYV")), Some(PixelFormat::Yuyv));
    }

    #[test]
    fn test_unopened_camera_reads_nothing() {
        let mut camera = V4lCamera::new(&Config::default());
        assert!(!camera.is_open());
        assert!(camera.read_frame().unwrap().is_none());
        camera.release();
    }
}
