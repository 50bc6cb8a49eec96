/// Distance reported when no prediction could be made.
pub const UNMATCHED_DISTANCE: f64 = 1000.0;

/// Axis-aligned face rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DetectionBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// True when the box is non-empty and lies entirely inside a `width` x `height` frame.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).map_or(false, |right| right <= width)
            && self.y.checked_add(self.height).map_or(false, |bottom| bottom <= height)
    }

    /// Clip a signed detector rectangle to the frame. Returns `None` if nothing is left.
    pub fn clipped(x: i32, y: i32, width: u32, height: u32, frame_w: u32, frame_h: u32) -> Option<Self> {
        let left = x.max(0) as i64;
        let top = y.max(0) as i64;
        let right = (x as i64 + width as i64).min(frame_w as i64);
        let bottom = (y as i64 + height as i64).min(frame_h as i64);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }
}

/// Outcome of classifying one face region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionResult {
    /// Predicted user id, `None` when the classifier could not answer.
    pub identity: Option<u32>,
    /// Dissimilarity to the closest enrolled sample; lower is better.
    pub distance: f64,
}

impl RecognitionResult {
    pub fn unmatched() -> Self {
        Self { identity: None, distance: UNMATCHED_DISTANCE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within() {
        assert!(DetectionBox::new(0, 0, 10, 10).fits_within(10, 10));
        assert!(!DetectionBox::new(1, 0, 10, 10).fits_within(10, 10));
        assert!(!DetectionBox::new(0, 0, 0, 10).fits_within(10, 10));
        assert!(!DetectionBox::new(u32::MAX, 0, 2, 2).fits_within(10, 10));
    }

    #[test]
    fn test_clipped_to_frame() {
        let b = DetectionBox::clipped(-5, 10, 20, 100, 100, 50).unwrap();
        assert_eq!(b, DetectionBox::new(0, 10, 15, 40));
        assert!(b.fits_within(100, 50));
    }

    #[test]
    fn test_clipped_outside_frame_is_none() {
        assert!(DetectionBox::clipped(200, 0, 20, 20, 100, 100).is_none());
        assert!(DetectionBox::clipped(-30, 0, 20, 20, 100, 100).is_none());
    }

    #[test]
    fn test_unmatched_sentinel() {
        let r = RecognitionResult::unmatched();
        assert_eq!(r.identity, None);
        assert_eq!(r.distance, UNMATCHED_DISTANCE);
    }
}
