//! What to draw on a frame, kept separate from how it is drawn.

use crate::core::types::DetectionBox;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Gray,
    Cyan,
    Green,
    Red,
}

impl Tint {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            Tint::Gray => Rgb([128, 128, 128]),
            Tint::Cyan => Rgb([0, 255, 255]),
            Tint::Green => Rgb([0, 255, 0]),
            Tint::Red => Rgb([255, 0, 0]),
        }
    }
}

/// Verdict for one detected face.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceMark {
    /// Enrollment preview: a face that SPACE would capture.
    Candidate,
    /// No classifier is trained, so no identity lookup was attempted.
    DetectedNotEnrolled,
    Recognized { user_id: u32, name: String, age: u32, distance: f64 },
    Unknown { distance: f64 },
    /// The face could not be annotated, e.g. its box left the frame.
    Error,
}

impl FaceMark {
    pub fn tint(&self) -> Tint {
        match self {
            FaceMark::Candidate | FaceMark::Recognized { .. } => Tint::Green,
            FaceMark::DetectedNotEnrolled => Tint::Cyan,
            FaceMark::Unknown { .. } | FaceMark::Error => Tint::Red,
        }
    }

    /// Text shown above the box.
    pub fn title(&self) -> String {
        match self {
            FaceMark::Candidate => "Face".to_string(),
            FaceMark::DetectedNotEnrolled => "Face Detected".to_string(),
            FaceMark::Recognized { name, .. } => format!("Name: {}", name),
            FaceMark::Unknown { .. } => "Unknown Person".to_string(),
            FaceMark::Error => "Error".to_string(),
        }
    }

    /// Lines shown below the box.
    pub fn details(&self) -> Vec<String> {
        match self {
            FaceMark::Candidate | FaceMark::Error => Vec::new(),
            FaceMark::DetectedNotEnrolled => vec![
                "No faces enrolled yet".to_string(),
                "Enroll faces to enable recognition".to_string(),
            ],
            FaceMark::Recognized { user_id, age, distance, .. } => vec![
                format!("Age: {}", age),
                format!("Confidence: {:.1}", distance),
                format!("ID: {}", user_id),
            ],
            FaceMark::Unknown { distance } => vec![format!("Confidence: {:.1}", distance)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnnotation {
    pub bbox: DetectionBox,
    pub mark: FaceMark,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    NoFace { detection_only: bool },
    Faces,
    Enrolling { face_found: bool, captured: usize, required: usize },
}

/// Everything the view needs to annotate one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub status: FrameStatus,
    pub faces: Vec<FaceAnnotation>,
}

impl FrameReport {
    pub fn no_face(detection_only: bool) -> Self {
        Self { status: FrameStatus::NoFace { detection_only }, faces: Vec::new() }
    }

    pub fn marks(&self) -> impl Iterator<Item = &FaceMark> {
        self.faces.iter().map(|f| &f.mark)
    }

    /// Frame border colour; the last annotated face wins, as each face repaints it.
    pub fn border(&self) -> Tint {
        match &self.status {
            FrameStatus::NoFace { .. } => Tint::Gray,
            FrameStatus::Enrolling { face_found: false, .. } => Tint::Red,
            _ => self.faces.last().map_or(Tint::Gray, |f| f.mark.tint()),
        }
    }

    /// Status lines drawn in the top-left corner.
    pub fn banner(&self) -> Vec<String> {
        match &self.status {
            FrameStatus::NoFace { detection_only } => vec![
                "No face detected".to_string(),
                if *detection_only {
                    "Detection-only mode (No faces enrolled)".to_string()
                } else {
                    "Please position your face in view".to_string()
                },
            ],
            FrameStatus::Faces => Vec::new(),
            FrameStatus::Enrolling { face_found: true, captured, required } => vec![
                format!("Face detected! Press SPACE to capture ({}/{})", captured, required),
                "Position yourself properly and press SPACE".to_string(),
            ],
            FrameStatus::Enrolling { face_found: false, captured, required } => vec![
                "No face detected - Please position your face in view".to_string(),
                format!("Samples captured: {}/{}", captured, required),
            ],
        }
    }
}

const BORDER_INSET: u32 = 10;
const BORDER_THICKNESS: u32 = 3;

/// Draw the report's border and face boxes onto an RGB copy of `frame`.
///
/// A face whose box does not fit the frame gets a small error marker in the
/// corner instead of its box; it never aborts the rest of the frame.
pub fn draw_report(frame: &DynamicImage, report: &FrameReport) -> RgbImage {
    let mut img = frame.to_rgb8();
    let (width, height) = img.dimensions();

    if width > 2 * (BORDER_INSET + BORDER_THICKNESS) && height > 2 * (BORDER_INSET + BORDER_THICKNESS) {
        let color = report.border().rgb();
        for i in 0..BORDER_THICKNESS {
            let inset = BORDER_INSET + i;
            let rect = Rect::at(inset as i32, inset as i32)
                .of_size(width - 2 * inset, height - 2 * inset);
            draw_hollow_rect_mut(&mut img, rect, color);
        }
    }

    for face in &report.faces {
        let b = face.bbox;
        if !b.fits_within(width, height) {
            tracing::debug!("Skipping box {:?} outside {}x{} frame", b, width, height);
            draw_error_marker(&mut img);
            continue;
        }

        let color = face.mark.tint().rgb();
        let rect = Rect::at(b.x as i32, b.y as i32).of_size(b.width, b.height);
        draw_hollow_rect_mut(&mut img, rect, color);

        // Thicker border by drawing an inner rectangle too
        if b.width > 2 && b.height > 2 {
            let inner = Rect::at(b.x as i32 + 1, b.y as i32 + 1).of_size(b.width - 2, b.height - 2);
            draw_hollow_rect_mut(&mut img, inner, color);
        }
    }

    img
}

fn draw_error_marker(img: &mut RgbImage) {
    let size = 12u32.min(img.width()).min(img.height());
    if size == 0 {
        return;
    }
    let rect = Rect::at(0, 0).of_size(size, size);
    draw_hollow_rect_mut(img, rect, Tint::Red.rgb());
}
