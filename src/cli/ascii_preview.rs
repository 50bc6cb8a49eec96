use crate::common::{DevMode, Result};
use crate::core::annotation::{draw_report, FrameReport};
use crate::core::capture::{FrameView, OperatorInput, OperatorKey};
use crate::core::types::DetectionBox;
use image::DynamicImage;
use std::io::{self, Write};
use std::time::Duration;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};

const ASCII_RAMP: &[char] = &[' ', '.', '·', ':', ';', '+', '=', 'x', 'X', '#', '@'];
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 30;

pub struct AsciiRenderer {
    width: usize,
    height: usize,
}

impl AsciiRenderer {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        // Get actual terminal size if not specified
        let (term_width, term_height) = terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        // Leave room below the picture for the status and help lines
        Self {
            width: width.unwrap_or(term_width.min(DEFAULT_WIDTH * 2)).max(1),
            height: height.unwrap_or(term_height.saturating_sub(4).min(DEFAULT_HEIGHT * 2)).max(1),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Frame as ASCII art with face boxes, labels and the status banner.
    pub fn render(&self, image: &DynamicImage, report: &FrameReport) -> String {
        let mut grid = self.image_to_ascii(image);
        let (img_width, img_height) = (image.width(), image.height());

        for face in &report.faces {
            if !face.bbox.fits_within(img_width, img_height) {
                self.overlay_text(&mut grid, "!", 0, 0);
                continue;
            }

            let (x1, y1, _, y2) = self.draw_face_box(&mut grid, &face.bbox, img_width, img_height);
            self.overlay_text(&mut grid, &face.mark.title(), x1, y1.saturating_sub(1));
            for (i, line) in face.mark.details().iter().enumerate() {
                self.overlay_text(&mut grid, line, x1, y2 + 1 + i);
            }
        }

        for (i, line) in report.banner().iter().enumerate() {
            self.overlay_text(&mut grid, line, 1, 1 + i);
        }

        self.grid_to_string(&grid)
    }

    fn image_to_ascii(&self, image: &DynamicImage) -> Vec<Vec<char>> {
        let mut grid = vec![vec![' '; self.width]; self.height];

        let gray = image.to_luma8();
        let (img_width, img_height) = gray.dimensions();

        for (term_y, row) in grid.iter_mut().enumerate() {
            for (term_x, cell) in row.iter_mut().enumerate() {
                let img_x = (term_x as f32 / self.width as f32 * img_width as f32) as u32;
                let img_y = (term_y as f32 / self.height as f32 * img_height as f32) as u32;

                if img_x < img_width && img_y < img_height {
                    let brightness = gray.get_pixel(img_x, img_y)[0] as usize;
                    *cell = ASCII_RAMP[brightness * (ASCII_RAMP.len() - 1) / 255];
                }
            }
        }

        grid
    }

    /// Left-aligned text starting at column `x`, clipped to the grid.
    fn overlay_text(&self, grid: &mut [Vec<char>], text: &str, x: usize, y: usize) {
        let Some(row) = grid.get_mut(y) else {
            return;
        };
        for (cell, ch) in row.iter_mut().skip(x).zip(text.chars()) {
            *cell = ch;
        }
    }

    /// Returns the box corners in grid coordinates.
    fn draw_face_box(
        &self,
        grid: &mut [Vec<char>],
        bbox: &DetectionBox,
        img_width: u32,
        img_height: u32,
    ) -> (usize, usize, usize, usize) {
        let scale_x = |v: u32| ((v as f32 / img_width as f32) * self.width as f32) as usize;
        let scale_y = |v: u32| ((v as f32 / img_height as f32) * self.height as f32) as usize;

        let x1 = scale_x(bbox.x).min(self.width - 1);
        let y1 = scale_y(bbox.y).min(self.height - 1);
        let x2 = scale_x(bbox.x + bbox.width).saturating_sub(1).clamp(x1, self.width - 1);
        let y2 = scale_y(bbox.y + bbox.height).saturating_sub(1).clamp(y1, self.height - 1);

        for x in x1..=x2 {
            grid[y1][x] = '─';
            grid[y2][x] = '─';
        }
        for row in grid.iter_mut().take(y2 + 1).skip(y1) {
            row[x1] = '│';
            row[x2] = '│';
        }

        grid[y1][x1] = '┌';
        grid[y1][x2] = '┐';
        grid[y2][x1] = '└';
        grid[y2][x2] = '┘';

        (x1, y1, x2, y2)
    }

    fn grid_to_string(&self, grid: &[Vec<char>]) -> String {
        grid.iter()
            .map(|row| row.iter().take(self.width).collect::<String>())
            .collect::<Vec<_>>()
            .join("\r\n") // Raw mode needs explicit carriage returns
    }
}

pub fn clear_screen() -> io::Result<()> {
    execute!(
        io::stdout(),
        terminal::Clear(ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    io::stdout().flush()
}

/// SPACE accepts, ESC cancels, `q` quits, `s` saves a snapshot.
pub fn map_key(key: KeyEvent) -> Option<OperatorKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(OperatorKey::Accept),
        KeyCode::Esc => Some(OperatorKey::Cancel),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(OperatorKey::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(OperatorKey::Quit),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(OperatorKey::Snapshot),
        _ => None,
    }
}

/// Live preview in the terminal. Raw mode lasts as long as the value does.
pub struct TerminalView {
    renderer: AsciiRenderer,
    dev_mode: DevMode,
    status: String,
    help: &'static str,
}

impl TerminalView {
    pub fn new(dev_mode: &DevMode, help: &'static str) -> Result<Self> {
        terminal::enable_raw_mode()?;
        let view = Self {
            renderer: AsciiRenderer::new(None, None),
            dev_mode: dev_mode.clone(),
            status: String::new(),
            help,
        };
        clear_screen().ok();
        execute!(io::stdout(), cursor::Hide).ok();
        Ok(view)
    }

    fn draw_footer(&self) -> io::Result<()> {
        let row = (self.renderer.height() + 1) as u16;
        execute!(
            io::stdout(),
            cursor::MoveTo(0, row),
            terminal::Clear(ClearType::CurrentLine),
            Print(&self.status),
            cursor::MoveTo(0, row + 1),
            terminal::Clear(ClearType::CurrentLine),
            Print(self.help)
        )
    }
}

impl FrameView for TerminalView {
    fn show(&mut self, frame: &DynamicImage, report: &FrameReport) -> Result<()> {
        let ascii = self.renderer.render(frame, report);
        execute!(io::stdout(), cursor::MoveTo(0, 0), Print(&ascii))?;
        self.draw_footer()?;
        Ok(())
    }

    fn snapshot(&mut self, frame: &DynamicImage, report: &FrameReport) -> Result<()> {
        let path = self.dev_mode.get_capture_path("snapshot");
        draw_report(frame, report).save(&path)?;
        tracing::info!("Saved snapshot to {:?}", path);
        self.notice(&format!("Saved snapshot to {}", path.display()))
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        tracing::debug!("{}", message);
        self.status = message.to_string();
        self.draw_footer()?;
        Ok(())
    }
}

/// Keys read from the terminal while a `TerminalView` holds raw mode.
pub struct KeyboardInput;

impl OperatorInput for KeyboardInput {
    fn poll(&mut self) -> Result<Option<OperatorKey>> {
        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                return Ok(map_key(key));
            }
        }
        Ok(None)
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        clear_screen().ok();
        execute!(io::stdout(), cursor::Show).ok();
        terminal::disable_raw_mode().ok();
        if !self.status.is_empty() {
            println!("{}", self.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::{FaceAnnotation, FaceMark, FrameStatus};
    use crate::testing::solid_frame;

    fn renderer() -> AsciiRenderer {
        AsciiRenderer::new(Some(40), Some(20))
    }

    #[test]
    fn test_render_dimensions() {
        let out = renderer().render(&solid_frame(80, 40, 0), &FrameReport::no_face(false));
        let rows: Vec<&str> = out.split("\r\n").collect();
        assert_eq!(rows.len(), 20);
        assert!(rows.iter().all(|r| r.chars().count() == 40));
    }

    #[test]
    fn test_render_banner_and_box() {
        let report = FrameReport {
            status: FrameStatus::Faces,
            faces: vec![FaceAnnotation {
                bbox: DetectionBox::new(20, 10, 40, 20),
                mark: FaceMark::Unknown { distance: 140.0 },
            }],
        };
        let out = renderer().render(&solid_frame(80, 40, 255), &report);
        let rows: Vec<Vec<char>> = out.split("\r\n").map(|r| r.chars().collect()).collect();

        assert_eq!(rows[5][10], '┌');
        assert_eq!(rows[14][29], '┘');
        assert!(out.contains("Unknown Person"));
        assert!(out.contains("Confidence: 140.0"));
    }

    #[test]
    fn test_no_face_banner_rendered() {
        let out = renderer().render(&solid_frame(80, 40, 0), &FrameReport::no_face(true));
        assert!(out.contains("No face detected"));
        assert!(out.contains("Detection-only mode"));
    }

    #[test]
    fn test_out_of_frame_box_is_flagged() {
        let report = FrameReport {
            status: FrameStatus::Faces,
            faces: vec![FaceAnnotation { bbox: DetectionBox::new(70, 30, 40, 40), mark: FaceMark::Error }],
        };
        let out = renderer().render(&solid_frame(80, 40, 0), &report);
        assert!(out.starts_with('!'));
    }

    #[test]
    fn test_key_mapping() {
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(map_key(press(KeyCode::Char(' '))), Some(OperatorKey::Accept));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(OperatorKey::Cancel));
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(OperatorKey::Quit));
        assert_eq!(map_key(press(KeyCode::Char('s'))), Some(OperatorKey::Snapshot));
        assert_eq!(map_key(press(KeyCode::Enter)), None);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(OperatorKey::Quit)
        );
    }
}
