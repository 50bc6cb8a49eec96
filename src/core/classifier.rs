use crate::common::{FaceRecError, Result};
use image::GrayImage;
use imageproc::local_binary_patterns::local_binary_pattern;

/// Trainable identity classifier over normalized face samples.
pub trait FaceClassifier {
    /// Replace the current model with one built from `images`, `labels[i]` naming `images[i]`.
    fn train(&mut self, images: &[GrayImage], labels: &[u32]) -> Result<()>;

    /// Closest label and its distance (lower is better).
    fn predict(&self, image: &GrayImage) -> Result<(u32, f64)>;
}

const LBP_BINS: usize = 256;

/// Local Binary Patterns Histogram recognizer.
///
/// Each sample is split into a `grid_x` x `grid_y` grid, every cell becomes
/// an L1-normalized histogram of 8-neighbour LBP codes, and prediction picks
/// the training sample with the smallest chi-square distance.
pub struct LbphClassifier {
    grid_x: u32,
    grid_y: u32,
    model: Vec<(u32, Vec<f32>)>,
}

impl LbphClassifier {
    pub fn new(grid_x: u32, grid_y: u32) -> Self {
        Self {
            grid_x: grid_x.max(1),
            grid_y: grid_y.max(1),
            model: Vec::new(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.model.len()
    }

    fn spatial_histogram(&self, image: &GrayImage) -> Result<Vec<f32>> {
        let (width, height) = image.dimensions();
        let cell_w = width / self.grid_x;
        let cell_h = height / self.grid_y;
        if cell_w == 0 || cell_h == 0 {
            return Err(FaceRecError::Pipeline(format!(
                "Image {}x{} is too small for a {}x{} grid",
                width, height, self.grid_x, self.grid_y
            )));
        }

        let cells = (self.grid_x * self.grid_y) as usize;
        let mut histogram = vec![0.0f32; cells * LBP_BINS];

        for cy in 0..self.grid_y {
            for cx in 0..self.grid_x {
                let offset = (cy * self.grid_x + cx) as usize * LBP_BINS;
                let cell = &mut histogram[offset..offset + LBP_BINS];
                let mut count = 0u32;

                for y in cy * cell_h..(cy + 1) * cell_h {
                    for x in cx * cell_w..(cx + 1) * cell_w {
                        // Border pixels have no full neighbourhood and yield None
                        if let Some(code) = local_binary_pattern(image, x, y) {
                            cell[code as usize] += 1.0;
                            count += 1;
                        }
                    }
                }

                if count > 0 {
                    let total = count as f32;
                    for bin in cell.iter_mut() {
                        *bin /= total;
                    }
                }
            }
        }

        Ok(histogram)
    }
}

/// Alternative chi-square distance, `2 * sum((a - b)^2 / (a + b))`.
pub fn chi_square_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let sum = (x + y) as f64;
            if sum > 0.0 {
                let diff = (x - y) as f64;
                2.0 * diff * diff / sum
            } else {
                0.0
            }
        })
        .sum()
}

impl FaceClassifier for LbphClassifier {
    fn train(&mut self, images: &[GrayImage], labels: &[u32]) -> Result<()> {
        if images.len() != labels.len() {
            return Err(FaceRecError::Pipeline(format!(
                "Got {} images but {} labels", images.len(), labels.len()
            )));
        }
        if images.is_empty() {
            return Err(FaceRecError::Pipeline("No training images".into()));
        }

        let mut model = Vec::with_capacity(images.len());
        for (image, &label) in images.iter().zip(labels) {
            model.push((label, self.spatial_histogram(image)?));
        }

        self.model = model;
        Ok(())
    }

    fn predict(&self, image: &GrayImage) -> Result<(u32, f64)> {
        if self.model.is_empty() {
            return Err(FaceRecError::Pipeline("Classifier has not been trained".into()));
        }

        let query = self.spatial_histogram(image)?;

        let mut best: Option<(u32, f64)> = None;
        for (label, histogram) in &self.model {
            let distance = chi_square_distance(&query, histogram);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((*label, distance));
            }
        }

        best.ok_or_else(|| FaceRecError::Pipeline("Empty model".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{gradient_face, stripe_face};

    #[test]
    fn test_chi_square_identity_is_zero() {
        let h = vec![0.25, 0.25, 0.5, 0.0];
        assert_eq!(chi_square_distance(&h, &h), 0.0);
    }

    #[test]
    fn test_chi_square_disjoint() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((chi_square_distance(&a, &b) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_predicts_nearest_label() {
        let mut classifier = LbphClassifier::new(4, 4);
        let images = vec![stripe_face(64, 4), stripe_face(64, 5), gradient_face(64), gradient_face(64)];
        classifier.train(&images, &[1, 1, 2, 2]).unwrap();
        assert_eq!(classifier.sample_count(), 4);

        let (label, distance) = classifier.predict(&stripe_face(64, 4)).unwrap();
        assert_eq!(label, 1);
        assert!(distance.abs() < 1e-9);

        let (label, _) = classifier.predict(&gradient_face(64)).unwrap();
        assert_eq!(label, 2);
    }

    #[test]
    fn test_retraining_replaces_model() {
        let mut classifier = LbphClassifier::new(2, 2);
        classifier.train(&[stripe_face(32, 3)], &[7]).unwrap();
        classifier.train(&[gradient_face(32)], &[9]).unwrap();

        let (label, _) = classifier.predict(&stripe_face(32, 3)).unwrap();
        assert_eq!(label, 9);
    }

    #[test]
    fn test_untrained_predict_fails() {
        let classifier = LbphClassifier::new(8, 8);
        assert!(classifier.predict(&gradient_face(64)).is_err());
    }

    #[test]
    fn test_label_count_mismatch_fails() {
        let mut classifier = LbphClassifier::new(8, 8);
        assert!(classifier.train(&[gradient_face(64)], &[1, 2]).is_err());
    }

    #[test]
    fn test_image_smaller_than_grid_fails() {
        let mut classifier = LbphClassifier::new(8, 8);
        assert!(classifier.train(&[GrayImage::new(4, 4)], &[1]).is_err());
    }
}
