use std::path::Path;

use image::{DynamicImage, GrayImage};
use imageproc::{
    contours::{find_contours, BorderType},
    edges::canny,
    filter::separable_filter_equal,
    point::Point,
};
use tracing::instrument;

use crate::{
    classifier::{GeometricDefectClassifier, ShapeMeasures},
    overlay::{Overlay, BLUE, MAGENTA, RED},
    util::{compress_chain, gaussian_kernel},
    Result, SourceImage,
};

/// Preprocessing applied before contour extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSettings {
    pub blur_kernel_size: usize,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            blur_sigma: 1.0,
            canny_low: 20.0,
            canny_high: 50.0,
        }
    }
}

/// Finds encoding-error squares in a page.
#[derive(Debug, Clone, Default)]
pub struct ContourScanner {
    settings: EdgeSettings,
    classifier: GeometricDefectClassifier,
}

impl ContourScanner {
    pub fn new(settings: EdgeSettings) -> Self {
        Self {
            settings,
            classifier: GeometricDefectClassifier::new(),
        }
    }

    pub fn settings(&self) -> &EdgeSettings {
        &self.settings
    }

    /// Grayscale, blur and Canny.
    #[instrument(level = "debug", skip(self, image))]
    pub fn edges(&self, image: &DynamicImage) -> GrayImage {
        let EdgeSettings {
            blur_kernel_size,
            blur_sigma,
            canny_low,
            canny_high,
        } = self.settings;
        let gray = image.to_luma8();
        let kernel = gaussian_kernel(blur_kernel_size, blur_sigma);
        let blurred = separable_filter_equal(&gray, &kernel);
        canny(&blurred, canny_low, canny_high)
    }

    /// Outer borders of the edge map, without nested contours.
    #[instrument(level = "debug", skip(self, image))]
    pub fn contours(&self, image: &DynamicImage) -> Vec<Vec<Point<i32>>> {
        let edges = self.edges(image);
        find_contours::<i32>(&edges)
            .into_iter()
            .filter(|it| it.border_type == BorderType::Outer && it.parent.is_none())
            .map(|it| compress_chain(&it.points))
            .collect()
    }

    /// Runs the classifier over every contour, drawing each hit onto
    /// `overlay`. Returns whether anything was found.
    #[instrument(level = "debug", skip_all)]
    pub fn scan(&self, image: &DynamicImage, overlay: &mut Overlay) -> bool {
        let contours = self.contours(image);
        let mut hits = 0;
        for contour in &contours {
            let Some(measures) = self.classifier.measure(contour) else {
                continue;
            };
            if self.classifier.accepts(&measures) {
                draw_square(overlay, contour, &measures);
                hits += 1;
            }
        }
        log::debug!("{hits} of {} contours look like encoding errors", contours.len());
        hits > 0
    }

    /// Scans a single file, writing `encoding_<name>` into `output_dir` when
    /// a square was found.
    #[instrument(skip(self))]
    pub fn scan_file(&self, path: &Path, output_dir: Option<&Path>) -> Result<bool> {
        let source = SourceImage::load(path)?;
        let mut overlay = Overlay::new(&source.image);
        let detected = self.scan(&source.image, &mut overlay);
        if let Some(output_dir) = output_dir.filter(|_| detected) {
            overlay.save(output_dir, &source.file_name)?;
        }
        Ok(detected)
    }
}

fn draw_square(overlay: &mut Overlay, contour: &[Point<i32>], measures: &ShapeMeasures) {
    overlay.draw_closed(&measures.oriented_box, RED);
    overlay.draw_closed(contour, BLUE);
    overlay.draw_closed(&measures.hull, MAGENTA);
}

#[cfg(test)]
mod tests {
    use image::{Luma, Rgb, RgbImage};
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

    use super::*;

    fn page_with(squares: &[(i32, i32, u32)]) -> DynamicImage {
        let mut page = RgbImage::from_pixel(240, 160, Rgb([255, 255, 255]));
        for &(x, y, size) in squares {
            draw_filled_rect_mut(&mut page, Rect::at(x, y).of_size(size, size), Rgb([0, 0, 0]));
        }
        DynamicImage::ImageRgb8(page)
    }

    #[test]
    fn blank_page_has_no_edges() {
        let scanner = ContourScanner::default();
        let edges = scanner.edges(&page_with(&[]));
        assert!(edges.pixels().all(|pixel| *pixel == Luma([0])));
        assert!(scanner.contours(&page_with(&[])).is_empty());
    }

    #[test]
    fn solid_square_is_found_and_drawn() {
        let scanner = ContourScanner::default();
        let page = page_with(&[(60, 40, 50)]);
        let mut overlay = Overlay::new(&page);
        assert!(scanner.scan(&page, &mut overlay));
        assert!(overlay.is_marked());
    }

    #[test]
    fn blank_page_leaves_overlay_untouched() {
        let scanner = ContourScanner::default();
        let page = page_with(&[]);
        let mut overlay = Overlay::new(&page);
        assert!(!scanner.scan(&page, &mut overlay));
        assert!(!overlay.is_marked());
    }

    #[test]
    fn tiny_specks_are_ignored() {
        let scanner = ContourScanner::default();
        let page = page_with(&[(30, 30, 3), (120, 90, 4)]);
        let mut overlay = Overlay::new(&page);
        assert!(!scanner.scan(&page, &mut overlay));
    }
}
