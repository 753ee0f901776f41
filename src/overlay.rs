use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{drawing::draw_line_segment_mut, point::Point};
use tracing::instrument;

use crate::{Error, Result};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);

const OVERLAY_PREFIX: &str = "encoding_";
// Two pixels wide.
const STROKE_OFFSETS: [(f32, f32); 3] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];

/// Where the overlay for `file_name` lands inside `output_dir`.
pub fn overlay_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(format!("{OVERLAY_PREFIX}{file_name}"))
}

/// Working copy of a page that detectors draw their findings onto.
#[derive(Debug, Clone)]
pub struct Overlay {
    canvas: RgbImage,
    marked: bool,
}

impl Overlay {
    pub fn new(image: &DynamicImage) -> Self {
        Self {
            canvas: image.to_rgb8(),
            marked: false,
        }
    }

    /// True once anything has been drawn.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Strokes the closed polygon through `points`.
    pub fn draw_closed(&mut self, points: &[Point<i32>], color: Rgb<u8>) {
        if points.is_empty() {
            return;
        }
        let next = points.iter().cycle().skip(1);
        for (start, end) in points.iter().zip(next) {
            for (dx, dy) in STROKE_OFFSETS {
                draw_line_segment_mut(
                    &mut self.canvas,
                    (start.x as f32 + dx, start.y as f32 + dy),
                    (end.x as f32 + dx, end.y as f32 + dy),
                    color,
                );
            }
        }
        self.marked = true;
    }

    /// Writes the overlay as `encoding_<file_name>`, format taken from the
    /// extension.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = overlay_path(output_dir, file_name);
        self.canvas
            .save(&path)
            .map_err(|source| Error::WriteOverlay {
                path: path.clone(),
                source,
            })?;
        log::debug!("Wrote overlay {}", path.display());
        Ok(path)
    }
}
