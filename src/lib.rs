//! Quality control for scanned document images.
//!
//! Every page goes through two independent checks:
//!
//! - [`ContourScanner`] looks for small solid squares left behind by
//!   characters that failed to decode,
//! - [`ConfidenceAggregator`] looks for low-confidence words in the page's
//!   OCR result, a sign of truncated or corrupted text.
//!
//! [`BatchReporter`] runs both over a directory and reports one line per
//! file, optionally writing annotated copies of the flagged pages.

use std::{fs, path::Path};

use image::DynamicImage;

pub mod annotation;
mod batch;
pub mod classifier;
mod confidence;
mod config;
mod contour_scanner;
mod error;
pub mod overlay;
pub mod recognizer;
mod report;
pub mod retry;
mod util;

pub use batch::*;
pub use classifier::{GeometricDefectClassifier, ShapeMeasures};
pub use confidence::*;
pub use config::Config;
pub use contour_scanner::*;
pub use error::*;
pub use recognizer::{StoredAnnotations, TextRecognizer, VisionClient, VisionClientBuilder};
pub use report::*;
pub use retry::RetryPolicy;

/// A page as read from disk, bytes kept for the OCR request.
pub(crate) struct SourceImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub image: DynamicImage,
}

impl SourceImage {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let image = image::load_from_memory(&bytes).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes,
            image,
        })
    }
}
