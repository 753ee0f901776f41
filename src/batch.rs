use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use tracing::instrument;

use crate::{
    confidence::ConfidenceAggregator,
    contour_scanner::ContourScanner,
    overlay::Overlay,
    recognizer::TextRecognizer,
    report::{FileOutcome, FileReport, ImageVerdict, TextStatus},
    Config, Error, Result, SourceImage,
};

/// Extensions picked up from the input directory. Matching is
/// case-sensitive, so `.JPG` or `.jpeg` files are left out.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png"];

/// Names need not be valid UTF-8, only the extension is compared.
pub fn is_eligible_name(file_name: impl AsRef<OsStr>) -> bool {
    let file_name = file_name.as_ref().as_encoded_bytes();
    IMAGE_EXTENSIONS
        .iter()
        .any(|extension| file_name.ends_with(extension.as_bytes()))
}

/// Regular files of `dir` with an eligible name, sorted by name.
pub fn eligible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir_error = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        let eligible = path.file_name().is_some_and(is_eligible_name);
        if eligible && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Runs both detectors over every eligible image of a directory.
pub struct BatchReporter {
    config: Config,
    scanner: ContourScanner,
    aggregator: ConfidenceAggregator,
    recognizer: Box<dyn TextRecognizer>,
}

impl BatchReporter {
    pub fn new(config: Config, recognizer: impl TextRecognizer + 'static) -> Self {
        Self {
            scanner: ContourScanner::new(config.edges),
            aggregator: ConfidenceAggregator::new(),
            recognizer: Box::new(recognizer),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists the input directory and returns the per-file reports, computed
    /// lazily in file name order. Creates the output directory if needed.
    #[instrument(skip(self), fields(input_dir = %self.config.input_dir.display()))]
    pub fn run(&self) -> Result<Reports<'_>> {
        self.config.validate()?;
        if let Some(output_dir) = self.config.output_dir() {
            fs::create_dir_all(output_dir).map_err(|source| Error::CreateOutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;
        }
        let files = eligible_files(&self.config.input_dir)?;
        log::info!("Found {} images to check", files.len());
        Ok(Reports {
            reporter: self,
            files: files.into_iter(),
        })
    }

    /// Checks a single image. Failures only affect this file's report.
    #[instrument(skip(self))]
    pub fn process(&self, path: &Path) -> FileReport {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = match SourceImage::load(path) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("Skipping {file_name}: {err}");
                return FileReport {
                    file_name,
                    outcome: FileOutcome::Skipped(err.to_string()),
                    overlay: None,
                };
            }
        };

        let mut overlay = Overlay::new(&source.image);
        let encoding_error = self.scanner.scan(&source.image, &mut overlay);
        let text_error = match self
            .config
            .retry
            .run(|| self.recognizer.annotate(path, &source.bytes))
        {
            Ok(annotation) => {
                TextStatus::Scored(self.aggregator.score_text(&annotation, &mut overlay))
            }
            Err(err) => {
                log::warn!("Text analysis unavailable for {file_name}: {err}");
                TextStatus::Unavailable(err.to_string())
            }
        };

        let overlay = match self.config.output_dir() {
            Some(output_dir) if overlay.is_marked() => {
                match overlay.save(output_dir, &file_name) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        log::warn!("{err}");
                        None
                    }
                }
            }
            _ => None,
        };

        FileReport {
            file_name,
            outcome: FileOutcome::Scanned(ImageVerdict {
                encoding_error,
                text_error,
            }),
            overlay,
        }
    }
}

/// Lazily processed reports of one batch run.
pub struct Reports<'a> {
    reporter: &'a BatchReporter,
    files: std::vec::IntoIter<PathBuf>,
}

impl Iterator for Reports<'_> {
    type Item = FileReport;

    fn next(&mut self) -> Option<FileReport> {
        let path = self.files.next()?;
        Some(self.reporter.process(&path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

impl ExactSizeIterator for Reports<'_> {}
