use std::{fmt, path::PathBuf};

/// Outcome of the text confidence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextStatus {
    Scored(bool),
    /// Recognition failed; the reason is kept for the log.
    Unavailable(String),
}

impl TextStatus {
    pub fn detected(&self) -> Option<bool> {
        match self {
            TextStatus::Scored(detected) => Some(*detected),
            TextStatus::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVerdict {
    pub encoding_error: bool,
    pub text_error: TextStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Scanned(ImageVerdict),
    /// The file could not be read or decoded.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub file_name: String,
    pub outcome: FileOutcome,
    /// Overlay written for this file, if any.
    pub overlay: Option<PathBuf>,
}

impl FileReport {
    pub fn verdict(&self) -> Option<&ImageVerdict> {
        match &self.outcome {
            FileOutcome::Scanned(verdict) => Some(verdict),
            FileOutcome::Skipped(_) => None,
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (encoding, text) = match &self.outcome {
            FileOutcome::Scanned(verdict) => (
                flag(verdict.encoding_error),
                match verdict.text_error {
                    TextStatus::Scored(detected) => flag(detected),
                    TextStatus::Unavailable(_) => "Unavailable",
                },
            ),
            FileOutcome::Skipped(_) => ("Undetermined", "Undetermined"),
        };
        write!(
            f,
            "{} : EncodingError={encoding} - TruncatedError={text}",
            self.file_name
        )
    }
}
