//! Text recognition backends.
//!
//! The confidence check only needs a [`TextAnnotation`] per page; where it
//! comes from is up to the [`TextRecognizer`] in use.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{annotation::TextAnnotation, OcrError};

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";
const DOCUMENT_TEXT_DETECTION: &str = "DOCUMENT_TEXT_DETECTION";

pub trait TextRecognizer {
    /// Recognizes the text of one page, given its path and raw bytes.
    fn annotate(&self, path: &Path, content: &[u8]) -> Result<TextAnnotation, OcrError>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn annotate(&self, path: &Path, content: &[u8]) -> Result<TextAnnotation, OcrError> {
        (**self).annotate(path, content)
    }
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

impl AnnotateRequest<'static> {
    fn document_text(content: &[u8]) -> Self {
        Self {
            requests: [ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(content),
                },
                features: [Feature {
                    kind: DOCUMENT_TEXT_DETECTION,
                }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BatchResponse {
    responses: Vec<AnnotateImageResponse>,
}

/// One entry of an `images:annotate` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotateImageResponse {
    pub full_text_annotation: Option<TextAnnotation>,
    pub error: Option<RpcStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RpcStatus {
    pub code: i32,
    pub message: String,
}

impl AnnotateImageResponse {
    /// A page without text comes back without an annotation; that is an
    /// empty tree, not an error.
    pub fn into_annotation(self) -> Result<TextAnnotation, OcrError> {
        match self.error {
            Some(RpcStatus { code, message }) if code != 0 => {
                Err(OcrError::Service { code, message })
            }
            _ => Ok(self.full_text_annotation.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone)]
enum Credentials {
    ApiKey(String),
    BearerToken(String),
}

pub struct VisionClientBuilder {
    endpoint: String,
    api_key: Option<String>,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl VisionClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip(self), level = "debug")]
    pub fn build(self) -> Result<VisionClient, OcrError> {
        let http = Client::builder().timeout(self.timeout).build()?;
        let credentials = match (self.api_key, self.bearer_token) {
            (Some(key), _) => Some(Credentials::ApiKey(key)),
            (None, Some(token)) => Some(Credentials::BearerToken(token)),
            (None, None) => None,
        };
        if credentials.is_none() {
            log::warn!("No Vision credentials configured, text analysis will be unavailable");
        }
        Ok(VisionClient {
            http,
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

impl Default for VisionClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
            bearer_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Google Cloud Vision document text detection over REST.
pub struct VisionClient {
    http: Client,
    endpoint: String,
    credentials: Option<Credentials>,
}

impl VisionClient {
    pub fn builder() -> VisionClientBuilder {
        VisionClientBuilder::new()
    }
}

impl TextRecognizer for VisionClient {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    fn annotate(&self, path: &Path, content: &[u8]) -> Result<TextAnnotation, OcrError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(OcrError::MissingCredentials)?;
        let request = self
            .http
            .post(format!("{}/v1/images:annotate", self.endpoint))
            .json(&AnnotateRequest::document_text(content));
        let request = match credentials {
            Credentials::ApiKey(key) => request.query(&[("key", key)]),
            Credentials::BearerToken(token) => request.bearer_auth(token),
        };

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let batch = response.json::<BatchResponse>()?;
        log::trace!("Vision returned {} responses", batch.responses.len());
        batch
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::InvalidResponse("no response for the submitted image".into()))?
            .into_annotation()
    }
}

/// Previously saved Vision responses, read from `<dir>/<file name>.json`.
///
/// Each file holds either a whole `AnnotateImageResponse` or just its
/// `fullTextAnnotation`.
#[derive(Debug, Clone)]
pub struct StoredAnnotations {
    dir: PathBuf,
}

impl StoredAnnotations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn annotation_path(&self, image_path: &Path) -> Option<PathBuf> {
        let file_name = image_path.file_name()?.to_string_lossy();
        Some(self.dir.join(format!("{file_name}.json")))
    }
}

impl TextRecognizer for StoredAnnotations {
    #[instrument(level = "debug", skip(self, _content))]
    fn annotate(&self, path: &Path, _content: &[u8]) -> Result<TextAnnotation, OcrError> {
        let stored = self
            .annotation_path(path)
            .filter(|stored| stored.is_file())
            .ok_or_else(|| OcrError::NotFound(path.to_path_buf()))?;
        let json = fs::read_to_string(&stored)?;
        let response = serde_json::from_str::<AnnotateImageResponse>(&json)?;
        if response.full_text_annotation.is_none() && response.error.is_none() {
            return Ok(serde_json::from_str::<TextAnnotation>(&json)?);
        }
        response.into_annotation()
    }
}
