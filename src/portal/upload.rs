//! Multipart upload client for the portal's `/upload` endpoint.
//!
//! The server accepts a single `file` form field and answers with JSON:
//! `{"file_path": "..."}` on success or `{"error": "..."}` when it refuses
//! the file. The returned storage path is what the processed-file feed is
//! later parameterized with.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use url::Url;

use crate::http_client;

const MAX_UPLOAD_RESPONSE_BYTES: usize = 64 * 1024;

/// Coarse media classification used to pick the local preview rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Still image; previewed by decoding it locally.
    Image,
    /// Video container; previewed as a file card (no local decoding).
    Video,
    /// Anything else.
    Other,
}

impl MediaKind {
    /// Classify a file by extension.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return Self::Other;
        };
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => Self::Image,
            "mp4" | "avi" | "mov" | "mkv" | "webm" => Self::Video,
            _ => Self::Other,
        }
    }

    /// Content type declared for the multipart file part.
    pub fn content_type(self, path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match self {
            Self::Image => match ext.as_str() {
                "png" => "image/png".into(),
                "gif" => "image/gif".into(),
                "bmp" => "image/bmp".into(),
                "webp" => "image/webp".into(),
                _ => "image/jpeg".into(),
            },
            Self::Video => match ext.as_str() {
                "webm" => "video/webm".into(),
                "avi" => "video/x-msvideo".into(),
                "mov" => "video/quicktime".into(),
                "mkv" => "video/x-matroska".into(),
                _ => "video/mp4".into(),
            },
            Self::Other => "application/octet-stream".into(),
        }
    }
}

/// Errors from the upload endpoint.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The configured base URL does not parse.
    #[error("Invalid portal base URL: {0}")]
    BadBaseUrl(#[from] url::ParseError),
    /// The local file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The server answered with an application-level `{error}` field or
    /// without a storage path.
    #[error("Upload rejected: {0}")]
    Rejected(String),
    /// Non-success HTTP status from the portal.
    #[error("Server error: {0}")]
    ServerError(String),
    /// Connection-level failure.
    #[error("HTTP error: {0}")]
    Transport(String),
    /// The body was not the expected JSON object.
    #[error("JSON error: {0}")]
    Json(String),
}

/// Upload a local file and return the server-side storage path.
pub fn upload_file(base: &str, path: &Path) -> Result<String, UploadError> {
    let mut url = Url::parse(base)?;
    url.set_path("/upload");

    let file = File::open(path).map_err(|source| UploadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file_len = file
        .metadata()
        .map_err(|source| UploadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    let file_name = sanitize_file_name(
        &path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string()),
    );
    let content_type = MediaKind::from_path(path).content_type(path);

    let boundary = make_boundary();
    let prologue = multipart_prologue(&boundary, "file", &file_name, &content_type);
    let epilogue = multipart_epilogue(&boundary);
    let body_len = prologue.len() as u64 + file_len + epilogue.len() as u64;
    // The file is streamed, not buffered; large videos never land in memory.
    let body = Cursor::new(prologue)
        .chain(file)
        .chain(Cursor::new(epilogue));

    let request = http_client::agent()
        .post(url.as_str())
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={boundary}"),
        )
        .set("Content-Length", &body_len.to_string());

    let response = match request.send(body) {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = read_body(response).unwrap_or_else(|err| err);
            return Err(UploadError::ServerError(format!("HTTP {code}: {body}")));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(UploadError::Transport(err.to_string()));
        }
    };

    let body = read_body(response).map_err(UploadError::Json)?;
    parse_upload_response(&body)
}

#[derive(Debug, Deserialize)]
struct UploadResponseWire {
    file_path: Option<String>,
    error: Option<String>,
}

fn parse_upload_response(body: &str) -> Result<String, UploadError> {
    let wire: UploadResponseWire =
        serde_json::from_str(body).map_err(|err| UploadError::Json(err.to_string()))?;
    if let Some(file_path) = wire.file_path {
        if !file_path.is_empty() {
            return Ok(file_path);
        }
    }
    Err(UploadError::Rejected(
        wire.error
            .unwrap_or_else(|| "response missing file_path".to_string()),
    ))
}

/// Everything in the `multipart/form-data` body that precedes the payload.
fn multipart_prologue(
    boundary: &str,
    field: &str,
    file_name: &str,
    content_type: &str,
) -> Vec<u8> {
    let mut head = Vec::with_capacity(256);
    head.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    head.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    head.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    head
}

fn multipart_epilogue(boundary: &str) -> Vec<u8> {
    format!("\r\n--{boundary}--\r\n").into_bytes()
}

/// Quotes and control characters would corrupt the part header.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch == '"' || ch.is_control() { '_' } else { ch })
        .collect()
}

fn make_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    format!("dronewatch-{nanos:032x}")
}

fn read_body(response: ureq::Response) -> Result<String, String> {
    let bytes = http_client::read_response_bytes(response, MAX_UPLOAD_RESPONSE_BYTES)
        .map_err(|err| err.to_string())?;
    String::from_utf8(bytes).map_err(|err| err.to_string())
}
