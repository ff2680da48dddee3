//! Detection list client and feed URL builders.

use serde::Deserialize;
use url::Url;

use crate::http_client;

const MAX_DETECTIONS_RESPONSE_BYTES: usize = 256 * 1024;

/// One inference result returned by the detection service.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Detection {
    /// Class label assigned by the model.
    pub label: String,
    /// Confidence in the 0–1 range.
    pub confidence: f64,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Which rendering of the live camera feed to stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedMode {
    /// Unannotated camera frames.
    Raw,
    /// Frames annotated with detection overlays.
    Processed,
}

impl FeedMode {
    fn query_value(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Processed => "processed",
        }
    }
}

/// Errors from the detections endpoint.
#[derive(Debug, thiserror::Error)]
pub enum DetectionsError {
    /// The configured base URL does not parse.
    #[error("Invalid portal base URL: {0}")]
    BadBaseUrl(#[from] url::ParseError),
    /// Non-success HTTP status from the portal.
    #[error("Server error: {0}")]
    ServerError(String),
    /// Connection-level failure.
    #[error("HTTP error: {0}")]
    Transport(String),
    /// The body was not the expected JSON array.
    #[error("JSON error: {0}")]
    Json(String),
}

/// URL of the live camera stream in the requested mode.
pub fn feed_url(base: &str, mode: FeedMode) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.set_path("/video_feed");
    url.query_pairs_mut().append_pair("mode", mode.query_value());
    Ok(url)
}

/// URL of the processed playback stream for an uploaded file.
///
/// The storage path is the one the upload endpoint returned; it is
/// percent-encoded into the query string.
pub fn file_feed_url(base: &str, file_path: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.set_path("/video_file_feed");
    url.query_pairs_mut().append_pair("file_path", file_path);
    Ok(url)
}

/// Fetch the current detection list from the portal.
pub fn fetch_detections(base: &str) -> Result<Vec<Detection>, DetectionsError> {
    let mut url = Url::parse(base)?;
    url.set_path("/get_detections");

    let response = match http_client::agent().get(url.as_str()).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = read_body(response).unwrap_or_else(|err| err);
            return Err(DetectionsError::ServerError(format!("HTTP {code}: {body}")));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(DetectionsError::Transport(err.to_string()));
        }
    };

    let body = read_body(response).map_err(DetectionsError::Json)?;
    parse_detections(&body)
}

fn read_body(response: ureq::Response) -> Result<String, String> {
    let bytes = http_client::read_response_bytes(response, MAX_DETECTIONS_RESPONSE_BYTES)
        .map_err(|err| err.to_string())?;
    String::from_utf8(bytes).map_err(|err| err.to_string())
}

fn parse_detections(body: &str) -> Result<Vec<Detection>, DetectionsError> {
    serde_json::from_str(body).map_err(|err| DetectionsError::Json(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_carries_mode_query() {
        let raw = feed_url("http://127.0.0.1:5000", FeedMode::Raw).unwrap();
        assert_eq!(raw.as_str(), "http://127.0.0.1:5000/video_feed?mode=raw");
        let processed = feed_url("http://127.0.0.1:5000", FeedMode::Processed).unwrap();
        assert_eq!(
            processed.as_str(),
            "http://127.0.0.1:5000/video_feed?mode=processed"
        );
    }

    #[test]
    fn file_feed_url_encodes_storage_path() {
        let url = file_feed_url("http://host:5000", "/tmp/a.mp4").unwrap();
        assert_eq!(
            url.as_str(),
            "http://host:5000/video_file_feed?file_path=%2Ftmp%2Fa.mp4"
        );

        let spaced = file_feed_url("http://host:5000", "uploads/clip one.mp4").unwrap();
        assert!(spaced.as_str().contains("clip+one.mp4"));
    }

    #[test]
    fn parses_detection_array() {
        let body = r#"[
            {"label": "child", "confidence": 0.87, "timestamp": 1726000000.5},
            {"label": "adult", "confidence": 0.6, "timestamp": 1726000001}
        ]"#;
        let detections = parse_detections(body).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "child");
        assert!((detections[0].confidence - 0.87).abs() < 1e-9);
        assert_eq!(detections[1].timestamp, 1_726_000_001.0);
    }

    #[test]
    fn empty_array_is_valid() {
        assert_eq!(parse_detections("[]").unwrap(), Vec::new());
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(matches!(
            parse_detections("{\"error\": \"nope\"}"),
            Err(DetectionsError::Json(_))
        ));
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            fetch_detections("not a url"),
            Err(DetectionsError::BadBaseUrl(_))
        ));
    }
}
