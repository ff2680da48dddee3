//! Wire-level tests for the portal clients against canned HTTP responses.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use dronewatch::portal::api::{self, DetectionsError};
use dronewatch::portal::upload::{self, UploadError};

/// Serve one canned response and hand back the request bytes the client sent.
fn serve_once(response: String) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 64 * 1024];
            while !request_complete(&captured) {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(read) => captured.extend_from_slice(&buf[..read]),
                }
            }
            let _ = stream.write_all(response.as_bytes());
        }
        captured
    });
    (format!("http://{addr}"), handle)
}

/// Headers fully received, plus the declared body when one is announced.
fn request_complete(captured: &[u8]) -> bool {
    let Some(header_end) = captured
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
    else {
        return false;
    };
    let head = String::from_utf8_lossy(&captured[..header_end]);
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    captured.len() >= header_end + 4 + content_length
}

fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

#[test]
fn fetch_detections_hits_endpoint_and_parses_rows() {
    let body = r#"[{"label": "child", "confidence": 0.91, "timestamp": 1726000000.25}]"#;
    let (base, request) = serve_once(json_response(body));

    let detections = api::fetch_detections(&base).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "child");
    assert!((detections[0].confidence - 0.91).abs() < 1e-9);

    let request = String::from_utf8(request.join().unwrap()).unwrap();
    assert!(request.starts_with("GET /get_detections HTTP/1.1\r\n"));
}

#[test]
fn fetch_detections_surfaces_server_errors() {
    let (base, _request) = serve_once(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\n\r\nboom!".to_string(),
    );
    match api::fetch_detections(&base) {
        Err(DetectionsError::ServerError(message)) => {
            assert!(message.contains("HTTP 500"), "got: {message}");
            assert!(message.contains("boom!"), "got: {message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn fetch_detections_rejects_malformed_body() {
    let (base, _request) = serve_once(json_response("{\"not\": \"an array\"}"));
    assert!(matches!(
        api::fetch_detections(&base),
        Err(DetectionsError::Json(_))
    ));
}

#[test]
fn upload_posts_multipart_and_returns_storage_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"not really a video").unwrap();

    let (base, request) = serve_once(json_response("{\"file_path\": \"/srv/uploads/clip.mp4\"}"));
    let stored = upload::upload_file(&base, &path).unwrap();
    assert_eq!(stored, "/srv/uploads/clip.mp4");

    let request = String::from_utf8_lossy(&request.join().unwrap()).into_owned();
    assert!(request.starts_with("POST /upload HTTP/1.1\r\n"));
    assert!(request.contains("multipart/form-data; boundary="));
    assert!(request.contains("name=\"file\"; filename=\"clip.mp4\""));
    assert!(request.contains("Content-Type: video/mp4"));
    assert!(request.contains("not really a video"));
    // The body is streamed with an explicit length, not chunked.
    let headers = request.to_ascii_lowercase();
    assert!(headers.contains("content-length:"));
    assert!(!headers.contains("transfer-encoding"));
}

#[test]
fn upload_maps_error_field_to_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let (base, _request) = serve_once(json_response("{\"error\": \"unsupported type\"}"));
    match upload::upload_file(&base, &path) {
        Err(UploadError::Rejected(message)) => assert_eq!(message, "unsupported type"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn upload_reports_missing_local_file() {
    // No server needed; the read fails before any request is made.
    let missing = std::path::Path::new("/nonexistent/clip.mp4");
    match upload::upload_file("http://127.0.0.1:1", missing) {
        Err(UploadError::ReadFile { path, .. }) => {
            assert_eq!(path, missing.to_path_buf());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
