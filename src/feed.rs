//! MJPEG feed streaming.
//!
//! The portal's `/video_feed` and `/video_file_feed` endpoints emit a
//! `multipart/x-mixed-replace` stream of JPEG stills. The reader runs on a
//! background thread: it splits the byte stream into complete JPEG frames,
//! decodes them, and forwards them over a channel until the stream ends or
//! the owning preview session cancels it.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use url::Url;

use crate::http_client;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on buffered bytes while waiting for a frame to complete.
const MAX_PENDING_BYTES: usize = 8 * 1024 * 1024;

/// Consecutive decode failures tolerated before the stream is abandoned.
const MAX_DECODE_FAILURES: u32 = 8;

/// Messages emitted by a feed reader thread.
pub enum FeedEvent {
    /// A decoded frame ready for display.
    Frame(egui::ColorImage),
    /// The stream ended; `Ok` means the server closed it cleanly.
    Closed(Result<(), FeedError>),
}

/// Errors that terminate a feed stream.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Non-success HTTP status when opening the stream.
    #[error("Feed unavailable: {0}")]
    Status(String),
    /// Connection-level failure.
    #[error("Feed connection failed: {0}")]
    Transport(String),
    /// Read failure mid-stream.
    #[error("Feed read failed: {0}")]
    Io(String),
    /// The stream stopped producing decodable frames.
    #[error("Feed produced undecodable frames: {0}")]
    Decode(String),
}

/// Incremental splitter that extracts complete JPEG frames from a byte
/// stream, discarding the multipart chrome between them.
#[derive(Default)]
pub struct FrameScanner {
    pending: Vec<u8>,
}

impl FrameScanner {
    /// Create an empty scanner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of stream bytes and return any completed JPEG frames.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.pending, SOI) else {
                // No frame start in sight; keep one byte in case a marker
                // straddles the chunk boundary.
                if self.pending.len() > 1 {
                    let tail = self.pending.len() - 1;
                    self.pending.drain(..tail);
                }
                break;
            };
            let Some(rel_end) = find_marker(&self.pending[start + SOI.len()..], EOI) else {
                if start > 0 {
                    self.pending.drain(..start);
                }
                if self.pending.len() > MAX_PENDING_BYTES {
                    self.pending.clear();
                }
                break;
            };
            let end = start + SOI.len() + rel_end + EOI.len();
            frames.push(self.pending[start..end].to_vec());
            self.pending.drain(..end);
        }
        frames
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack
        .windows(marker.len())
        .position(|window| window == marker)
}

/// Decode one JPEG frame into an egui image.
pub fn decode_frame(jpeg: &[u8]) -> Result<egui::ColorImage, image::ImageError> {
    let decoded = image::load_from_memory(jpeg)?.to_rgba8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        size,
        decoded.as_raw(),
    ))
}

/// Stream a feed URL until it ends or `cancel` is set.
///
/// Blocking; callers run it on a dedicated thread. Frames and the final
/// close notification are delivered through `tx`. When cancelled, the
/// reader returns without sending anything further.
pub fn run_feed_reader(url: Url, cancel: Arc<AtomicBool>, tx: Sender<FeedEvent>) {
    let outcome = read_stream(&url, &cancel, &tx);
    if cancel.load(Ordering::Relaxed) {
        return;
    }
    let _ = tx.send(FeedEvent::Closed(outcome));
}

fn read_stream(
    url: &Url,
    cancel: &AtomicBool,
    tx: &Sender<FeedEvent>,
) -> Result<(), FeedError> {
    let response = match http_client::agent().get(url.as_str()).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            return Err(FeedError::Status(format!("HTTP {code}")));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(FeedError::Transport(err.to_string()));
        }
    };

    let mut reader = response.into_reader();
    let mut scanner = FrameScanner::new();
    let mut buf = [0u8; 64 * 1024];
    let mut decode_failures = 0u32;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(());
        }
        let read = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(err) => {
                if cancel.load(Ordering::Relaxed) {
                    return Ok(());
                }
                return Err(FeedError::Io(err.to_string()));
            }
        };
        for jpeg in scanner.push(&buf[..read]) {
            match decode_frame(&jpeg) {
                Ok(image) => {
                    decode_failures = 0;
                    if tx.send(FeedEvent::Frame(image)).is_err() {
                        // Receiver dropped; the session is gone.
                        return Ok(());
                    }
                }
                Err(err) => {
                    decode_failures += 1;
                    tracing::warn!("Dropping undecodable feed frame: {err}");
                    if decode_failures >= MAX_DECODE_FAILURES {
                        return Err(FeedError::Decode(err.to_string()));
                    }
                }
            }
        }
    }
}
