//! Preview state machine for the module page.
//!
//! All mutable session state lives on [`PreviewController`]: the active
//! preview source, the recorded upload path, and the background jobs. Every
//! transition tears the previous preview down first, and each teardown bumps
//! a generation counter so responses from superseded sessions are discarded
//! when they eventually arrive.

mod jobs;

use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;

use jobs::{ControllerJobs, JobMessage};

use crate::config::{self, AppConfig, ConfigError};
use crate::egui_app::state::{
    NoticeState, PreviewContent, Route, StatusLineState, StatusTone, UiState,
};
use crate::egui_app::view_model;
use crate::feed::FeedError;
use crate::portal::api::{self, FeedMode};
use crate::portal::upload::MediaKind;

/// Active origin of the displayed media.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewSource {
    /// No preview selected.
    Idle,
    /// Raw live camera feed.
    Camera,
    /// Locally selected and uploaded file.
    File,
    /// Annotated live camera feed with the detection poll running.
    ProcessedCamera,
    /// Annotated playback of the uploaded file with the poll running.
    ProcessedFile,
}

/// Maintains app state and bridges the portal clients to the egui UI.
pub struct PreviewController {
    /// UI model consumed by the renderer.
    pub ui: UiState,
    config: AppConfig,
    source: PreviewSource,
    uploaded_path: Option<String>,
    pending_upload: Option<PathBuf>,
    generation: u64,
    jobs: ControllerJobs,
}

impl PreviewController {
    /// Create an idle controller with default configuration.
    pub fn new() -> Self {
        Self {
            ui: UiState::default(),
            config: AppConfig::default(),
            source: PreviewSource::Idle,
            uploaded_path: None,
            pending_upload: None,
            generation: 0,
            jobs: ControllerJobs::new(),
        }
    }

    /// Load persisted config and derive the greeting and header badge.
    pub fn load_configuration(&mut self) -> Result<(), ConfigError> {
        self.config = config::load_or_default()?;
        let display = self.config.operator.display().to_string();
        self.ui.greeting = view_model::greeting_line(&display, view_model::MODULE_HEADING);
        self.ui.header_initials = view_model::initials_badge(&display);
        Ok(())
    }

    /// Current preview source.
    pub fn source(&self) -> PreviewSource {
        self.source
    }

    /// Server-side storage path of the last successful upload.
    pub fn uploaded_path(&self) -> Option<&str> {
        self.uploaded_path.as_deref()
    }

    /// Whether the detection poll is running.
    pub fn poll_active(&self) -> bool {
        self.jobs.poll_active()
    }

    /// Whether a feed stream is running.
    pub fn feed_active(&self) -> bool {
        self.jobs.feed_active()
    }

    /// Whether the renderer should keep repainting for background work.
    pub fn background_work_active(&self) -> bool {
        self.jobs.feed_active() || self.jobs.poll_active()
    }

    /// Enter the module screen.
    pub fn open_module(&mut self) {
        self.ui.route = Route::Module;
    }

    /// Leave the module screen, tearing any preview down.
    pub fn go_back(&mut self) {
        self.clear_preview();
        self.ui.status = StatusLineState::idle();
        self.ui.route = Route::Dashboard;
    }

    /// Idempotent teardown: stops the feed and the poll, empties the
    /// preview area, and invalidates in-flight responses.
    pub fn clear_preview(&mut self) {
        self.jobs.cancel_feed();
        self.jobs.cancel_poll();
        self.generation = self.generation.wrapping_add(1);
        self.source = PreviewSource::Idle;
        self.ui.preview.content = PreviewContent::Empty;
        self.ui.preview.frame_serial = self.ui.preview.frame_serial.wrapping_add(1);
    }

    /// Show the raw live camera feed.
    pub fn start_live_preview(&mut self) {
        self.clear_preview();
        let url = match api::feed_url(&self.config.portal.base_url, FeedMode::Raw) {
            Ok(url) => url,
            Err(err) => {
                self.notify("Camera", format!("Unable to start camera stream: {err}"));
                return;
            }
        };
        self.jobs.begin_feed(url, self.generation);
        self.source = PreviewSource::Camera;
        self.ui.preview.content = PreviewContent::Stream {
            label: "Live camera".into(),
            latest: None,
        };
        self.ui.status = StatusLineState::new("Streaming live camera", StatusTone::Active);
    }

    /// Open the native picker and hand any chosen file to the upload flow.
    pub fn pick_local_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter(
                "Media",
                &["jpg", "jpeg", "png", "gif", "bmp", "webp", "mp4", "avi", "mov", "mkv", "webm"],
            )
            .pick_file();
        if let Some(path) = picked {
            self.file_selected(path);
        }
    }

    /// Upload a selected file; the preview appears once the server accepts it.
    pub fn file_selected(&mut self, path: PathBuf) {
        self.clear_preview();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.ui.status = StatusLineState::new(format!("Uploading {name}"), StatusTone::Active);
        self.pending_upload = Some(path.clone());
        self.jobs
            .begin_upload(self.config.portal.base_url.clone(), path, self.generation);
    }

    /// Switch the active source to its processed rendering and start the poll.
    pub fn run_detection(&mut self) {
        match self.source {
            PreviewSource::Camera => {
                self.clear_preview();
                let url = match api::feed_url(&self.config.portal.base_url, FeedMode::Processed) {
                    Ok(url) => url,
                    Err(err) => {
                        self.notify("Camera", format!("Unable to start camera stream: {err}"));
                        return;
                    }
                };
                self.jobs.begin_feed(url, self.generation);
                self.source = PreviewSource::ProcessedCamera;
                self.ui.preview.content = PreviewContent::Stream {
                    label: "Processed camera feed".into(),
                    latest: None,
                };
                self.notify("Detection", "Detection started on live camera feed!");
                self.start_poll();
            }
            PreviewSource::File => {
                let Some(file_path) = self.uploaded_path.clone() else {
                    self.notify("Detection", "No file uploaded.");
                    return;
                };
                self.clear_preview();
                let url = match api::file_feed_url(&self.config.portal.base_url, &file_path) {
                    Ok(url) => url,
                    Err(err) => {
                        self.notify("Playback", format!("Unable to start playback: {err}"));
                        return;
                    }
                };
                self.jobs.begin_feed(url, self.generation);
                self.source = PreviewSource::ProcessedFile;
                self.ui.preview.content = PreviewContent::Stream {
                    label: "Processed file playback".into(),
                    latest: None,
                };
                self.start_poll();
            }
            _ => {
                self.notify("Detection", "Select Real-time or Local file first.");
            }
        }
    }

    fn start_poll(&mut self) {
        self.jobs
            .begin_detection_poll(self.config.portal.base_url.clone(), self.generation);
        self.ui.status = StatusLineState::new("Detection running", StatusTone::Active);
    }

    /// Dismiss the active blocking notification.
    pub fn dismiss_notice(&mut self) {
        self.ui.notice = None;
    }

    fn notify(&mut self, title: &str, message: impl Into<String>) {
        self.ui.notice = Some(NoticeState::new(title, message));
    }

    /// Drain background-job messages; called once per rendered frame.
    pub fn process_background_messages(&mut self) {
        loop {
            match self.jobs.try_recv_message() {
                Ok(message) => self.apply_message(message),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_message(&mut self, message: JobMessage) {
        match message {
            JobMessage::Frame { generation, image } => {
                if generation != self.generation {
                    return;
                }
                if let PreviewContent::Stream { latest, .. } = &mut self.ui.preview.content {
                    *latest = Some(image);
                    self.ui.preview.frame_serial = self.ui.preview.frame_serial.wrapping_add(1);
                }
            }
            JobMessage::FeedClosed { generation, result } => {
                if generation != self.generation {
                    return;
                }
                self.handle_feed_closed(result);
            }
            JobMessage::UploadFinished { generation, result } => {
                if generation != self.generation {
                    return;
                }
                self.handle_upload_finished(result);
            }
            JobMessage::DetectionsFetched { generation, result } => {
                if generation != self.generation {
                    return;
                }
                match result {
                    Ok(detections) => {
                        self.ui.detections.rows =
                            view_model::detection_rows(&detections, view_model::local_offset());
                    }
                    Err(err) => {
                        // Skip the tick and try again next period.
                        tracing::warn!("Detection poll failed: {err}");
                    }
                }
            }
        }
    }

    fn handle_feed_closed(&mut self, result: Result<(), FeedError>) {
        let was_camera = matches!(
            self.source,
            PreviewSource::Camera | PreviewSource::ProcessedCamera
        );
        self.clear_preview();
        match result {
            Ok(()) => {
                self.ui.status = StatusLineState::new("Stream ended", StatusTone::Idle);
            }
            Err(err) => {
                self.ui.status = StatusLineState::new("Stream failed", StatusTone::Error);
                if was_camera {
                    self.notify("Camera", format!("Unable to start camera stream: {err}"));
                } else {
                    self.notify("Playback", format!("Stream error: {err}"));
                }
            }
        }
    }

    fn handle_upload_finished(&mut self, result: Result<String, crate::portal::upload::UploadError>) {
        let local_path = self.pending_upload.take();
        match result {
            Ok(file_path) => {
                self.uploaded_path = Some(file_path);
                self.source = PreviewSource::File;
                self.ui.preview.content = local_path
                    .map(|path| local_preview_content(&path))
                    .unwrap_or(PreviewContent::Empty);
                self.ui.preview.frame_serial = self.ui.preview.frame_serial.wrapping_add(1);
                self.ui.status =
                    StatusLineState::new("File uploaded; ready to run detection", StatusTone::Idle);
            }
            Err(err) => {
                self.source = PreviewSource::Idle;
                self.ui.preview.content = PreviewContent::Empty;
                self.ui.status = StatusLineState::new("Upload failed", StatusTone::Error);
                self.notify("Upload", format!("Upload failed: {err}"));
            }
        }
    }

    #[cfg(test)]
    fn set_base_url(&mut self, base_url: &str) {
        self.config.portal.base_url = base_url.to_string();
    }

    #[cfg(test)]
    fn force_source(&mut self, source: PreviewSource) {
        self.source = source;
    }
}

impl Default for PreviewController {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the local preview for an accepted file: images are decoded, videos
/// and anything else become a file card.
fn local_preview_content(path: &std::path::Path) -> PreviewContent {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    if MediaKind::from_path(path) == MediaKind::Image {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(image) = crate::feed::decode_frame(&bytes) {
                return PreviewContent::LocalImage { name, image };
            }
        }
    }
    let size_bytes = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    PreviewContent::FileCard { name, size_bytes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::api::Detection;
    use crate::portal::upload::UploadError;

    fn detection(label: &str, confidence: f64) -> Detection {
        Detection {
            label: label.into(),
            confidence,
            timestamp: 1_700_000_000.0,
        }
    }

    #[test]
    fn clear_preview_is_idempotent_when_idle() {
        let mut controller = PreviewController::new();
        controller.clear_preview();
        controller.clear_preview();
        assert_eq!(controller.source(), PreviewSource::Idle);
        assert!(controller.ui.notice.is_none());
        assert!(!controller.poll_active());
        assert!(!controller.feed_active());
    }

    #[test]
    fn run_without_source_notifies() {
        let mut controller = PreviewController::new();
        controller.run_detection();
        let notice = controller.ui.notice.take().expect("notice expected");
        assert_eq!(notice.message, "Select Real-time or Local file first.");
        assert!(!controller.poll_active());
    }

    #[test]
    fn run_on_file_without_upload_notifies_and_keeps_preview() {
        let mut controller = PreviewController::new();
        controller.force_source(PreviewSource::File);
        controller.run_detection();
        let notice = controller.ui.notice.take().expect("notice expected");
        assert_eq!(notice.message, "No file uploaded.");
        assert_eq!(controller.source(), PreviewSource::File);
        assert!(matches!(
            controller.ui.preview.content,
            PreviewContent::Empty
        ));
        assert!(!controller.poll_active());
    }

    #[test]
    fn run_on_camera_starts_processed_feed_and_poll() {
        let mut controller = PreviewController::new();
        controller.set_base_url("http://127.0.0.1:9");
        controller.force_source(PreviewSource::Camera);
        controller.run_detection();
        assert_eq!(controller.source(), PreviewSource::ProcessedCamera);
        assert!(controller.feed_active());
        assert!(controller.poll_active());
        let notice = controller.ui.notice.take().expect("notice expected");
        assert_eq!(notice.message, "Detection started on live camera feed!");
        controller.clear_preview();
        assert!(!controller.feed_active());
        assert!(!controller.poll_active());
    }

    #[test]
    fn run_on_uploaded_file_starts_feed_and_poll() {
        let mut controller = PreviewController::new();
        controller.set_base_url("http://127.0.0.1:9");
        controller.force_source(PreviewSource::File);
        controller.uploaded_path = Some("/tmp/a.mp4".into());
        controller.run_detection();
        assert_eq!(controller.source(), PreviewSource::ProcessedFile);
        assert!(controller.feed_active());
        assert!(controller.poll_active());
        controller.clear_preview();
        assert!(!controller.feed_active());
        assert!(!controller.poll_active());
    }

    #[test]
    fn poll_result_rebuilds_all_rows() {
        let mut controller = PreviewController::new();
        controller.jobs.inject_message(JobMessage::DetectionsFetched {
            generation: controller.generation,
            result: Ok(vec![detection("adult", 0.6), detection("child", 0.9)]),
        });
        controller.process_background_messages();
        assert_eq!(controller.ui.detections.rows.len(), 2);
        assert!(controller.ui.detections.rows[1].highlighted);

        controller.jobs.inject_message(JobMessage::DetectionsFetched {
            generation: controller.generation,
            result: Ok(vec![detection("drone", 0.5)]),
        });
        controller.process_background_messages();
        assert_eq!(controller.ui.detections.rows.len(), 1);
        assert_eq!(controller.ui.detections.rows[0].label, "drone");
    }

    #[test]
    fn poll_failure_keeps_previous_rows() {
        let mut controller = PreviewController::new();
        controller.jobs.inject_message(JobMessage::DetectionsFetched {
            generation: controller.generation,
            result: Ok(vec![detection("adult", 0.6)]),
        });
        controller.process_background_messages();
        controller.jobs.inject_message(JobMessage::DetectionsFetched {
            generation: controller.generation,
            result: Err(crate::portal::api::DetectionsError::Transport(
                "refused".into(),
            )),
        });
        controller.process_background_messages();
        assert_eq!(controller.ui.detections.rows.len(), 1);
    }

    #[test]
    fn stale_generation_messages_are_discarded() {
        let mut controller = PreviewController::new();
        let stale = controller.generation;
        controller.clear_preview();
        controller.jobs.inject_message(JobMessage::DetectionsFetched {
            generation: stale,
            result: Ok(vec![detection("adult", 0.6)]),
        });
        controller.jobs.inject_message(JobMessage::UploadFinished {
            generation: stale,
            result: Ok("/srv/uploads/old.mp4".into()),
        });
        controller.process_background_messages();
        assert!(controller.ui.detections.rows.is_empty());
        assert_eq!(controller.uploaded_path(), None);
        assert_eq!(controller.source(), PreviewSource::Idle);
    }

    #[test]
    fn upload_success_records_path_and_enters_file_state() {
        let mut controller = PreviewController::new();
        controller.pending_upload = Some(PathBuf::from("clip.mp4"));
        controller.jobs.inject_message(JobMessage::UploadFinished {
            generation: controller.generation,
            result: Ok("/srv/uploads/clip.mp4".into()),
        });
        controller.process_background_messages();
        assert_eq!(controller.source(), PreviewSource::File);
        assert_eq!(controller.uploaded_path(), Some("/srv/uploads/clip.mp4"));
        assert!(matches!(
            controller.ui.preview.content,
            PreviewContent::FileCard { .. }
        ));
        assert!(controller.ui.notice.is_none());
    }

    #[test]
    fn upload_rejection_surfaces_notice_and_leaves_idle() {
        let mut controller = PreviewController::new();
        controller.pending_upload = Some(PathBuf::from("clip.mp4"));
        controller.jobs.inject_message(JobMessage::UploadFinished {
            generation: controller.generation,
            result: Err(UploadError::Rejected("unsupported type".into())),
        });
        controller.process_background_messages();
        assert_eq!(controller.source(), PreviewSource::Idle);
        assert_eq!(controller.uploaded_path(), None);
        let notice = controller.ui.notice.take().expect("notice expected");
        assert_eq!(notice.message, "Upload failed: Upload rejected: unsupported type");
        assert!(matches!(
            controller.ui.preview.content,
            PreviewContent::Empty
        ));
    }

    #[test]
    fn back_navigation_tears_preview_down() {
        let mut controller = PreviewController::new();
        controller.open_module();
        controller.set_base_url("http://127.0.0.1:9");
        controller.start_live_preview();
        assert_eq!(controller.source(), PreviewSource::Camera);
        controller.go_back();
        assert_eq!(controller.ui.route, Route::Dashboard);
        assert_eq!(controller.source(), PreviewSource::Idle);
        assert!(!controller.feed_active());
    }
}
