//! Shared state types for the egui UI.

use egui::Color32;

/// Which screen the app is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Landing screen listing the available module.
    Dashboard,
    /// The detection module controls.
    Module,
}

/// Top-level UI model consumed by the egui renderer.
pub struct UiState {
    /// Current screen.
    pub route: Route,
    /// Greeting line shown above the module controls.
    pub greeting: String,
    /// Initials badge shown in the header.
    pub header_initials: String,
    /// Preview area contents.
    pub preview: PreviewPanelState,
    /// Detection results table.
    pub detections: DetectionTableState,
    /// Active blocking notification, if any.
    pub notice: Option<NoticeState>,
    /// Footer status line.
    pub status: StatusLineState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            route: Route::Dashboard,
            greeting: String::new(),
            header_initials: String::new(),
            preview: PreviewPanelState::default(),
            detections: DetectionTableState::default(),
            notice: None,
            status: StatusLineState::idle(),
        }
    }
}

/// What the preview area is currently showing.
#[derive(Default)]
pub enum PreviewContent {
    /// Nothing selected yet.
    #[default]
    Empty,
    /// A live MJPEG stream; `latest` is replaced as frames arrive.
    Stream {
        /// Caption under the stream.
        label: String,
        /// Most recent decoded frame, if one has arrived.
        latest: Option<egui::ColorImage>,
    },
    /// A locally decoded still image.
    LocalImage {
        /// File name shown as caption.
        name: String,
        /// Decoded image.
        image: egui::ColorImage,
    },
    /// A selected file that is not decoded locally (videos).
    FileCard {
        /// File name.
        name: String,
        /// Size on disk.
        size_bytes: u64,
    },
}

/// Preview area state.
#[derive(Default)]
pub struct PreviewPanelState {
    /// Current contents.
    pub content: PreviewContent,
    /// Bumped whenever a new image should be uploaded to the GPU.
    pub frame_serial: u64,
}

/// One pre-formatted row of the detection table.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRowView {
    /// Class label as reported.
    pub label: String,
    /// Confidence rendered to two decimals.
    pub confidence_text: String,
    /// Local time-of-day string.
    pub timestamp_text: String,
    /// Child detections are visually highlighted.
    pub highlighted: bool,
}

/// Detection table state; rows are fully rebuilt on every poll tick.
#[derive(Clone, Debug, Default)]
pub struct DetectionTableState {
    /// Rendered rows, in server order.
    pub rows: Vec<DetectionRowView>,
}

/// A blocking notification; dismissing it is the only way past.
#[derive(Clone, Debug, PartialEq)]
pub struct NoticeState {
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
}

impl NoticeState {
    /// Convenience constructor.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Badge tone for the footer status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    /// Nothing in flight.
    Idle,
    /// A preview or poll is running.
    Active,
    /// Last action failed.
    Error,
}

impl StatusTone {
    /// Badge color for the tone.
    pub fn color(self) -> Color32 {
        match self {
            Self::Idle => Color32::from_rgb(110, 110, 110),
            Self::Active => Color32::from_rgb(96, 170, 96),
            Self::Error => Color32::from_rgb(190, 80, 70),
        }
    }
}

/// Footer status text plus badge tone.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusLineState {
    /// Status text.
    pub text: String,
    /// Badge tone.
    pub tone: StatusTone,
}

impl StatusLineState {
    /// Default idle status.
    pub fn idle() -> Self {
        Self {
            text: "Select a source to get started".into(),
            tone: StatusTone::Idle,
        }
    }

    /// Status with the given tone.
    pub fn new(text: impl Into<String>, tone: StatusTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}
