//! Background-job plumbing for the preview controller.
//!
//! All background work reports into a single message channel the controller
//! drains once per frame. Every message carries the preview generation it
//! was started under; the controller drops messages from superseded
//! sessions.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use url::Url;

use crate::feed::{self, FeedError, FeedEvent};
use crate::portal::api::{Detection, DetectionsError};
use crate::portal::upload::{self, UploadError};

/// Fixed period of the detection poll.
pub(crate) const DETECTION_POLL_PERIOD: Duration = Duration::from_secs(1);

pub(crate) enum JobMessage {
    Frame {
        generation: u64,
        image: egui::ColorImage,
    },
    FeedClosed {
        generation: u64,
        result: Result<(), FeedError>,
    },
    UploadFinished {
        generation: u64,
        result: Result<String, UploadError>,
    },
    DetectionsFetched {
        generation: u64,
        result: Result<Vec<Detection>, DetectionsError>,
    },
}

pub(crate) struct ControllerJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    feed_cancel: Option<Arc<AtomicBool>>,
    poll_cancel: Option<Arc<AtomicBool>>,
}

impl ControllerJobs {
    pub(super) fn new() -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel();
        Self {
            message_tx,
            message_rx,
            feed_cancel: None,
            poll_cancel: None,
        }
    }

    pub(super) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    /// Start streaming a feed URL, replacing any previous feed.
    pub(super) fn begin_feed(&mut self, url: Url, generation: u64) {
        self.cancel_feed();
        let cancel = Arc::new(AtomicBool::new(false));
        self.feed_cancel = Some(cancel.clone());

        let (feed_tx, feed_rx) = std::sync::mpsc::channel::<FeedEvent>();
        thread::spawn(move || feed::run_feed_reader(url, cancel, feed_tx));

        let tx = self.message_tx.clone();
        thread::spawn(move || {
            while let Ok(event) = feed_rx.recv() {
                match event {
                    FeedEvent::Frame(image) => {
                        if tx.send(JobMessage::Frame { generation, image }).is_err() {
                            break;
                        }
                    }
                    FeedEvent::Closed(result) => {
                        let _ = tx.send(JobMessage::FeedClosed { generation, result });
                        break;
                    }
                }
            }
        });
    }

    pub(super) fn cancel_feed(&mut self) {
        if let Some(cancel) = self.feed_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    pub(super) fn feed_active(&self) -> bool {
        self.feed_cancel.is_some()
    }

    /// Start the 1 s detection poll, replacing any previous poll.
    pub(super) fn begin_detection_poll(&mut self, base_url: String, generation: u64) {
        self.cancel_poll();
        let cancel = Arc::new(AtomicBool::new(false));
        self.poll_cancel = Some(cancel.clone());
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            loop {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let result = crate::portal::api::fetch_detections(&base_url);
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if tx
                    .send(JobMessage::DetectionsFetched { generation, result })
                    .is_err()
                {
                    break;
                }
                thread::sleep(DETECTION_POLL_PERIOD);
            }
        });
    }

    pub(super) fn cancel_poll(&mut self) {
        if let Some(cancel) = self.poll_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    pub(super) fn poll_active(&self) -> bool {
        self.poll_cancel.is_some()
    }

    /// Upload a local file off-thread.
    pub(super) fn begin_upload(&mut self, base_url: String, path: PathBuf, generation: u64) {
        let tx = self.message_tx.clone();
        thread::spawn(move || {
            let result = upload::upload_file(&base_url, &path);
            let _ = tx.send(JobMessage::UploadFinished { generation, result });
        });
    }

    /// Push a message as if a background job produced it (tests only).
    #[cfg(test)]
    pub(crate) fn inject_message(&self, message: JobMessage) {
        let _ = self.message_tx.send(message);
    }
}
