//! Library exports for reuse in integration tests.
/// Application directory helpers.
pub mod app_dirs;
/// Persisted app configuration and operator identity.
pub mod config;
/// MJPEG feed streaming and frame extraction.
pub mod feed;
/// Shared egui UI modules.
pub mod egui_app;
/// Shared HTTP client configuration.
pub mod http_client;
/// Logging setup.
pub mod logging;
/// Detection portal endpoint clients.
pub mod portal;
