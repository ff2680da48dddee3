//! egui UI for the operator console.
/// Preview state machine and background-job orchestration.
pub mod controller;
/// Shared state types consumed by the renderer.
pub mod state;
/// egui renderer.
pub mod ui;
/// Pure presentation rules (greeting, table formatting, highlighting).
pub mod view_model;
