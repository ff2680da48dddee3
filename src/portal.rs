//! Clients for the detection portal's HTTP endpoints.
//!
//! The portal is an external service; this module only speaks its wire
//! contract: a JSON detection list, an upload endpoint, and two MJPEG
//! streaming endpoints (raw/processed camera and processed file playback).

pub mod api;
pub mod upload;
