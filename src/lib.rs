//! Anomaly Watch - client library
//!
//! Everything that doesn't need a window: server calls, the live feed
//! stream parser, settings, and the controller state the UI renders.

pub mod api;
pub mod constants;
pub mod controller;
pub mod error;
pub mod mjpeg;
pub mod settings;
pub mod types;
