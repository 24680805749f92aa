//! Live stream management

pub mod controller;

pub use controller::{CameraStatus, StreamController, StreamEvent};
