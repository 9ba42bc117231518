//! rigcast.frame.v1 recorded frame schema
//!
//! This module defines the on-disk form of recorded frames (one JSON object
//! per frame, usually NDJSON) and the landmark shape checks used to validate
//! them before replay.

mod adapter;
mod frame_event;

pub use adapter::*;
pub use frame_event::*;
