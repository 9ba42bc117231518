//! rigcast - Real-time tracking data encoder for avatar rigs
//!
//! rigcast turns per-frame body, hand, and face landmarks plus blendshape
//! classifier scores into a compact JSON record and ships it to a rig
//! consumer over UDP through a deterministic pipeline: aspect-ratio
//! normalization → face subset projection → blendshape calibration →
//! record encoding → datagram transmission.
//!
//! ## Modules
//!
//! - **Encoding**: `normalizer`, `projector`, `calibrator`, `encoder`
//! - **Delivery**: `transport`, `pipeline`
//! - **Recordings**: `schema` parses and validates recorded frames

pub mod calibrator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod profile;
pub mod projector;
pub mod schema;
pub mod transport;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::Config;
pub use encoder::{EncodedFrame, FrameEncoder};
pub use error::{RigcastError, TransportError};
pub use pipeline::{frame_to_record_json, Delivery, FrameProcessor, FrameReport};
pub use profile::CalibrationProfile;
pub use transport::{DatagramSink, UdpTransmitter};
pub use types::{FrameInput, NormalizedFrameRecord};

// Schema exports
pub use schema::{FrameEvent, FrameEventAdapter, LandmarkSchema, SCHEMA_VERSION};

/// rigcast version
pub const RIGCAST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported in logs and CLI output
pub const PRODUCER_NAME: &str = "rigcast";
