//! Pipeline orchestration
//!
//! This module provides the per-frame entry point of rigcast. It runs one
//! frame through the full pipeline and hands the record to the transport.
//!
//! Pipeline stages:
//! 1. LandmarkNormalizer - Aspect-corrected coordinates for body and hands
//! 2. FaceSubsetProjector - Curated face points
//! 3. BlendshapeCalibrator - Calibrated blendshape weights
//! 4. FrameEncoder - Wire record with explicit nulls
//! 5. DatagramSink - One datagram per frame

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use crate::config::Config;
use crate::encoder::{FrameEncoder, FrameIssue};
use crate::error::RigcastError;
use crate::profile::CalibrationProfile;
use crate::transport::{DatagramSink, TransmitStats, UdpTransmitter};
use crate::types::{FrameInput, NormalizedFrameRecord};

/// Convert one frame of input JSON to a wire record using the built-in
/// profile and the default fallback resolution.
///
/// # Example
/// ```ignore
/// let record = frame_to_record_json(r#"{"resolution": {"x": 1280, "y": 720}}"#)?;
/// ```
pub fn frame_to_record_json(frame_json: &str) -> Result<String, RigcastError> {
    let frame: FrameInput = serde_json::from_str(frame_json)?;
    FrameEncoder::default().encode_to_json(&frame)
}

/// What happened to a frame's datagram
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent { bytes: usize },
    Dropped { reason: String },
}

/// Outcome of processing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub record: NormalizedFrameRecord,
    pub issues: Vec<FrameIssue>,
    pub delivery: Delivery,
}

impl FrameReport {
    pub fn was_sent(&self) -> bool {
        matches!(self.delivery, Delivery::Sent { .. })
    }
}

/// Long-lived frame processor owning the transport handle.
///
/// All methods take `&self`, so one processor can be shared between frame
/// delivery threads; sends are serialized by the sink.
pub struct FrameProcessor<S: DatagramSink = UdpTransmitter> {
    encoder: FrameEncoder,
    sink: S,
    session_id: String,
    stats: Mutex<TransmitStats>,
}

impl FrameProcessor<UdpTransmitter> {
    /// Open the UDP transmitter and load the profile named by `config`
    pub fn new(config: &Config) -> Result<Self, RigcastError> {
        let profile = config.load_profile()?;
        Self::with_profile(config, Arc::new(profile))
    }

    /// Open the UDP transmitter with an already loaded profile
    pub fn with_profile(
        config: &Config,
        profile: Arc<CalibrationProfile>,
    ) -> Result<Self, RigcastError> {
        config.validate()?;
        let sink = UdpTransmitter::open(&config.transport)?;
        let encoder =
            FrameEncoder::new(profile).with_fallback_resolution(config.frame.fallback_resolution());
        Ok(Self::with_sink(sink, encoder))
    }
}

impl<S: DatagramSink> FrameProcessor<S> {
    /// Create a processor around any datagram sink
    pub fn with_sink(sink: S, encoder: FrameEncoder) -> Self {
        let session_id = Uuid::new_v4().to_string();
        tracing::info!(
            session = %session_id,
            "Frame processor ready with calibration profile {}",
            encoder.profile().label()
        );
        Self {
            encoder,
            sink,
            session_id,
            stats: Mutex::new(TransmitStats::default()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Snapshot of the delivery counters
    pub fn stats(&self) -> TransmitStats {
        self.lock_stats().clone()
    }

    /// Encode one frame and send it.
    ///
    /// Never fails: schema problems null the affected field, transport
    /// problems drop this frame only. Both are logged and reported.
    pub fn process(&self, frame: &FrameInput) -> FrameReport {
        let span = tracing::debug_span!("frame", session = %self.session_id);
        let _enter = span.enter();

        let encoded = self.encoder.encode(frame);
        for issue in &encoded.issues {
            tracing::warn!("{} omitted this frame: {}", issue.field.as_str(), issue.message);
        }

        let delivery = match encoded.to_bytes() {
            Ok(payload) => match self.sink.send_datagram(&payload) {
                Ok(bytes) => {
                    self.lock_stats().record_sent(bytes);
                    tracing::debug!("Sent {} byte record", bytes);
                    Delivery::Sent { bytes }
                }
                Err(e) => self.drop_frame(e.to_string()),
            },
            Err(e) => self.drop_frame(e.to_string()),
        };

        FrameReport {
            record: encoded.record,
            issues: encoded.issues,
            delivery,
        }
    }

    fn drop_frame(&self, reason: String) -> Delivery {
        tracing::warn!("Dropping frame: {}", reason);
        self.lock_stats().record_dropped(&reason);
        Delivery::Dropped { reason }
    }

    // Counters stay usable even if a panicking thread poisoned the lock
    fn lock_stats(&self) -> MutexGuard<'_, TransmitStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
