//! Frame record encoding
//!
//! This module merges the outputs of the normalizer, the face projector and
//! the blendshape calibrator into one wire record per frame. Absent inputs
//! and frame-scoped failures both become explicit nulls; failures are also
//! reported as issues so the caller can surface them.

use std::fmt;
use std::sync::Arc;

use crate::calibrator::BlendshapeCalibrator;
use crate::error::RigcastError;
use crate::normalizer::LandmarkNormalizer;
use crate::profile::CalibrationProfile;
use crate::projector::FaceSubsetProjector;
use crate::types::{FrameInput, NormalizedFrameRecord, RecordField, Resolution, DEFAULT_RESOLUTION};

/// A record field that was nulled because its input failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIssue {
    pub field: RecordField,
    pub message: String,
}

impl fmt::Display for FrameIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.as_str(), self.message)
    }
}

/// Result of encoding one frame
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub record: NormalizedFrameRecord,
    pub issues: Vec<FrameIssue>,
}

impl EncodedFrame {
    /// Compact JSON bytes, ready to be sent as one datagram
    pub fn to_bytes(&self) -> Result<Vec<u8>, RigcastError> {
        serde_json::to_vec(&self.record).map_err(RigcastError::JsonError)
    }

    pub fn to_json(&self) -> Result<String, RigcastError> {
        serde_json::to_string(&self.record).map_err(RigcastError::JsonError)
    }

    /// True when no field had to be nulled because of a failure
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Encoder for producing wire records
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    profile: Arc<CalibrationProfile>,
    fallback_resolution: Resolution,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(Arc::new(CalibrationProfile::builtin()))
    }
}

impl FrameEncoder {
    pub fn new(profile: Arc<CalibrationProfile>) -> Self {
        Self {
            profile,
            fallback_resolution: DEFAULT_RESOLUTION,
        }
    }

    /// Resolution used for aspect correction when a frame carries none
    pub fn with_fallback_resolution(mut self, resolution: Resolution) -> Self {
        self.fallback_resolution = resolution;
        self
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn fallback_resolution(&self) -> Resolution {
        self.fallback_resolution
    }

    /// Encode one frame
    pub fn encode(&self, frame: &FrameInput) -> EncodedFrame {
        let normalizer =
            LandmarkNormalizer::for_resolution(frame.resolution, self.fallback_resolution);
        let mut issues = Vec::new();

        let face = frame.face.as_ref().and_then(|face| {
            FaceSubsetProjector::new(self.profile.face_indices())
                .project(face, &normalizer)
                .map_err(|e| issues.push(issue(RecordField::Face, e)))
                .ok()
        });

        let blend_shape = frame.blendshapes.as_ref().and_then(|scores| {
            BlendshapeCalibrator::new(&self.profile)
                .calibrate(scores)
                .map_err(|e| issues.push(issue(RecordField::BlendShape, e)))
                .ok()
        });

        let record = NormalizedFrameRecord {
            res: frame.resolution,
            body: frame.pose.as_deref().map(|p| normalizer.normalize_body(p)),
            left_hand: frame.left_hand.as_deref().map(|h| normalizer.normalize_hand(h)),
            right_hand: frame.right_hand.as_deref().map(|h| normalizer.normalize_hand(h)),
            face,
            blend_shape,
        };

        EncodedFrame { record, issues }
    }

    /// Encode one frame straight to compact JSON
    pub fn encode_to_json(&self, frame: &FrameInput) -> Result<String, RigcastError> {
        self.encode(frame).to_json()
    }
}

fn issue(field: RecordField, error: RigcastError) -> FrameIssue {
    let message = match error {
        RigcastError::SchemaMismatch { message, .. } => message,
        other => other.to_string(),
    };
    FrameIssue { field, message }
}
