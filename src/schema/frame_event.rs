//! rigcast.frame.v1 schema definition
//!
//! A recorded frame is a `FrameInput` plus optional bookkeeping:
//! - `schema_version` (defaults to the current version)
//! - `frame` sequence number
//! - `captured_at` capture time (RFC 3339)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::CalibrationProfile;
use crate::projector::FaceSubsetProjector;
use crate::types::{FrameInput, RecordField};

/// Current schema version
pub const SCHEMA_VERSION: &str = "rigcast.frame.v1";

/// Landmarks in a full-body pose set
pub const POSE_LANDMARKS: usize = 33;

/// Landmarks in one hand set
pub const HAND_LANDMARKS: usize = 21;

/// Landmarks in the refined face mesh (468 mesh points + 10 iris points)
pub const FACE_MESH_LANDMARKS: usize = 478;

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Sequence number within the recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
    /// Capture time of the camera frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub input: FrameInput,
}

impl FrameEvent {
    pub fn new(input: FrameInput) -> Self {
        Self {
            schema_version: default_schema_version(),
            frame: None,
            captured_at: None,
            input,
        }
    }

    /// Check the schema version and landmark shapes
    pub fn validate(&self, schema: &LandmarkSchema) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.schema_version != SCHEMA_VERSION {
            errors.push(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }
        errors.extend(schema.check(&self.input));
        errors
    }
}

/// Expected shape of each input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkSchema {
    pub pose: usize,
    pub hand: usize,
    /// Minimum face mesh length covering the projected subset
    pub face_min: usize,
    /// Exact classifier score count (N + 1)
    pub scores: usize,
}

impl LandmarkSchema {
    /// Shapes expected by `profile`
    pub fn for_profile(profile: &CalibrationProfile) -> Self {
        Self {
            pose: POSE_LANDMARKS,
            hand: HAND_LANDMARKS,
            face_min: FaceSubsetProjector::new(profile.face_indices()).required_len(),
            scores: profile.expected_score_len(),
        }
    }

    /// Report every field whose shape differs from the schema
    pub fn check(&self, input: &FrameInput) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let exact = [
            (RecordField::Body, input.pose.as_ref().map(Vec::len), self.pose),
            (RecordField::LHand, input.left_hand.as_ref().map(Vec::len), self.hand),
            (RecordField::RHand, input.right_hand.as_ref().map(Vec::len), self.hand),
            (RecordField::BlendShape, input.blendshapes.as_ref().map(Vec::len), self.scores),
        ];
        for (field, actual, expected) in exact {
            if let Some(actual) = actual.filter(|&len| len != expected) {
                errors.push(ValidationError::LengthMismatch {
                    field: field.as_str(),
                    expected,
                    actual,
                });
            }
        }

        if let Some(face) = &input.face {
            if face.len() < self.face_min {
                errors.push(ValidationError::TooShort {
                    field: RecordField::Face.as_str(),
                    required: self.face_min,
                    actual: face.len(),
                });
            }
        }

        errors
    }
}

/// Validation errors for recorded frames
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("{field}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field}: expected at least {required} entries, got {actual}")]
    TooShort {
        field: &'static str,
        required: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// True when the encoder will null the field for this frame
    pub fn omits_field(&self) -> bool {
        match self {
            ValidationError::TooShort { .. } => true,
            ValidationError::LengthMismatch { field, .. } => {
                *field == RecordField::BlendShape.as_str()
            }
            ValidationError::InvalidSchemaVersion { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, RawScore};
    use pretty_assertions::assert_eq;

    fn schema() -> LandmarkSchema {
        LandmarkSchema::for_profile(&CalibrationProfile::builtin())
    }

    #[test]
    fn test_schema_for_builtin_profile() {
        assert_eq!(
            schema(),
            LandmarkSchema {
                pose: 33,
                hand: 21,
                face_min: 474,
                scores: 53,
            }
        );
    }

    #[test]
    fn test_parse_event_with_bookkeeping() {
        let event: FrameEvent = serde_json::from_str(
            r#"{
                "frame": 42,
                "captured_at": "2024-01-15T14:00:00Z",
                "resolution": {"x": 1280, "y": 720},
                "left_hand": [{"x": 0.1, "y": 0.2, "z": 0.0}]
            }"#,
        )
        .unwrap();

        assert_eq!(event.schema_version, SCHEMA_VERSION);
        assert_eq!(event.frame, Some(42));
        assert!(event.captured_at.is_some());
        assert_eq!(event.input.left_hand.as_ref().map(Vec::len), Some(1));
        assert!(event.input.pose.is_none());
    }

    #[test]
    fn test_well_formed_frame_is_valid() {
        let input = FrameInput::default()
            .with_pose(vec![Landmark::default(); 33])
            .with_left_hand(vec![Landmark::default(); 21])
            .with_face(vec![Landmark::default(); 478])
            .with_blendshapes(vec![RawScore::default(); 53]);

        assert!(FrameEvent::new(input).validate(&schema()).is_empty());
        assert!(FrameEvent::new(FrameInput::default()).validate(&schema()).is_empty());
    }

    #[test]
    fn test_reports_every_shape_problem() {
        let input = FrameInput::default()
            .with_pose(vec![Landmark::default(); 25])
            .with_right_hand(vec![Landmark::default(); 21])
            .with_face(vec![Landmark::default(); 468])
            .with_blendshapes(vec![RawScore::default(); 52]);

        let errors = FrameEvent::new(input).validate(&schema());
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            ValidationError::LengthMismatch {
                field: "Body",
                expected: 33,
                actual: 25
            }
        );
        assert!(!errors[0].omits_field());
        assert!(errors[1].omits_field());
        assert_eq!(errors[2].to_string(), "Face: expected at least 474 entries, got 468");
        assert!(errors[2].omits_field());
    }

    #[test]
    fn test_wrong_schema_version() {
        let mut event = FrameEvent::new(FrameInput::default());
        event.schema_version = "other.v0".to_string();
        let errors = event.validate(&schema());
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidSchemaVersion { .. }]
        ));
    }
}
