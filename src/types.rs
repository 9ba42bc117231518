//! Core types for the rigcast pipeline
//!
//! This module defines the data that flows through each stage: the per-frame
//! input bundle handed over by the perception pipeline, and the normalized
//! record that goes out on the wire.

use serde::{Deserialize, Serialize};

/// A single tracked feature point (body joint, hand joint or face mesh vertex)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal image coordinate, nominally 0-1
    pub x: f64,
    /// Vertical image coordinate, nominally 0-1, growing downward
    pub y: f64,
    /// Depth proxy, no fixed unit
    #[serde(default)]
    pub z: f64,
    /// Likelihood of the point being visible (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    /// Likelihood of the point being present in frame (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
            presence: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_presence(mut self, presence: f64) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// Ordered, index-significant landmarks for one body part
pub type LandmarkSet = Vec<Landmark>;

/// One classifier output channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawScore {
    #[serde(default)]
    pub label: String,
    pub score: f32,
}

impl RawScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Raw classifier scores; index 0 is the neutral sentinel channel
pub type RawScoreList = Vec<RawScore>;

/// Image resolution in pixels, serialized as `{"x": width, "y": height}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(rename = "x")]
    pub width: i32,
    #[serde(rename = "y")]
    pub height: i32,
}

impl Resolution {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Resolution assumed for aspect correction when a frame carries none
pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(1920, 1080);

impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

/// Everything the perception pipeline produced for one frame.
///
/// Every field is optional: a missing field means "not tracked this frame"
/// and is encoded as an explicit null, never as zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<LandmarkSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_hand: Option<LandmarkSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_hand: Option<LandmarkSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<LandmarkSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blendshapes: Option<RawScoreList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl FrameInput {
    pub fn with_pose(mut self, pose: LandmarkSet) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn with_left_hand(mut self, hand: LandmarkSet) -> Self {
        self.left_hand = Some(hand);
        self
    }

    pub fn with_right_hand(mut self, hand: LandmarkSet) -> Self {
        self.right_hand = Some(hand);
        self
    }

    pub fn with_face(mut self, face: LandmarkSet) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_blendshapes(mut self, scores: RawScoreList) -> Self {
        self.blendshapes = Some(scores);
        self
    }

    pub fn with_resolution(mut self, width: i32, height: i32) -> Self {
        self.resolution = Some(Resolution::new(width, height));
        self
    }

    /// True when no tracking data at all arrived this frame
    pub fn is_empty(&self) -> bool {
        self.pose.is_none()
            && self.left_hand.is_none()
            && self.right_hand.is_none()
            && self.face.is_none()
            && self.blendshapes.is_none()
    }
}

/// Renormalized 3D position (rig space: origin at image center, y up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Body joint with its confidence values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPoint {
    /// Presence, rounded to 3 decimals
    pub pre: f64,
    /// Visibility, rounded to 3 decimals
    pub vis: f64,
    pub pos: Position,
}

/// Face landmark tagged with its index in the full face mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacePoint {
    pub id: usize,
    pub pos: Position,
}

/// The per-frame wire record.
///
/// Field order is the key order on the wire. `None` serializes as `null`
/// under its key; keys are never omitted because the consumer dispatches on
/// key existence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFrameRecord {
    #[serde(rename = "Res")]
    pub res: Option<Resolution>,
    #[serde(rename = "Body")]
    pub body: Option<Vec<BodyPoint>>,
    #[serde(rename = "LHand")]
    pub left_hand: Option<Vec<Position>>,
    #[serde(rename = "RHand")]
    pub right_hand: Option<Vec<Position>>,
    #[serde(rename = "Face")]
    pub face: Option<Vec<FacePoint>>,
    #[serde(rename = "BlendShape")]
    pub blend_shape: Option<Vec<f32>>,
}

/// Top-level keys of the wire record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    Res,
    Body,
    LHand,
    RHand,
    Face,
    BlendShape,
}

impl RecordField {
    pub const ALL: [RecordField; 6] = [
        RecordField::Res,
        RecordField::Body,
        RecordField::LHand,
        RecordField::RHand,
        RecordField::Face,
        RecordField::BlendShape,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Res => "Res",
            RecordField::Body => "Body",
            RecordField::LHand => "LHand",
            RecordField::RHand => "RHand",
            RecordField::Face => "Face",
            RecordField::BlendShape => "BlendShape",
        }
    }
}
