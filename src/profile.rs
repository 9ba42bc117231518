//! Calibration profiles
//!
//! A calibration profile is the versioned data that corrects a specific
//! classifier release: channel swaps, per-channel gain/bias, cross-channel
//! coupling, plus the face landmark subset the rig consumes. Profiles are
//! validated once when built or deserialized and are immutable afterwards,
//! so the calibrator can index them without re-checking bounds.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RigcastError;
use crate::schema::FACE_MESH_LANDMARKS;

/// Name of the profile compiled into the crate
pub const BUILTIN_PROFILE_NAME: &str = "mediapipe-blendshapes";

/// Version of the compiled-in profile
pub const BUILTIN_PROFILE_VERSION: u32 = 2;

/// `calibrated[target] += coefficient * calibrated[source]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coupling {
    pub target: usize,
    pub source: usize,
    pub coefficient: f32,
}

impl Coupling {
    pub const fn new(target: usize, source: usize, coefficient: f32) -> Self {
        Self {
            target,
            source,
            coefficient,
        }
    }
}

/// Unvalidated profile as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub name: String,
    pub version: u32,
    /// Upstream classifier release this profile was fitted against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Rig-side name of each output channel
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    pub scale: Vec<f32>,
    pub offset: Vec<f32>,
    #[serde(default)]
    pub swap_pairs: Vec<(usize, usize)>,
    #[serde(default)]
    pub coupling: Vec<Coupling>,
    #[serde(default)]
    pub face_indices: Vec<usize>,
}

/// Validated, immutable calibration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfileDocument", into = "ProfileDocument")]
pub struct CalibrationProfile {
    doc: ProfileDocument,
}

impl TryFrom<ProfileDocument> for CalibrationProfile {
    type Error = RigcastError;

    fn try_from(doc: ProfileDocument) -> Result<Self, Self::Error> {
        validate(&doc)?;
        Ok(Self { doc })
    }
}

impl From<CalibrationProfile> for ProfileDocument {
    fn from(profile: CalibrationProfile) -> Self {
        profile.doc
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CalibrationProfile {
    /// The profile fitted for the MediaPipe face blendshape classifier with
    /// the extra tongue channel appended (52 output channels).
    pub fn builtin() -> Self {
        Self {
            doc: builtin_document(),
        }
    }

    /// Load a profile from JSON
    pub fn from_json(json: &str) -> Result<Self, RigcastError> {
        let doc: ProfileDocument = serde_json::from_str(json)?;
        Self::try_from(doc)
    }

    /// Load a profile from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RigcastError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RigcastError::InvalidProfile(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String, RigcastError> {
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    pub fn name(&self) -> &str {
        &self.doc.name
    }

    pub fn version(&self) -> u32 {
        self.doc.version
    }

    pub fn classifier(&self) -> Option<&str> {
        self.doc.classifier.as_deref()
    }

    /// `name@version`, used in logs
    pub fn label(&self) -> String {
        format!("{}@{}", self.doc.name, self.doc.version)
    }

    /// Number of calibrated output channels (N)
    pub fn channel_count(&self) -> usize {
        self.doc.scale.len()
    }

    /// Length of the raw score list this profile accepts (N + 1)
    pub fn expected_score_len(&self) -> usize {
        self.channel_count() + 1
    }

    pub fn channels(&self) -> &[String] {
        &self.doc.channels
    }

    pub fn scale(&self) -> &[f32] {
        &self.doc.scale
    }

    pub fn offset(&self) -> &[f32] {
        &self.doc.offset
    }

    pub fn swap_pairs(&self) -> &[(usize, usize)] {
        &self.doc.swap_pairs
    }

    pub fn coupling(&self) -> &[Coupling] {
        &self.doc.coupling
    }

    pub fn face_indices(&self) -> &[usize] {
        &self.doc.face_indices
    }

    /// Apply every swap pair once.
    ///
    /// Pairs are disjoint, so order does not matter and applying twice is
    /// the identity. `values` must hold `channel_count()` entries.
    pub fn apply_swaps<T>(&self, values: &mut [T]) {
        for &(a, b) in &self.doc.swap_pairs {
            values.swap(a, b);
        }
    }
}

fn validate(doc: &ProfileDocument) -> Result<(), RigcastError> {
    let invalid = |msg: String| Err(RigcastError::InvalidProfile(msg));

    if doc.name.trim().is_empty() {
        return invalid("profile name is empty".to_string());
    }

    let n = doc.scale.len();
    if n == 0 {
        return invalid("scale table is empty".to_string());
    }
    if doc.offset.len() != n {
        return invalid(format!(
            "offset table has {} entries, scale table has {}",
            doc.offset.len(),
            n
        ));
    }
    if !doc.channels.is_empty() && doc.channels.len() != n {
        return invalid(format!(
            "{} channel names for {} channels",
            doc.channels.len(),
            n
        ));
    }
    if let Some(i) = doc
        .scale
        .iter()
        .zip(&doc.offset)
        .position(|(s, o)| !s.is_finite() || !o.is_finite())
    {
        return invalid(format!("non-finite scale/offset at channel {i}"));
    }

    let mut seen = HashSet::new();
    for &(a, b) in &doc.swap_pairs {
        if a >= n || b >= n {
            return invalid(format!("swap pair ({a}, {b}) out of range for {n} channels"));
        }
        if a == b {
            return invalid(format!("swap pair ({a}, {b}) swaps a channel with itself"));
        }
        if !seen.insert(a) || !seen.insert(b) {
            return invalid(format!("swap pair ({a}, {b}) overlaps another pair"));
        }
    }

    for c in &doc.coupling {
        if c.target >= n || c.source >= n {
            return invalid(format!(
                "coupling {} <- {} out of range for {n} channels",
                c.target, c.source
            ));
        }
        if !c.coefficient.is_finite() {
            return invalid(format!(
                "coupling {} <- {} has a non-finite coefficient",
                c.target, c.source
            ));
        }
    }

    if let Some(&id) = doc.face_indices.iter().find(|&&id| id >= FACE_MESH_LANDMARKS) {
        return invalid(format!(
            "face index {id} is outside the {FACE_MESH_LANDMARKS}-point face mesh"
        ));
    }

    Ok(())
}

const BUILTIN_CHANNELS: [&str; 52] = [
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "eyeBlinkLeft",
    "eyeBlinkRight",
    "eyeLookDownLeft",
    "eyeLookDownRight",
    "eyeLookInLeft",
    "eyeLookInRight",
    "eyeLookOutLeft",
    "eyeLookOutRight",
    "eyeLookUpLeft",
    "eyeLookUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawOpen",
    "jawRight",
    "mouthClose",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthFunnel",
    "mouthLeft",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
    "mouthRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "noseSneerLeft",
    "noseSneerRight",
    "tongueOut",
];

// Camera-space left/right is mirrored relative to the avatar, and the
// classifier reports mouthLeft/mouthRight from the opposite side.
const BUILTIN_SWAP_PAIRS: [(usize, usize); 20] = [
    (0, 1),
    (3, 4),
    (6, 7),
    (8, 9),
    (10, 11),
    (12, 13),
    (14, 15),
    (16, 17),
    (18, 19),
    (20, 21),
    (23, 25),
    (27, 28),
    (29, 30),
    (32, 38),
    (33, 34),
    (35, 36),
    (43, 44),
    (45, 46),
    (47, 48),
    (49, 50),
];

#[rustfmt::skip]
const BUILTIN_SCALE: [f32; 52] = [
    1.8, 2.0, 1.0, 5.0, 2.5, 1.0, 1.0, 1.0, 1.3, 1.3,
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.3, 1.6,
    6.0, 4.0, 1.0, 0.8, 1.3, 0.8, 1.5, 1.0, 1.0, 2.5,
    2.5, 1.3, 0.8, 1.0, 2.0, 2.0, 2.0, 1.2, 0.8, 0.6,
    0.6, 1.4, 10.0, 2.0, 2.0, 0.3, 0.3, 7.0, 7.0, 0.0,
    0.0, 1.0,
];

#[rustfmt::skip]
const BUILTIN_OFFSET: [f32; 52] = [
    0.0, 0.0, 0.0, -0.5, -0.3, 0.0, 0.0, 0.0, -0.2, -0.2,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -0.2, -0.2,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, -0.1, 0.0, 0.0, 0.0, 0.0, -0.2, 0.0, 0.0,
    0.0, -0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0,
];

// Tongue out opens the jaw and sneers the nose; it suppresses funnel/pucker.
const BUILTIN_COUPLING: [Coupling; 5] = [
    Coupling::new(24, 51, 0.8),
    Coupling::new(50, 51, 1.0),
    Coupling::new(49, 51, 1.0),
    Coupling::new(31, 51, -0.8),
    Coupling::new(37, 51, -0.8),
];

// Eye, brow, mouth and jaw contour points; 468 and 473 are iris centers and
// require the refined (478 point) face mesh.
#[rustfmt::skip]
const BUILTIN_FACE_INDICES: [usize; 43] = [
    10, 297, 284, 389, 454, 361, 397, 378, 152, 149, 172, 132,
    234, 162, 54, 67, 159, 157, 133, 154, 145, 163, 33, 161,
    386, 388, 263, 390, 374, 381, 362, 384, 12, 271, 291, 403,
    15, 179, 61, 41, 164, 473, 468,
];

fn builtin_document() -> ProfileDocument {
    ProfileDocument {
        name: BUILTIN_PROFILE_NAME.to_string(),
        version: BUILTIN_PROFILE_VERSION,
        classifier: Some("face_blendshapes+tongue".to_string()),
        channels: BUILTIN_CHANNELS.iter().map(|s| s.to_string()).collect(),
        scale: BUILTIN_SCALE.to_vec(),
        offset: BUILTIN_OFFSET.to_vec(),
        swap_pairs: BUILTIN_SWAP_PAIRS.to_vec(),
        coupling: BUILTIN_COUPLING.to_vec(),
        face_indices: BUILTIN_FACE_INDICES.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_document() -> ProfileDocument {
        ProfileDocument {
            name: "test".to_string(),
            version: 1,
            classifier: None,
            channels: Vec::new(),
            scale: vec![1.0; 4],
            offset: vec![0.0; 4],
            swap_pairs: vec![(0, 1)],
            coupling: vec![Coupling::new(2, 3, 0.5)],
            face_indices: vec![0, 1],
        }
    }

    #[test]
    fn test_builtin_profile_is_valid() {
        let profile = CalibrationProfile::builtin();
        assert!(validate(&profile.doc).is_ok());
        assert_eq!(profile.channel_count(), 52);
        assert_eq!(profile.expected_score_len(), 53);
        assert_eq!(profile.channels().len(), 52);
        assert_eq!(profile.face_indices().len(), 43);
        assert_eq!(profile.label(), "mediapipe-blendshapes@2");
    }

    #[test]
    fn test_swaps_are_an_involution() {
        let profile = CalibrationProfile::builtin();
        let original: Vec<usize> = (0..profile.channel_count()).collect();

        let mut values = original.clone();
        profile.apply_swaps(&mut values);
        assert_ne!(values, original);
        assert_eq!(values[0], 1);
        assert_eq!(values[32], 38);
        assert_eq!(values[38], 32);

        profile.apply_swaps(&mut values);
        assert_eq!(values, original);
    }

    #[test]
    fn test_json_round_trip_preserves_profile() {
        let profile = CalibrationProfile::builtin();
        let json = profile.to_json_pretty().unwrap();
        let loaded = CalibrationProfile::from_json(&json).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_minimal_json_profile() {
        let profile = CalibrationProfile::from_json(
            r#"{"name": "flat", "version": 3, "scale": [1, 1, 1], "offset": [0, 0, 0]}"#,
        )
        .unwrap();
        assert_eq!(profile.channel_count(), 3);
        assert!(profile.swap_pairs().is_empty());
        assert!(profile.coupling().is_empty());
        assert!(profile.classifier().is_none());
    }

    #[test]
    fn test_rejects_mismatched_tables() {
        let mut doc = small_document();
        doc.offset.pop();
        assert!(matches!(
            CalibrationProfile::try_from(doc),
            Err(RigcastError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_rejects_overlapping_swap_pairs() {
        let mut doc = small_document();
        doc.swap_pairs = vec![(0, 1), (1, 2)];
        assert!(CalibrationProfile::try_from(doc).is_err());

        let mut doc = small_document();
        doc.swap_pairs = vec![(2, 2)];
        assert!(CalibrationProfile::try_from(doc).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_indices() {
        let mut doc = small_document();
        doc.swap_pairs = vec![(0, 4)];
        assert!(CalibrationProfile::try_from(doc).is_err());

        let mut doc = small_document();
        doc.coupling = vec![Coupling::new(0, 51, 0.8)];
        assert!(CalibrationProfile::try_from(doc).is_err());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let mut doc = small_document();
        doc.scale[1] = f32::NAN;
        assert!(CalibrationProfile::try_from(doc).is_err());

        let mut doc = small_document();
        doc.coupling[0].coefficient = f32::INFINITY;
        assert!(CalibrationProfile::try_from(doc).is_err());
    }

    #[test]
    fn test_rejects_face_index_outside_mesh() {
        let mut doc = small_document();
        doc.face_indices = vec![0, 478];
        assert!(matches!(
            CalibrationProfile::try_from(doc),
            Err(RigcastError::InvalidProfile(_))
        ));

        let result = CalibrationProfile::from_json(
            r#"{"name": "far", "version": 1, "scale": [1], "offset": [0], "face_indices": [18446744073709551615]}"#,
        );
        assert!(matches!(result, Err(RigcastError::InvalidProfile(_))));

        let mut doc = small_document();
        doc.face_indices = vec![477, 0];
        assert!(CalibrationProfile::try_from(doc).is_ok());
    }

    #[test]
    fn test_rejects_invalid_json_document() {
        let result = CalibrationProfile::from_json(
            r#"{"name": "bad", "version": 1, "scale": [1, 1], "offset": [0, 0], "swap_pairs": [[0, 5]]}"#,
        );
        assert!(result.is_err());
    }
}
