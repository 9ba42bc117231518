//! Blendshape calibration
//!
//! Corrects raw classifier scores into bounded rig weights. Stages, in order:
//! 1. drop the neutral sentinel channel (index 0)
//! 2. swap mirrored channel pairs
//! 3. per-channel gain and bias, clipped to [0, 1]
//! 4. cross-channel coupling, clipped after each term

use crate::error::RigcastError;
use crate::profile::CalibrationProfile;
use crate::types::RawScore;

/// Applies a calibration profile to raw score lists
#[derive(Debug, Clone, Copy)]
pub struct BlendshapeCalibrator<'a> {
    profile: &'a CalibrationProfile,
}

impl<'a> BlendshapeCalibrator<'a> {
    pub fn new(profile: &'a CalibrationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CalibrationProfile {
        self.profile
    }

    /// Calibrate one frame of raw scores.
    ///
    /// The list must hold exactly N + 1 entries for an N-channel profile;
    /// anything else is a `SchemaMismatch` and nothing is indexed.
    pub fn calibrate(&self, scores: &[RawScore]) -> Result<Vec<f32>, RigcastError> {
        let expected = self.profile.expected_score_len();
        if scores.len() != expected {
            return Err(RigcastError::schema_mismatch(
                "BlendShape",
                format!(
                    "expected {} classifier scores for profile {}, got {}",
                    expected,
                    self.profile.label(),
                    scores.len()
                ),
            ));
        }

        let mut values: Vec<f32> = scores[1..].iter().map(|s| s.score).collect();

        self.profile.apply_swaps(&mut values);

        for ((value, scale), offset) in values
            .iter_mut()
            .zip(self.profile.scale())
            .zip(self.profile.offset())
        {
            *value = clip_unit(*value * scale + offset);
        }

        // Profile validation guarantees target/source < N
        for c in self.profile.coupling() {
            values[c.target] = clip_unit(values[c.target] + c.coefficient * values[c.source]);
        }

        Ok(values)
    }
}

/// Clamp to [0, 1]; NaN maps to 0
fn clip_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
