//! Landmark normalization
//!
//! This module maps image-space landmarks into the rig's coordinate frame.
//! - Origin moved to the image center (x - 0.5)
//! - y flipped to grow upward and scaled by height/width so both axes share units
//! - z negated so positive depth points toward the camera
//! - Coordinates rounded to 4 decimals, confidences to 3

use crate::types::{BodyPoint, Landmark, Position, Resolution};

const POSITION_SCALE: f64 = 10_000.0;
const CONFIDENCE_SCALE: f64 = 1_000.0;

// Distance from a half step, in ULPs of the scaled value, within which a
// tie is assumed. Decimal halves like 0.05625 are not exact in binary and
// land a few ULPs below the tie after scaling.
const HALF_STEP_ULPS: f64 = 8.0;

/// Aspect ratio (height / width) used to scale the vertical axis.
///
/// Falls back to `fallback` when the frame carries no resolution, and
/// degrades to 0.0 for a non-positive width instead of dividing by zero.
pub fn aspect_ratio(res: Option<Resolution>, fallback: Resolution) -> f64 {
    let res = res.unwrap_or(fallback);
    if res.width > 0 {
        f64::from(res.height) / f64::from(res.width)
    } else {
        0.0
    }
}

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    round_scaled(value, POSITION_SCALE)
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    round_scaled(value, CONFIDENCE_SCALE)
}

fn round_scaled(value: f64, scale: f64) -> f64 {
    let scaled = value * scale;
    let whole = scaled.trunc();
    let tolerance = HALF_STEP_ULPS * f64::EPSILON * scaled.abs().max(1.0);
    let rounded = if ((scaled - whole).abs() - 0.5).abs() <= tolerance {
        // Tie: away from zero
        whole + scaled.signum()
    } else {
        scaled.round()
    };
    // + 0.0 turns a rounded -0.0 into 0.0
    rounded / scale + 0.0
}

/// Normalizer bound to one frame's aspect ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkNormalizer {
    ratio: f64,
}

impl LandmarkNormalizer {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }

    /// Build a normalizer from the frame's resolution (or the fallback)
    pub fn for_resolution(res: Option<Resolution>, fallback: Resolution) -> Self {
        Self::new(aspect_ratio(res, fallback))
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Normalize a single landmark position
    pub fn position(&self, landmark: &Landmark) -> Position {
        Position {
            x: round4(landmark.x - 0.5),
            y: round4(-(landmark.y - 0.5) * self.ratio),
            z: round4(-landmark.z),
        }
    }

    /// Normalize a pose set, keeping visibility and presence.
    ///
    /// Missing confidences read as 0.0, the upstream message default.
    pub fn normalize_body(&self, landmarks: &[Landmark]) -> Vec<BodyPoint> {
        landmarks
            .iter()
            .map(|lm| BodyPoint {
                pre: round3(lm.presence.unwrap_or(0.0)),
                vis: round3(lm.visibility.unwrap_or(0.0)),
                pos: self.position(lm),
            })
            .collect()
    }

    /// Normalize a hand set (position only)
    pub fn normalize_hand(&self, landmarks: &[Landmark]) -> Vec<Position> {
        landmarks.iter().map(|lm| self.position(lm)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_RESOLUTION;

    #[test]
    fn test_aspect_ratio_from_resolution() {
        let ratio = aspect_ratio(Some(Resolution::new(1920, 1080)), DEFAULT_RESOLUTION);
        assert_eq!(ratio, 0.5625);

        let ratio = aspect_ratio(Some(Resolution::new(480, 640)), DEFAULT_RESOLUTION);
        assert!((ratio - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_aspect_ratio_fallback_and_degenerate_width() {
        assert_eq!(aspect_ratio(None, DEFAULT_RESOLUTION), 0.5625);
        assert_eq!(aspect_ratio(None, Resolution::new(100, 100)), 1.0);
        assert_eq!(aspect_ratio(Some(Resolution::new(0, 1080)), DEFAULT_RESOLUTION), 0.0);
        assert_eq!(aspect_ratio(Some(Resolution::new(-5, 1080)), DEFAULT_RESOLUTION), 0.0);
    }

    #[test]
    fn test_center_maps_to_origin() {
        let normalizer = LandmarkNormalizer::new(1.0);
        let pos = normalizer.position(&Landmark::new(0.5, 0.5, 0.0));

        assert_eq!(pos, Position { x: 0.0, y: 0.0, z: 0.0 });
        // No negative zero leaks onto the wire
        assert!(pos.y.is_sign_positive());
        assert!(pos.z.is_sign_positive());
    }

    #[test]
    fn test_axis_flip_and_aspect_scaling() {
        let normalizer = LandmarkNormalizer::for_resolution(
            Some(Resolution::new(1920, 1080)),
            DEFAULT_RESOLUTION,
        );
        let pos = normalizer.position(&Landmark::new(0.6, 0.4, 0.1));

        assert_eq!(pos.x, 0.1);
        assert_eq!(pos.y, 0.0563);
        assert_eq!(pos.z, -0.1);
    }

    #[test]
    fn test_rounding_precision() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(-0.123449), -0.1234);
        assert_eq!(round3(0.98765), 0.988);
        assert_eq!(round3(0.0004), 0.0);
    }

    #[test]
    fn test_rounding_ties_and_near_ties() {
        assert_eq!(round4(0.05625), 0.0563);
        assert_eq!(round4(-0.05625), -0.0563);
        assert_eq!(round4(0.28125), 0.2813);
        assert_eq!(round3(0.0005), 0.001);

        // Just below a half step rounds down
        assert_eq!(round4(0.00004999995), 0.0);
        assert_eq!(round4(-0.00004999995), 0.0);
        assert!(round4(-0.00004999995).is_sign_positive());
        assert_eq!(round4(0.056249), 0.0562);
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let normalizer = LandmarkNormalizer::new(0.75);
        let set: Vec<Landmark> = (0..33)
            .map(|i| {
                let t = i as f64 / 33.0;
                Landmark::new(t, 1.0 - t, t * 0.3 - 0.1)
                    .with_visibility(t)
                    .with_presence(1.0 - t)
            })
            .collect();

        let first = normalizer.normalize_body(&set);
        let second = normalizer.normalize_body(&set);
        assert_eq!(first.len(), set.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.pos.x.to_bits(), b.pos.x.to_bits());
            assert_eq!(a.pos.y.to_bits(), b.pos.y.to_bits());
            assert_eq!(a.pos.z.to_bits(), b.pos.z.to_bits());
            assert_eq!(a.vis.to_bits(), b.vis.to_bits());
            assert_eq!(a.pre.to_bits(), b.pre.to_bits());
        }
    }

    #[test]
    fn test_body_keeps_confidences_and_order() {
        let normalizer = LandmarkNormalizer::new(1.0);
        let set = vec![
            Landmark::new(0.0, 0.0, 0.0).with_visibility(0.91234).with_presence(0.45678),
            Landmark::new(1.0, 1.0, 0.5),
        ];

        let body = normalizer.normalize_body(&set);
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].vis, 0.912);
        assert_eq!(body[0].pre, 0.457);
        assert_eq!(body[0].pos, Position { x: -0.5, y: 0.5, z: 0.0 });
        assert_eq!(body[1].vis, 0.0);
        assert_eq!(body[1].pre, 0.0);
        assert_eq!(body[1].pos, Position { x: 0.5, y: -0.5, z: -0.5 });
    }

    #[test]
    fn test_hand_preserves_length() {
        let normalizer = LandmarkNormalizer::new(0.5625);
        let hand: Vec<Landmark> = (0..21).map(|i| Landmark::new(0.01 * i as f64, 0.5, 0.0)).collect();

        let out = normalizer.normalize_hand(&hand);
        assert_eq!(out.len(), 21);
        assert_eq!(out[0].x, -0.5);
        assert_eq!(out[20].x, -0.3);
    }
}
