//! Face landmark subset projection
//!
//! The rig only consumes a curated subset of the face mesh (eye, brow,
//! mouth and jaw contours). This module picks those points in profile order,
//! tags each with its mesh index, and normalizes them.

use crate::error::RigcastError;
use crate::normalizer::LandmarkNormalizer;
use crate::types::{FacePoint, Landmark};

/// Projects a full face mesh onto a fixed, ordered index subset
#[derive(Debug, Clone, Copy)]
pub struct FaceSubsetProjector<'a> {
    indices: &'a [usize],
}

impl<'a> FaceSubsetProjector<'a> {
    pub fn new(indices: &'a [usize]) -> Self {
        Self { indices }
    }

    /// Smallest face mesh length that covers every subset index
    pub fn required_len(&self) -> usize {
        self.indices
            .iter()
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Project `face` onto the subset.
    ///
    /// Fails with `SchemaMismatch` if the mesh is too short for any subset
    /// index; the caller nulls the face field for this frame only.
    pub fn project(
        &self,
        face: &[Landmark],
        normalizer: &LandmarkNormalizer,
    ) -> Result<Vec<FacePoint>, RigcastError> {
        let required = self.required_len();
        if face.len() < required {
            return Err(RigcastError::schema_mismatch(
                "Face",
                format!(
                    "face mesh has {} landmarks, subset needs at least {}",
                    face.len(),
                    required
                ),
            ));
        }

        Ok(self
            .indices
            .iter()
            .map(|&id| FacePoint {
                id,
                pos: normalizer.position(&face[id]),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CalibrationProfile;
    use crate::types::{Position, Resolution, DEFAULT_RESOLUTION};

    fn flat_face(len: usize) -> Vec<Landmark> {
        vec![Landmark::new(0.5, 0.5, 0.0); len]
    }

    #[test]
    fn test_projects_subset_in_order() {
        let indices = [7, 2, 5];
        let projector = FaceSubsetProjector::new(&indices);
        let mut face = flat_face(8);
        face[5] = Landmark::new(0.6, 0.4, 0.1);

        let normalizer =
            LandmarkNormalizer::for_resolution(Some(Resolution::new(1920, 1080)), DEFAULT_RESOLUTION);
        let points = projector.project(&face, &normalizer).unwrap();

        let ids: Vec<usize> = points.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 2, 5]);
        assert_eq!(points[0].pos, Position { x: 0.0, y: 0.0, z: 0.0 });
        assert_eq!(
            points[2].pos,
            Position {
                x: 0.1,
                y: 0.0563,
                z: -0.1
            }
        );
    }

    #[test]
    fn test_short_mesh_is_schema_mismatch() {
        let profile = CalibrationProfile::builtin();
        let projector = FaceSubsetProjector::new(profile.face_indices());
        assert_eq!(projector.required_len(), 474);

        // Mesh without iris refinement
        let face = flat_face(468);
        let result = projector.project(&face, &LandmarkNormalizer::new(1.0));
        assert!(matches!(
            result,
            Err(RigcastError::SchemaMismatch { ref field, .. }) if field == "Face"
        ));
    }

    #[test]
    fn test_mesh_length_boundary() {
        let profile = CalibrationProfile::builtin();
        let projector = FaceSubsetProjector::new(profile.face_indices());
        let normalizer = LandmarkNormalizer::new(1.0);

        // Largest subset index is 473, so 473 points is one short
        assert!(matches!(
            projector.project(&flat_face(473), &normalizer),
            Err(RigcastError::SchemaMismatch { .. })
        ));
        let points = projector.project(&flat_face(474), &normalizer).unwrap();
        assert_eq!(points.len(), 43);
    }

    #[test]
    fn test_huge_index_is_schema_mismatch() {
        let indices = [3, usize::MAX];
        let projector = FaceSubsetProjector::new(&indices);
        assert_eq!(projector.required_len(), usize::MAX);

        let result = projector.project(&flat_face(478), &LandmarkNormalizer::new(1.0));
        assert!(matches!(
            result,
            Err(RigcastError::SchemaMismatch { ref field, .. }) if field == "Face"
        ));
    }

    #[test]
    fn test_full_mesh_projects_every_index() {
        let profile = CalibrationProfile::builtin();
        let projector = FaceSubsetProjector::new(profile.face_indices());

        let points = projector
            .project(&flat_face(478), &LandmarkNormalizer::new(0.5625))
            .unwrap();
        assert_eq!(points.len(), 43);
        assert_eq!(points.last().map(|p| p.id), Some(468));
    }

    #[test]
    fn test_empty_subset() {
        let projector = FaceSubsetProjector::new(&[]);
        assert_eq!(projector.required_len(), 0);
        let points = projector.project(&[], &LandmarkNormalizer::new(1.0)).unwrap();
        assert!(points.is_empty());
    }
}
