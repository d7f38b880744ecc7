//! Voice style vectors and blending

use crate::{PhoenixError, Result};

/// A speaker's style vector as produced by the model's voice bank
///
/// The shape is kept alongside the flat data so the bridge can hand the
/// tensor back to the model unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEmbedding {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl VoiceEmbedding {
    /// Build an embedding, checking that `shape` describes `data`
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PhoenixError::Model(format!(
                "embedding shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional embedding
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear blend: `self * ratio + other * (1 - ratio)`
    ///
    /// `ratio` is clamped to `[0, 1]`. Both embeddings must have the
    /// same shape.
    pub fn blend(&self, other: &VoiceEmbedding, ratio: f32) -> Result<VoiceEmbedding> {
        if self.shape != other.shape {
            return Err(PhoenixError::Model(format!(
                "cannot blend embeddings of shape {:?} and {:?}",
                self.shape, other.shape
            )));
        }

        let ratio = ratio.clamp(0.0, 1.0);
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a * ratio + b * (1.0 - ratio))
            .collect();

        Ok(VoiceEmbedding {
            shape: self.shape.clone(),
            data,
        })
    }

    /// Blend using a UI percentage (0-100, clamped)
    pub fn blend_percent(&self, other: &VoiceEmbedding, percent: u8) -> Result<VoiceEmbedding> {
        self.blend(other, blend_ratio(percent))
    }
}

/// Convert a slider percentage to a blend ratio in `[0, 1]`
pub fn blend_ratio(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (VoiceEmbedding, VoiceEmbedding) {
        (
            VoiceEmbedding::from_vec(vec![1.0, 2.0, -4.0]),
            VoiceEmbedding::from_vec(vec![3.0, 0.0, 8.0]),
        )
    }

    #[test]
    fn test_blend_endpoints() {
        let (a, b) = pair();
        assert_eq!(a.blend_percent(&b, 100).unwrap(), a);
        assert_eq!(a.blend_percent(&b, 0).unwrap(), b);
    }

    #[test]
    fn test_blend_midpoint() {
        let (a, b) = pair();
        let mid = a.blend_percent(&b, 50).unwrap();
        assert_eq!(mid.as_slice(), &[2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_blend_matches_linear_law() {
        let (a, b) = pair();
        for percent in [0u8, 30, 50, 70, 100] {
            let r = percent as f32 / 100.0;
            let blended = a.blend_percent(&b, percent).unwrap();
            for (i, v) in blended.as_slice().iter().enumerate() {
                let expected = a.as_slice()[i] * r + b.as_slice()[i] * (1.0 - r);
                assert_eq!(*v, expected);
            }
        }
    }

    #[test]
    fn test_blend_percent_clamped() {
        let (a, b) = pair();
        assert_eq!(a.blend_percent(&b, 250).unwrap(), a);
        assert_eq!(blend_ratio(200), 1.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = VoiceEmbedding::from_vec(vec![1.0, 2.0]);
        let b = VoiceEmbedding::from_vec(vec![1.0]);
        assert!(a.blend(&b, 0.5).is_err());
        assert!(VoiceEmbedding::new(vec![2, 2], vec![0.0; 3]).is_err());
        assert!(VoiceEmbedding::new(vec![2, 2], vec![0.0; 4]).is_ok());
    }
}
