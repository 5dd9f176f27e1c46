use serde::Serialize;

use crate::error::EngineError;

/// Blendshape weights for one animation frame. Weights are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationFrame {
    pub index: usize,
    pub weights: Vec<f32>,
}

/// Frames produced for one waveform, at a fixed frame rate.
///
/// Frame `i` is timestamped `i / fps`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationResult {
    frames: Vec<AnimationFrame>,
    fps: f32,
    blendshape_count: usize,
}

impl AnimationResult {
    /// Splits a row-major `frames × blendshape_count` buffer into frames.
    pub fn from_flat(
        data: Vec<f32>,
        fps: f32,
        blendshape_count: usize,
    ) -> Result<Self, EngineError> {
        if blendshape_count == 0 {
            return Err(EngineError::MalformedOutput("zero blendshape channels".into()));
        }
        if data.len() % blendshape_count != 0 {
            return Err(EngineError::MalformedOutput(format!(
                "{} values is not a multiple of {blendshape_count} channels",
                data.len()
            )));
        }
        let frames = data
            .chunks_exact(blendshape_count)
            .enumerate()
            .map(|(index, w)| AnimationFrame {
                index,
                weights: w.to_vec(),
            })
            .collect();
        Ok(Self {
            frames,
            fps,
            blendshape_count,
        })
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn blendshape_count(&self) -> usize {
        self.blendshape_count
    }

    /// Timestamp of frame `index` in seconds.
    pub fn timestamp(&self, index: usize) -> f64 {
        index as f64 / self.fps as f64
    }

    pub fn timestamps(&self) -> Vec<f64> {
        (0..self.frames.len()).map(|i| self.timestamp(i)).collect()
    }

    /// Timestamp of the last frame, or 0 without frames.
    pub fn duration(&self) -> f64 {
        match self.frames.len() {
            0 => 0.0,
            n => self.timestamp(n - 1),
        }
    }

    /// Per-frame weight rows.
    pub fn weights(&self) -> Vec<&[f32]> {
        self.frames.iter().map(|f| f.weights.as_slice()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat() {
        let r = AnimationResult::from_flat(vec![0.0, 0.1, 1.0, 1.1, 2.0, 2.1], 30.0, 2).unwrap();
        assert_eq!(r.num_frames(), 3);
        assert_eq!(r.frames()[2].index, 2);
        assert_eq!(r.frames()[1].weights, vec![1.0, 1.1]);
    }

    #[test]
    fn test_timestamps_and_duration() {
        let r = AnimationResult::from_flat(vec![0.0; 4 * 31], 30.0, 4).unwrap();
        let ts = r.timestamps();
        assert_eq!(ts.len(), 31);
        for (i, t) in ts.iter().enumerate() {
            assert_eq!(*t, i as f64 / 30.0);
        }
        assert!((r.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_duration() {
        let r = AnimationResult::from_flat(Vec::new(), 30.0, 72).unwrap();
        assert_eq!(r.num_frames(), 0);
        assert_eq!(r.duration(), 0.0);
        assert!(r.timestamps().is_empty());
    }

    #[test]
    fn test_ragged_output_rejected() {
        let err = AnimationResult::from_flat(vec![0.0; 5], 30.0, 2).unwrap_err();
        assert!(matches!(err, EngineError::MalformedOutput(_)));
        assert!(AnimationResult::from_flat(vec![], 30.0, 0).is_err());
    }

    #[test]
    fn test_weights_not_clamped() {
        let r = AnimationResult::from_flat(vec![-0.5, 1.7], 30.0, 2).unwrap();
        assert_eq!(r.weights()[0], &[-0.5, 1.7]);
    }
}
