//! Emotion scoring.
//!
//! Emotion models disagree on result shape and unit. [`normalize`] is the
//! single place where a model's raw output becomes [`EmotionScores`]
//! (fractions in `[0, 1]`).

use super::{Analyzer, EmotionScores};
use crate::core::error::DetectorError;
use crate::core::video::Frame;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SMILE_EMOTION: &str = "smile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionUnit {
    /// Confidences in `[0, 1]`.
    Fraction,
    /// Confidences in `[0, 100]`.
    Percent,
}

/// What an emotion model hands back before adaptation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEmotionOutput {
    /// One emotion map for the frame.
    Single(HashMap<String, f32>),
    /// One map per detected face; the first face is used.
    Batch(Vec<HashMap<String, f32>>),
    /// No face found.
    Nothing,
}

pub trait EmotionModel: Send {
    fn unit(&self) -> EmotionUnit;

    fn infer(&mut self, frame: &Frame) -> Result<RawEmotionOutput, DetectorError>;
}

/// Mouth measurements from a face-landmark backend, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouthGeometry {
    pub mouth_opening: f32,
    pub face_height: f32,
}

pub trait FaceGeometry: Send {
    fn mouth(&mut self, frame: &Frame) -> Result<Option<MouthGeometry>, DetectorError>;
}

/// Mouth-opening ratio (opening / face height) mapped linearly onto a smile
/// confidence between `min_ratio` (0) and `max_ratio` (1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmileConfig {
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for SmileConfig {
    fn default() -> Self {
        Self {
            min_ratio: 0.05,
            max_ratio: 0.15,
        }
    }
}

pub fn normalize(raw: RawEmotionOutput, unit: EmotionUnit) -> EmotionScores {
    let map = match raw {
        RawEmotionOutput::Single(map) => map,
        RawEmotionOutput::Batch(maps) => match maps.into_iter().next() {
            Some(map) => map,
            None => return EmotionScores::new(),
        },
        RawEmotionOutput::Nothing => return EmotionScores::new(),
    };

    let scale = match unit {
        EmotionUnit::Fraction => 1.0,
        EmotionUnit::Percent => 0.01,
    };
    map.into_iter().map(|(k, v)| (k, v * scale)).collect()
}

pub fn smile_confidence(mouth: &MouthGeometry, config: &SmileConfig) -> Option<f32> {
    if mouth.face_height <= 0.0 || config.max_ratio <= config.min_ratio {
        return None;
    }
    let ratio = mouth.mouth_opening / mouth.face_height;
    if !ratio.is_finite() || ratio <= config.min_ratio {
        return None;
    }
    Some(((ratio - config.min_ratio) / (config.max_ratio - config.min_ratio)).clamp(0.0, 1.0))
}

pub struct EmotionDetector {
    model: Box<dyn EmotionModel>,
    geometry: Option<Box<dyn FaceGeometry>>,
    smile: SmileConfig,
}

impl EmotionDetector {
    pub fn new(model: Box<dyn EmotionModel>) -> Self {
        Self {
            model,
            geometry: None,
            smile: SmileConfig::default(),
        }
    }

    /// Layers a synthetic `smile` score on top of the model's categories.
    /// Frames where the model found no face stay empty.
    pub fn with_smile(mut self, geometry: Box<dyn FaceGeometry>, smile: SmileConfig) -> Self {
        self.geometry = Some(geometry);
        self.smile = smile;
        self
    }
}

impl Analyzer for EmotionDetector {
    type Output = EmotionScores;

    fn name(&self) -> &str {
        "emotion"
    }

    fn analyze(&mut self, frame: &Frame) -> Result<EmotionScores, DetectorError> {
        let unit = self.model.unit();
        let raw = self.model.infer(frame)?;
        let mut scores = normalize(raw, unit);
        if scores.is_empty() {
            // no face from the model: nothing to layer the smile onto
            return Ok(scores);
        }

        if let Some(geometry) = self.geometry.as_mut() {
            match geometry.mouth(frame) {
                Ok(Some(mouth)) => {
                    if let Some(confidence) = smile_confidence(&mouth, &self.smile) {
                        scores.insert(SMILE_EMOTION, confidence);
                    }
                }
                Ok(None) => {}
                // geometry is auxiliary; keep the model's scores
                Err(e) => debug!("Mouth geometry unavailable on frame {}: {}", frame.frame_number, e),
            }
        }

        Ok(scores)
    }
}
