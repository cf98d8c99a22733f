//! Detector contract and the result types every detector adapts to.
//!
//! Each detector is an [`Analyzer`] whose `Output` has a neutral `Default`:
//! no identities, no emotions, `normal` activity. The orchestrator falls back
//! to that value whenever a detector fails.

pub mod emotion;
pub mod identity;
pub mod mock;
pub mod motion;

use crate::core::error::DetectorError;
use crate::core::video::Frame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use emotion::{
    EmotionDetector, EmotionModel, EmotionUnit, FaceGeometry, MouthGeometry, RawEmotionOutput,
    SmileConfig,
};
pub use identity::{FaceEncoder, FaceEncoding, Gallery, IdentityDetector, KnownIdentity, MatchPolicy};
pub use motion::{MotionDetector, MotionStrategy, PoseEstimator};

pub const UNKNOWN_IDENTITY: &str = "Unknown";

pub trait Analyzer: Send {
    type Output: Default;

    fn name(&self) -> &str;

    fn analyze(&mut self, frame: &Frame) -> Result<Self::Output, DetectorError>;
}

pub type IdentityAnalyzer = Box<dyn Analyzer<Output = Vec<IdentityMatch>>>;
pub type EmotionAnalyzer = Box<dyn Analyzer<Output = EmotionScores>>;
pub type MotionAnalyzer = Box<dyn Analyzer<Output = ActivityLabel>>;

/// Pixel rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One face found in a frame and the known identity it is closest to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityMatch {
    pub name: String,
    /// Euclidean distance to the nearest known encoding; lower is closer.
    pub match_score: f32,
    pub region: BoundingBox,
}

impl IdentityMatch {
    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN_IDENTITY
    }
}

/// Emotion name to confidence, always a fraction in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores(BTreeMap<String, f32>);

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unnamed emotions and non-finite values are dropped, the rest clamped
    /// to `[0, 1]`.
    pub fn insert(&mut self, emotion: impl Into<String>, confidence: f32) {
        let emotion = emotion.into();
        if emotion.is_empty() || !confidence.is_finite() {
            return;
        }
        self.0.insert(emotion, confidence.clamp(0.0, 1.0));
    }

    pub fn get(&self, emotion: &str) -> Option<f32> {
        self.0.get(emotion).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Emotions strictly above `threshold`.
    pub fn above(&self, threshold: f32) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(_, v)| **v > threshold)
            .map(|(k, _)| k.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut scores = EmotionScores::new();
        for (emotion, confidence) in iter {
            scores.insert(emotion, confidence);
        }
        scores
    }
}

/// Motion classification of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActivityLabel {
    #[default]
    Normal,
    Anomalous,
    Custom(String),
}

impl ActivityLabel {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityLabel::Normal => "normal",
            ActivityLabel::Anomalous => "anomalous",
            ActivityLabel::Custom(label) => label,
        }
    }

    /// Keyed on the rendered name, so a `Custom("anomalous")` counts too.
    pub fn is_anomalous(&self) -> bool {
        self.as_str() == "anomalous"
    }

    /// Reserved names map to their variants; anything else is custom.
    pub fn parse(label: &str) -> Self {
        match label {
            "normal" => ActivityLabel::Normal,
            "anomalous" => ActivityLabel::Anomalous,
            other => ActivityLabel::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
