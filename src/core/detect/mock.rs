//! Scripted detectors keyed on frame number, for tests and dry runs.

use super::{ActivityLabel, Analyzer, EmotionScores, IdentityMatch};
use crate::core::error::DetectorError;
use crate::core::video::Frame;

type Script<T> = Box<dyn Fn(u64) -> Result<T, DetectorError> + Send + Sync>;

pub struct MockDetector<T> {
    name: String,
    script: Script<T>,
}

impl<T: Default + 'static> MockDetector<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::fallible(name, |_| Ok(T::default()))
    }

    pub fn with_pattern<F>(name: impl Into<String>, pattern: F) -> Self
    where
        F: Fn(u64) -> T + Send + Sync + 'static,
    {
        Self::fallible(name, move |n| Ok(pattern(n)))
    }

    pub fn fallible<F>(name: impl Into<String>, script: F) -> Self
    where
        F: Fn(u64) -> Result<T, DetectorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            script: Box::new(script),
        }
    }

    /// Fails on every frame.
    pub fn failing(name: impl Into<String>) -> Self {
        Self::fallible(name, |n| {
            Err(DetectorError::Inference(format!("scripted failure on frame {}", n)))
        })
    }
}

impl<T: Default> Analyzer for MockDetector<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&mut self, frame: &Frame) -> Result<T, DetectorError> {
        (self.script)(frame.frame_number)
    }
}

pub type MockIdentityDetector = MockDetector<Vec<IdentityMatch>>;
pub type MockEmotionDetector = MockDetector<EmotionScores>;
pub type MockMotionDetector = MockDetector<ActivityLabel>;

/// `anomalous` on the listed frame numbers, `normal` elsewhere.
pub fn anomalous_at(frames: Vec<u64>) -> MockMotionDetector {
    MockDetector::with_pattern("motion/mock", move |n| {
        if frames.contains(&n) {
            ActivityLabel::Anomalous
        } else {
            ActivityLabel::Normal
        }
    })
}

/// The same emotion scores on every frame.
pub fn constant_emotions(scores: EmotionScores) -> MockEmotionDetector {
    MockDetector::with_pattern("emotion/mock", move |_| scores.clone())
}
