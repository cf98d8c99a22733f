//! Activity classification strategies.
//!
//! Both strategies sit behind [`MotionDetector`]; the orchestrator only ever
//! sees an `Analyzer<Output = ActivityLabel>`.

pub mod background;
pub mod pose;

pub use background::{BackgroundConfig, BackgroundSubtractor};
pub use pose::{Point, PoseClassifier, PoseConfig, PoseEstimator, PoseLandmarks};

use super::{ActivityLabel, Analyzer};
use crate::core::error::{ConfigError, DetectorError};
use crate::core::video::Frame;
use serde::{Deserialize, Serialize};

/// Which motion model to run, as selected by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MotionStrategy {
    BackgroundSubtraction(BackgroundConfig),
    PoseLandmarks(PoseConfig),
}

impl Default for MotionStrategy {
    fn default() -> Self {
        MotionStrategy::BackgroundSubtraction(BackgroundConfig::default())
    }
}

/// Holds per-run motion state; one instance per run, never shared.
pub enum MotionDetector {
    Background(BackgroundSubtractor),
    Pose(PoseClassifier),
}

impl MotionDetector {
    pub fn background(config: BackgroundConfig) -> Self {
        MotionDetector::Background(BackgroundSubtractor::new(config))
    }

    pub fn pose(estimator: Box<dyn PoseEstimator>, config: PoseConfig) -> Self {
        MotionDetector::Pose(PoseClassifier::new(estimator, config))
    }

    /// Builds the configured strategy. The pose strategy needs an estimator backend.
    pub fn from_strategy(
        strategy: &MotionStrategy,
        estimator: Option<Box<dyn PoseEstimator>>,
    ) -> Result<Self, ConfigError> {
        match strategy {
            MotionStrategy::BackgroundSubtraction(config) => Ok(Self::background(config.clone())),
            MotionStrategy::PoseLandmarks(config) => match estimator {
                Some(estimator) => Ok(Self::pose(estimator, config.clone())),
                None => Err(ConfigError::Invalid(
                    "pose_landmarks strategy requires a pose estimator".to_string(),
                )),
            },
        }
    }
}

impl Analyzer for MotionDetector {
    type Output = ActivityLabel;

    fn name(&self) -> &str {
        match self {
            MotionDetector::Background(_) => "motion/background",
            MotionDetector::Pose(_) => "motion/pose",
        }
    }

    fn analyze(&mut self, frame: &Frame) -> Result<ActivityLabel, DetectorError> {
        match self {
            MotionDetector::Background(subtractor) => subtractor.classify(frame),
            MotionDetector::Pose(classifier) => classifier.classify(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoBody;

    impl PoseEstimator for NoBody {
        fn estimate(&mut self, _frame: &Frame) -> Result<Option<PoseLandmarks>, DetectorError> {
            Ok(None)
        }
    }

    #[test]
    fn test_strategy_from_json() {
        let bg: MotionStrategy =
            serde_json::from_str(r#"{"strategy":"background_subtraction","area_threshold":800}"#)
                .unwrap();
        assert_eq!(
            bg,
            MotionStrategy::BackgroundSubtraction(BackgroundConfig {
                area_threshold: 800,
                ..Default::default()
            })
        );

        let pose: MotionStrategy = serde_json::from_str(r#"{"strategy":"pose_landmarks"}"#).unwrap();
        assert_eq!(pose, MotionStrategy::PoseLandmarks(PoseConfig::default()));
    }

    #[test]
    fn test_pose_strategy_needs_estimator() {
        let strategy = MotionStrategy::PoseLandmarks(PoseConfig::default());
        assert!(MotionDetector::from_strategy(&strategy, None).is_err());

        let mut detector = MotionDetector::from_strategy(&strategy, Some(Box::new(NoBody))).unwrap();
        assert_eq!(detector.name(), "motion/pose");
        assert_eq!(
            detector.analyze(&Frame::filled(4, 4, 0, 1)).unwrap(),
            ActivityLabel::Anomalous
        );
    }

    #[test]
    fn test_background_strategy_swaps_in() {
        let mut detector =
            MotionDetector::from_strategy(&MotionStrategy::default(), None).unwrap();
        assert_eq!(detector.name(), "motion/background");
        assert_eq!(
            detector.analyze(&Frame::filled(8, 8, 10, 1)).unwrap(),
            ActivityLabel::Normal
        );
    }
}
