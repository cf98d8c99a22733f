use crate::core::detect::ActivityLabel;
use crate::core::error::DetectorError;
use crate::core::video::Frame;
use serde::{Deserialize, Serialize};

/// Image coordinates; `y` grows downwards, so smaller `y` is higher up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseLandmarks {
    pub left_shoulder: Point,
    pub right_shoulder: Point,
    pub left_wrist: Point,
    pub right_wrist: Point,
}

impl PoseLandmarks {
    /// Both wrists strictly above both shoulders.
    pub fn arms_raised(&self) -> bool {
        let highest_shoulder = self.left_shoulder.y.min(self.right_shoulder.y);
        self.left_wrist.y < highest_shoulder && self.right_wrist.y < highest_shoulder
    }
}

/// Pose backend; `Ok(None)` when no body is found in the frame.
pub trait PoseEstimator: Send {
    fn estimate(&mut self, frame: &Frame) -> Result<Option<PoseLandmarks>, DetectorError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub raised_arms_label: String,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            raised_arms_label: "arms raised".to_string(),
        }
    }
}

pub fn classify_pose(landmarks: Option<&PoseLandmarks>, config: &PoseConfig) -> ActivityLabel {
    match landmarks {
        None => ActivityLabel::Anomalous,
        Some(pose) if pose.arms_raised() => ActivityLabel::parse(&config.raised_arms_label),
        Some(_) => ActivityLabel::Normal,
    }
}

pub struct PoseClassifier {
    estimator: Box<dyn PoseEstimator>,
    config: PoseConfig,
}

impl PoseClassifier {
    pub fn new(estimator: Box<dyn PoseEstimator>, config: PoseConfig) -> Self {
        Self { estimator, config }
    }

    pub fn classify(&mut self, frame: &Frame) -> Result<ActivityLabel, DetectorError> {
        let landmarks = self.estimator.estimate(frame)?;
        Ok(classify_pose(landmarks.as_ref(), &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(wrist_y: (f32, f32)) -> PoseLandmarks {
        PoseLandmarks {
            left_shoulder: Point::new(40.0, 100.0),
            right_shoulder: Point::new(80.0, 102.0),
            left_wrist: Point::new(30.0, wrist_y.0),
            right_wrist: Point::new(90.0, wrist_y.1),
        }
    }

    #[test]
    fn test_no_landmarks_is_anomalous() {
        assert_eq!(
            classify_pose(None, &PoseConfig::default()),
            ActivityLabel::Anomalous
        );
    }

    #[test]
    fn test_both_wrists_up() {
        let label = classify_pose(Some(&pose((50.0, 60.0))), &PoseConfig::default());
        assert_eq!(label, ActivityLabel::Custom("arms raised".into()));
    }

    #[test]
    fn test_one_wrist_up_is_normal() {
        assert_eq!(
            classify_pose(Some(&pose((50.0, 150.0))), &PoseConfig::default()),
            ActivityLabel::Normal
        );
    }

    #[test]
    fn test_wrist_between_shoulders_is_not_raised() {
        // above the right shoulder, level with the left one
        assert!(!pose((100.0, 101.0)).arms_raised());
    }

    struct Scripted(Vec<Option<PoseLandmarks>>);

    impl PoseEstimator for Scripted {
        fn estimate(&mut self, _frame: &Frame) -> Result<Option<PoseLandmarks>, DetectorError> {
            Ok(self.0.remove(0))
        }
    }

    #[test]
    fn test_classifier_custom_label() {
        let config = PoseConfig {
            raised_arms_label: "celebrating".into(),
        };
        let mut classifier =
            PoseClassifier::new(Box::new(Scripted(vec![Some(pose((10.0, 10.0))), None])), config);
        let frame = Frame::filled(4, 4, 0, 1);

        assert_eq!(
            classifier.classify(&frame).unwrap(),
            ActivityLabel::Custom("celebrating".into())
        );
        assert_eq!(classifier.classify(&frame).unwrap(), ActivityLabel::Anomalous);
    }

    #[test]
    fn test_reserved_label_maps_to_variant() {
        let config = PoseConfig {
            raised_arms_label: "anomalous".into(),
        };
        let label = classify_pose(Some(&pose((10.0, 10.0))), &config);

        assert_eq!(label, ActivityLabel::Anomalous);
        assert!(label.is_anomalous());
    }
}
