use crate::core::detect::{MatchPolicy, MotionStrategy, SmileConfig};
use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAMPLING_INTERVAL: u64 = 20;
pub const DEFAULT_EMOTION_THRESHOLD: f32 = 0.8;
pub const DEFAULT_REPORT_PATH: &str = "summary_report.txt";

/// Run configuration.
///
/// `identity_match` has no default on purpose: the caller has to say how
/// close a face must be to count as a known person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: u64,
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Fraction in `[0, 1]`; an emotion counts when it scores strictly above this.
    #[serde(default = "default_emotion_threshold")]
    pub emotion_threshold: f32,
    pub identity_match: MatchPolicy,
    #[serde(default)]
    pub motion: MotionStrategy,
    #[serde(default)]
    pub smile: SmileConfig,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default)]
    pub json_report_path: Option<PathBuf>,
    #[serde(default = "default_reference_threads")]
    pub reference_threads: usize,
}

fn default_sampling_interval() -> u64 {
    DEFAULT_SAMPLING_INTERVAL
}

fn default_emotion_threshold() -> f32 {
    DEFAULT_EMOTION_THRESHOLD
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

fn default_reference_threads() -> usize {
    4
}

impl AnalysisConfig {
    pub fn new(identity_match: MatchPolicy) -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            max_frames: None,
            emotion_threshold: DEFAULT_EMOTION_THRESHOLD,
            identity_match,
            motion: MotionStrategy::default(),
            smile: SmileConfig::default(),
            report_path: default_report_path(),
            json_report_path: None,
            reference_threads: default_reference_threads(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.sampling_interval == 0 {
            return invalid("sampling_interval must be at least 1");
        }
        if self.max_frames == Some(0) {
            return invalid("max_frames must be at least 1 when set");
        }
        if !(0.0..=1.0).contains(&self.emotion_threshold) {
            return invalid("emotion_threshold must be a fraction in [0, 1]");
        }
        if let MatchPolicy::WithinDistance { max_distance } = self.identity_match {
            if !max_distance.is_finite() || max_distance < 0.0 {
                return invalid("identity_match.max_distance must be a non-negative number");
            }
        }
        if !(self.smile.min_ratio >= 0.0 && self.smile.min_ratio < self.smile.max_ratio) {
            return invalid("smile.min_ratio must be non-negative and below smile.max_ratio");
        }
        if let MotionStrategy::BackgroundSubtraction(bg) = &self.motion {
            if bg.area_threshold == 0 {
                return invalid("motion.area_threshold must be at least 1");
            }
            if !(0.0..=1.0).contains(&bg.learning_rate) {
                return invalid("motion.learning_rate must be in [0, 1]");
            }
        }
        if let MotionStrategy::PoseLandmarks(pose) = &self.motion {
            if pose.raised_arms_label.trim().is_empty() {
                return invalid("motion.raised_arms_label must not be empty");
            }
        }
        if self.reference_threads == 0 {
            return invalid("reference_threads must be at least 1");
        }
        Ok(())
    }
}
