use crate::core::detect::{ActivityLabel, EmotionScores, IdentityMatch};
use serde::Serialize;

/// Everything the detectors said about one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame_index: u64,
    pub activity_label: ActivityLabel,
    pub emotion_scores: EmotionScores,
    pub detected_identities: Vec<IdentityMatch>,
}

impl FrameRecord {
    pub fn is_anomalous(&self) -> bool {
        self.activity_label.is_anomalous()
    }

    pub fn known_identities(&self) -> impl Iterator<Item = &str> {
        self.detected_identities
            .iter()
            .filter(|m| m.is_known())
            .map(|m| m.name.as_str())
    }
}
