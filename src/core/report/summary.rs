use crate::core::analysis::FrameRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_frames_seen: u64,
    pub total_frames_sampled: u64,
    pub anomaly_count: u64,
    /// Activity label -> number of sampled frames with that label.
    pub activity_histogram: BTreeMap<String, u64>,
    /// Emotion -> number of sampled frames where it scored above the threshold.
    pub emotion_histogram: BTreeMap<String, u64>,
    /// Sampled frames for which no emotion scores came back.
    pub frames_without_emotion: u64,
}

impl RunSummary {
    pub fn activity_count(&self, label: &str) -> u64 {
        self.activity_histogram.get(label).copied().unwrap_or(0)
    }

    pub fn emotion_count(&self, emotion: &str) -> u64 {
        self.emotion_histogram.get(emotion).copied().unwrap_or(0)
    }
}

/// Pure function of the records: the same input always gives the same summary.
///
/// `emotion_threshold` is a fraction and the comparison is strict.
pub fn build_summary(
    records: &[FrameRecord],
    total_frames_seen: u64,
    emotion_threshold: f32,
) -> RunSummary {
    let mut activity_histogram = BTreeMap::new();
    let mut emotion_histogram = BTreeMap::new();
    let mut anomaly_count = 0;
    let mut frames_without_emotion = 0;

    for record in records {
        *activity_histogram
            .entry(record.activity_label.as_str().to_string())
            .or_insert(0) += 1;
        if record.is_anomalous() {
            anomaly_count += 1;
        }

        if record.emotion_scores.is_empty() {
            frames_without_emotion += 1;
        }
        for emotion in record.emotion_scores.above(emotion_threshold) {
            *emotion_histogram.entry(emotion.to_string()).or_insert(0) += 1;
        }
    }

    RunSummary {
        total_frames_seen,
        total_frames_sampled: records.len() as u64,
        anomaly_count,
        activity_histogram,
        emotion_histogram,
        frames_without_emotion,
    }
}
