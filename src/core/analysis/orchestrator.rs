use super::record::FrameRecord;
use crate::core::detect::{Analyzer, EmotionAnalyzer, IdentityAnalyzer, MotionAnalyzer};
use crate::core::video::Frame;
use log::{debug, warn};

/// The detectors a run uses. Unset slots contribute neutral results.
#[derive(Default)]
pub struct DetectorSet {
    pub identity: Option<IdentityAnalyzer>,
    pub emotion: Option<EmotionAnalyzer>,
    pub motion: Option<MotionAnalyzer>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, detector: IdentityAnalyzer) -> Self {
        self.identity = Some(detector);
        self
    }

    pub fn with_emotion(mut self, detector: EmotionAnalyzer) -> Self {
        self.emotion = Some(detector);
        self
    }

    pub fn with_motion(mut self, detector: MotionAnalyzer) -> Self {
        self.motion = Some(detector);
        self
    }
}

/// Runs identity, emotion and motion detection on each sampled frame, in
/// that order, and keeps the resulting records for the whole run.
pub struct FrameAnalyzer {
    detectors: DetectorSet,
    records: Vec<FrameRecord>,
    anomaly_count: u64,
    detector_failures: u64,
}

impl FrameAnalyzer {
    pub fn new(detectors: DetectorSet) -> Self {
        Self {
            detectors,
            records: Vec::new(),
            anomaly_count: 0,
            detector_failures: 0,
        }
    }

    pub fn process(&mut self, frame_index: u64, frame: &Frame) -> &FrameRecord {
        if let Some(last) = self.records.last() {
            if frame_index <= last.frame_index {
                warn!(
                    "⚠️ Frame {} processed after frame {}; indices should increase",
                    frame_index, last.frame_index
                );
            }
        }

        let detected_identities = run_guarded(
            self.detectors.identity.as_deref_mut(),
            frame,
            frame_index,
            &mut self.detector_failures,
        );
        let emotion_scores = run_guarded(
            self.detectors.emotion.as_deref_mut(),
            frame,
            frame_index,
            &mut self.detector_failures,
        );
        let activity_label = run_guarded(
            self.detectors.motion.as_deref_mut(),
            frame,
            frame_index,
            &mut self.detector_failures,
        );

        if activity_label.is_anomalous() {
            self.anomaly_count += 1;
        }

        debug!(
            "Frame {}: activity={}, emotions={}, faces={}",
            frame_index,
            activity_label,
            emotion_scores.len(),
            detected_identities.len()
        );

        self.records.push(FrameRecord {
            frame_index,
            activity_label,
            emotion_scores,
            detected_identities,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count
    }

    pub fn detector_failures(&self) -> u64 {
        self.detector_failures
    }

    pub fn into_records(self) -> Vec<FrameRecord> {
        self.records
    }
}

/// Runs one detector; a missing detector or a failure yields the neutral value.
fn run_guarded<T: Default>(
    detector: Option<&mut (dyn Analyzer<Output = T> + 'static)>,
    frame: &Frame,
    frame_index: u64,
    failures: &mut u64,
) -> T {
    let Some(detector) = detector else {
        return T::default();
    };

    match detector.analyze(frame) {
        Ok(output) => output,
        Err(e) => {
            *failures += 1;
            warn!(
                "⚠️ Detector {} failed on frame {}: {}",
                detector.name(),
                frame_index,
                e
            );
            T::default()
        }
    }
}
