//! Analysis session: source -> sampler -> detectors -> report

use crate::core::analysis::{DetectorSet, FrameAnalyzer, FrameRecord};
use crate::core::config::AnalysisConfig;
use crate::core::detect::{
    EmotionDetector, EmotionModel, FaceEncoder, FaceGeometry, Gallery, IdentityDetector,
    MotionDetector, PoseEstimator,
};
use crate::core::error::{PipelineError, PipelineResult, ReportError};
use crate::core::report::{build_summary, render, write_json_summary, write_report, RunSummary};
use crate::core::video::{open_source, Frame, FrameSampler, VideoSource};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancels a running session between frames. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverControl {
    Continue,
    Stop,
}

/// Sees every sampled frame right after it is analyzed.
///
/// Meant for overlays and preview windows; returning `Stop` ends the run the
/// same way a stop signal does.
pub trait FrameObserver {
    fn on_frame(&mut self, frame: &Frame, record: &FrameRecord) -> ObserverControl;
}

impl<F> FrameObserver for F
where
    F: FnMut(&Frame, &FrameRecord) -> ObserverControl,
{
    fn on_frame(&mut self, frame: &Frame, record: &FrameRecord) -> ObserverControl {
        self(frame, record)
    }
}

/// Model backends a caller can plug in. Anything left `None` is skipped.
#[derive(Default)]
pub struct DetectorBackends {
    pub face_encoder: Option<Box<dyn FaceEncoder>>,
    pub references: Option<PathBuf>,
    pub emotion_model: Option<Box<dyn EmotionModel>>,
    pub face_geometry: Option<Box<dyn FaceGeometry>>,
    pub pose_estimator: Option<Box<dyn PoseEstimator>>,
}

/// Builds the detector set described by `config` on top of `backends`.
///
/// Motion detection is always present. Identity needs a face encoder; the
/// reference directory, if any, is encoded up front. Emotion needs a model,
/// and the smile score is added only when face geometry is available too.
pub fn build_detectors(
    config: &AnalysisConfig,
    backends: DetectorBackends,
) -> PipelineResult<DetectorSet> {
    let DetectorBackends {
        face_encoder,
        references,
        emotion_model,
        face_geometry,
        pose_estimator,
    } = backends;

    let motion = MotionDetector::from_strategy(&config.motion, pose_estimator)?;
    let mut detectors = DetectorSet::new().with_motion(Box::new(motion));

    match (face_encoder, references) {
        (Some(encoder), references) => {
            let gallery = match references {
                Some(dir) => Gallery::load_dir(&dir, encoder.as_ref(), config.reference_threads)?,
                None => {
                    warn!("⚠️ No reference directory given, every face will be Unknown");
                    Gallery::empty()
                }
            };
            detectors = detectors.with_identity(Box::new(IdentityDetector::new(
                encoder,
                Arc::new(gallery),
                config.identity_match,
            )));
        }
        (None, Some(dir)) => {
            return Err(PipelineError::Gallery(format!(
                "reference directory {:?} given without a face encoder",
                dir
            )));
        }
        (None, None) => debug!("Identity detection disabled"),
    }

    if let Some(model) = emotion_model {
        let mut emotion = EmotionDetector::new(model);
        if let Some(geometry) = face_geometry {
            emotion = emotion.with_smile(geometry, config.smile);
        }
        detectors = detectors.with_emotion(Box::new(emotion));
    } else {
        debug!("Emotion detection disabled");
    }

    Ok(detectors)
}

/// Result of a finished run.
///
/// `report_error` is set when the analysis completed but the report could
/// not be written; `summary` and `records` are intact either way.
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub records: Vec<FrameRecord>,
    pub detector_failures: u64,
    pub report_error: Option<ReportError>,
}

/// One analysis run over one video source.
///
/// ```ignore
/// let session = AnalysisSession::new(config, detectors)?;
/// let stop = session.stop_signal();
/// let outcome = session.run_path(Path::new("clip.mp4"))?;
/// println!("{} anomalies", outcome.summary.anomaly_count);
/// ```
pub struct AnalysisSession {
    config: AnalysisConfig,
    detectors: DetectorSet,
    stop: StopSignal,
    observer: Option<Box<dyn FrameObserver>>,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig, detectors: DetectorSet) -> PipelineResult<Self> {
        crate::init_logging();
        config.validate()?;
        Ok(Self {
            config,
            detectors,
            stop: StopSignal::new(),
            observer: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn set_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observer = Some(observer);
    }

    /// Opens `path` and runs over it. Nothing is analyzed or written if the
    /// source cannot be opened.
    pub fn run_path(self, path: &Path) -> PipelineResult<RunOutcome> {
        let source = open_source(path).map_err(|e| {
            error!("❌ Cannot open video source {:?}: {}", path, e);
            PipelineError::from(e)
        })?;
        info!("🎬 Opened video source {:?}", path);
        Ok(self.run(source))
    }

    /// Runs until the source ends, the stop signal fires or the observer
    /// asks to stop, then writes the report.
    pub fn run(self, source: Box<dyn VideoSource>) -> RunOutcome {
        let Self {
            config,
            detectors,
            stop,
            mut observer,
        } = self;

        info!(
            "🎬 Analysis started: every {} frame(s), cap {:?}",
            config.sampling_interval, config.max_frames
        );

        let mut sampler =
            FrameSampler::new(source, config.sampling_interval).with_max_frames(config.max_frames);
        let mut analyzer = FrameAnalyzer::new(detectors);

        loop {
            if stop.is_stopped() {
                info!("⏹️ Stop requested after {} frames", sampler.frames_seen());
                break;
            }
            let Some(sampled) = sampler.next_sampled_frame() else {
                break;
            };

            let record = analyzer.process(sampled.frame_index, &sampled.frame);
            if let Some(observer) = observer.as_mut() {
                if observer.on_frame(&sampled.frame, record) == ObserverControl::Stop {
                    info!("⏹️ Observer stopped the run at frame {}", sampled.frame_index);
                    break;
                }
            }
        }

        let summary = build_summary(
            analyzer.records(),
            sampler.frames_seen(),
            config.emotion_threshold,
        );
        info!(
            "✅ Analysis finished: {} frames seen, {} analyzed, {} anomalies",
            summary.total_frames_seen, summary.total_frames_sampled, summary.anomaly_count
        );
        if analyzer.detector_failures() > 0 {
            warn!(
                "⚠️ {} detector failures replaced by neutral results",
                analyzer.detector_failures()
            );
        }

        let report_error = write_outputs(&config, &summary).err();
        if let Some(e) = &report_error {
            error!("❌ Report not written: {}", e);
        }

        RunOutcome {
            detector_failures: analyzer.detector_failures(),
            records: analyzer.into_records(),
            summary,
            report_error,
        }
    }
}

fn write_outputs(config: &AnalysisConfig, summary: &RunSummary) -> Result<(), ReportError> {
    write_report(&config.report_path, &render(summary))?;
    if let Some(json_path) = &config.json_report_path {
        write_json_summary(json_path, summary)?;
    }
    Ok(())
}
