pub mod session;

pub use session::{
    build_detectors, AnalysisSession, DetectorBackends, FrameObserver, ObserverControl,
    RunOutcome, StopSignal,
};
