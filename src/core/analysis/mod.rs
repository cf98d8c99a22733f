pub mod orchestrator;
pub mod record;

pub use orchestrator::{DetectorSet, FrameAnalyzer};
pub use record::FrameRecord;
