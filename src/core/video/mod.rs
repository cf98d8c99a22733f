pub mod frame;
pub mod sampler;
pub mod source;

pub use frame::Frame;
pub use sampler::{FrameSampler, SampledFrame};
pub use source::{open_source, ImageSequenceSource, MemorySource, VideoSource};
