use super::frame::Frame;
use super::source::VideoSource;
use log::debug;

/// A frame chosen for analysis, tagged with its 1-based position in the stream.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub frame_index: u64,
    pub frame: Frame,
}

/// Pulls frames from a source and keeps every `interval`-th one.
///
/// Every read advances `frames_seen`, sampled or not. Frame `n` (counting
/// from 1) is sampled when `n % interval == 0`, so a stream of `s` frames
/// yields exactly `s / interval` samples.
pub struct FrameSampler {
    source: Box<dyn VideoSource>,
    interval: u64,
    frames_seen: u64,
    frames_sampled: u64,
    max_frames: Option<u64>,
    exhausted: bool,
}

impl FrameSampler {
    /// `interval` below 1 is treated as 1.
    pub fn new(source: Box<dyn VideoSource>, interval: u64) -> Self {
        Self {
            source,
            interval: interval.max(1),
            frames_seen: 0,
            frames_sampled: 0,
            max_frames: None,
            exhausted: false,
        }
    }

    /// Stop reading once this many frames have been seen.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Next sampled frame, or `None` at end of stream.
    pub fn next_sampled_frame(&mut self) -> Option<SampledFrame> {
        while !self.exhausted {
            if self.max_frames.is_some_and(|max| self.frames_seen >= max) {
                debug!("Frame cap of {} reached", self.frames_seen);
                self.exhausted = true;
                break;
            }

            let Some(mut frame) = self.source.read() else {
                self.exhausted = true;
                break;
            };
            self.frames_seen += 1;

            if self.frames_seen % self.interval == 0 {
                self.frames_sampled += 1;
                frame.frame_number = self.frames_seen;
                return Some(SampledFrame {
                    frame_index: self.frames_seen,
                    frame,
                });
            }
        }
        None
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_sampled(&self) -> u64 {
        self.frames_sampled
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for FrameSampler {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sampled_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::source::MemorySource;
    use proptest::prelude::*;

    fn sampler(frames: usize, interval: u64) -> FrameSampler {
        FrameSampler::new(Box::new(MemorySource::uniform(frames, 4, 4, 0)), interval)
    }

    #[test]
    fn test_forty_frames_every_twentieth() {
        let mut s = sampler(40, 20);
        let indices: Vec<u64> = s.by_ref().map(|f| f.frame_index).collect();

        assert_eq!(indices, vec![20, 40]);
        assert_eq!(s.frames_seen(), 40);
        assert_eq!(s.frames_sampled(), 2);
    }

    #[test]
    fn test_interval_one_samples_everything() {
        let mut s = sampler(5, 1);
        let indices: Vec<u64> = s.by_ref().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_zero_interval_clamped() {
        let s = sampler(3, 0);
        assert_eq!(s.interval(), 1);
    }

    #[test]
    fn test_trailing_frames_still_counted() {
        let mut s = sampler(45, 20);
        assert_eq!(s.by_ref().count(), 2);
        assert_eq!(s.frames_seen(), 45);
        assert!(s.is_exhausted());
    }

    #[test]
    fn test_empty_source() {
        let mut s = sampler(0, 20);
        assert!(s.next_sampled_frame().is_none());
        assert_eq!(s.frames_seen(), 0);
    }

    #[test]
    fn test_max_frames_caps_reads() {
        let mut s = sampler(100, 3).with_max_frames(Some(10));
        let indices: Vec<u64> = s.by_ref().map(|f| f.frame_index).collect();
        assert_eq!(indices, vec![3, 6, 9]);
        assert_eq!(s.frames_seen(), 10);
    }

    #[test]
    fn test_sampled_frame_number_matches_index() {
        let mut s = sampler(4, 2);
        let first = s.next_sampled_frame().unwrap();
        assert_eq!(first.frame.frame_number, first.frame_index);
    }

    proptest! {
        #[test]
        fn prop_sample_count_is_floor(total in 0usize..200, k in 1u64..50) {
            let mut s = sampler(total, k);
            let indices: Vec<u64> = s.by_ref().map(|f| f.frame_index).collect();

            prop_assert_eq!(s.frames_seen(), total as u64);
            prop_assert_eq!(indices.len() as u64, total as u64 / k);
            prop_assert!(indices.iter().all(|i| i % k == 0));
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
