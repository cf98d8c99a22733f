//! Frame-producing collaborators.
//!
//! A source hands out decoded frames one at a time. `None` means the stream
//! is over; a source never reports mid-stream errors upward, it logs them
//! and ends the stream the way a failed `read()` ends a capture loop.

use super::frame::Frame;
use crate::core::error::SourceError;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
// image sequences carry no timing; timestamps assume ~30 fps
const SEQUENCE_FRAME_INTERVAL_MS: u64 = 33;

pub trait VideoSource: Send {
    /// Next frame, or `None` at end of stream.
    fn read(&mut self) -> Option<Frame>;
}

/// Frames held in memory. Used by tests and by callers that decode elsewhere.
pub struct MemorySource {
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// `count` identical frames of the given size.
    pub fn uniform(count: usize, width: u32, height: u32, fill: u8) -> Self {
        let frames = (0..count)
            .map(|i| Frame::filled(width, height, fill, i as u64))
            .collect();
        Self::new(frames)
    }
}

impl VideoSource for MemorySource {
    fn read(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }
}

/// Directory of still images read in file-name order.
pub struct ImageSequenceSource {
    root: PathBuf,
    files: VecDeque<PathBuf>,
    position: u64,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        if !dir.exists() {
            return Err(SourceError::NotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(SourceError::Open {
                path: dir.to_path_buf(),
                reason: "not a directory of frame images".to_string(),
            });
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_extension(p, FRAME_EXTENSIONS))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Empty(dir.to_path_buf()));
        }

        info!("🎞️ Image sequence opened: {:?} ({} frames)", dir, files.len());
        Ok(Self {
            root: dir.to_path_buf(),
            files: files.into(),
            position: 0,
        })
    }
}

impl VideoSource for ImageSequenceSource {
    fn read(&mut self) -> Option<Frame> {
        let path = self.files.pop_front()?;
        match image::open(&path) {
            Ok(img) => {
                let frame = Frame::from_image(
                    &img,
                    self.position * SEQUENCE_FRAME_INTERVAL_MS,
                    self.position,
                );
                self.position += 1;
                Some(frame)
            }
            Err(e) => {
                warn!(
                    "⚠️ Failed to decode {:?} in {:?}: {}; ending stream",
                    path, self.root, e
                );
                self.files.clear();
                None
            }
        }
    }
}

/// Opens the right source for `path`.
///
/// Directories are read as image sequences. Container files need the
/// `opencv` feature.
pub fn open_source(path: &Path) -> Result<Box<dyn VideoSource>, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path)?));
    }

    debug!("Opening container video {:?}", path);
    open_container(path)
}

#[cfg(feature = "opencv")]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>, SourceError> {
    Ok(Box::new(capture::CaptureSource::open(path)?))
}

#[cfg(not(feature = "opencv"))]
fn open_container(path: &Path) -> Result<Box<dyn VideoSource>, SourceError> {
    Err(SourceError::Open {
        path: path.to_path_buf(),
        reason: "container video decoding requires the `opencv` feature".to_string(),
    })
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

#[cfg(feature = "opencv")]
pub mod capture {
    use super::{Frame, SourceError, VideoSource};
    use log::{info, warn};
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };
    use std::path::Path;

    /// OpenCV-backed decoder for container formats (mp4, avi, ...).
    pub struct CaptureSource {
        cap: VideoCapture,
        position: u64,
        frame_interval_ms: f64,
    }

    impl CaptureSource {
        pub fn open(path: &Path) -> Result<Self, SourceError> {
            let open_err = |reason: String| SourceError::Open {
                path: path.to_path_buf(),
                reason,
            };

            let cap = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
                .map_err(|e| open_err(e.to_string()))?;
            if !cap.is_opened().map_err(|e| open_err(e.to_string()))? {
                return Err(open_err("capture did not open".to_string()));
            }

            let fps = cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
            let frame_interval_ms = if fps > 0.0 { 1000.0 / fps } else { 33.0 };
            info!("🎬 Capture opened: {:?} at {:.2} fps", path, fps);

            Ok(Self {
                cap,
                position: 0,
                frame_interval_ms,
            })
        }
    }

    impl VideoSource for CaptureSource {
        fn read(&mut self) -> Option<Frame> {
            let mut bgr = Mat::default();
            match self.cap.read(&mut bgr) {
                Ok(true) if !bgr.empty() => {}
                Ok(_) => return None,
                Err(e) => {
                    warn!("⚠️ Capture read failed: {}; ending stream", e);
                    return None;
                }
            }

            let mut rgba = Mat::default();
            if let Err(e) = imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0) {
                warn!("⚠️ Colour conversion failed: {}; ending stream", e);
                return None;
            }
            let data = match rgba.data_bytes() {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    warn!("⚠️ Frame buffer unavailable: {}; ending stream", e);
                    return None;
                }
            };

            let timestamp_ms = (self.position as f64 * self.frame_interval_ms) as u64;
            let frame = Frame::new(
                rgba.cols() as u32,
                rgba.rows() as u32,
                data,
                timestamp_ms,
                self.position,
            );
            self.position += 1;
            Some(frame)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frames(dir: &Path, names: &[&str]) {
        for (i, name) in names.iter().enumerate() {
            let img = RgbImage::from_pixel(8, 8, Rgb([i as u8 * 40, 0, 0]));
            img.save(dir.join(name)).unwrap();
        }
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let frames = vec![Frame::filled(4, 4, 1, 7), Frame::filled(4, 4, 2, 8)];
        let mut source = MemorySource::new(frames);

        assert_eq!(source.read().unwrap().frame_number, 7);
        assert_eq!(source.read().unwrap().frame_number, 8);
        assert!(source.read().is_none());
        assert!(source.read().is_none());
    }

    #[test]
    fn test_image_sequence_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["f002.png", "f001.png", "f003.bmp"]);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let first = source.read().unwrap();
        // f001 was written second, so its red channel is 40
        assert_eq!(first.data[0], 40);
        assert_eq!(first.frame_number, 0);
        assert!(source.read().is_some());
        assert!(source.read().is_some());
        assert!(source.read().is_none());
    }

    #[test]
    fn test_image_sequence_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            ImageSequenceSource::open(&missing),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_image_sequence_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path()),
            Err(SourceError::Empty(_))
        ));
    }

    #[test]
    fn test_corrupt_frame_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &["a.png"]);
        std::fs::write(dir.path().join("b.png"), b"garbage").unwrap();
        write_frames(dir.path(), &["c.png"]);

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.read().is_some());
        assert!(source.read().is_none());
        assert!(source.read().is_none());
    }

    #[test]
    fn test_open_source_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_source(&dir.path().join("video.mp4"));
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_open_source_container_without_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, b"\0\0\0\x18ftypmp42").unwrap();
        assert!(matches!(
            open_source(&video),
            Err(SourceError::Open { .. })
        ));
    }
}
