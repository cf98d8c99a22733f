use crate::core::detect::ActivityLabel;
use crate::core::error::DetectorError;
use crate::core::video::Frame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Foreground region size (pixels) at which a frame is anomalous.
    pub area_threshold: u64,
    /// Per-pixel luma difference that marks a pixel as foreground.
    pub diff_threshold: u8,
    /// Weight of the current frame in the running background average.
    pub learning_rate: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            area_threshold: 500,
            diff_threshold: 25,
            learning_rate: 0.05,
        }
    }
}

/// Running-average background model over the luma plane.
///
/// The first frame (and any frame whose size differs from the model)
/// seeds the background and yields an empty foreground mask.
pub struct BackgroundSubtractor {
    config: BackgroundConfig,
    background: Option<Vec<f32>>,
    size: (u32, u32),
}

impl BackgroundSubtractor {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            config,
            background: None,
            size: (0, 0),
        }
    }

    /// Foreground mask for `frame`, then folds the frame into the model.
    pub fn apply(&mut self, frame: &Frame) -> Result<Vec<bool>, DetectorError> {
        if !frame.is_well_formed() {
            return Err(DetectorError::InvalidFrame(format!(
                "{}x{} frame with {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        let gray = frame.to_gray();
        let size = (frame.width, frame.height);

        if self.size != size || self.background.is_none() {
            self.background = Some(gray.iter().map(|&v| v as f32).collect());
            self.size = size;
            return Ok(vec![false; gray.len()]);
        }
        let Some(background) = self.background.as_mut() else {
            return Ok(vec![false; gray.len()]);
        };

        let threshold = self.config.diff_threshold as f32;
        let rate = self.config.learning_rate.clamp(0.0, 1.0);
        let mask = gray
            .iter()
            .zip(background.iter_mut())
            .map(|(&px, bg)| {
                let px = px as f32;
                let foreground = (px - *bg).abs() > threshold;
                *bg += rate * (px - *bg);
                foreground
            })
            .collect();

        Ok(mask)
    }

    pub fn classify(&mut self, frame: &Frame) -> Result<ActivityLabel, DetectorError> {
        let mask = self.apply(frame)?;
        let areas = foreground_regions(&mask, frame.width, frame.height);
        Ok(classify_areas(&areas, self.config.area_threshold))
    }
}

/// `anomalous` as soon as one region reaches `threshold` pixels.
pub fn classify_areas(areas: &[u64], threshold: u64) -> ActivityLabel {
    if areas.iter().any(|&area| area >= threshold) {
        ActivityLabel::Anomalous
    } else {
        ActivityLabel::Normal
    }
}

/// Pixel counts of the 8-connected foreground regions in `mask`.
pub fn foreground_regions(mask: &[bool], width: u32, height: u32) -> Vec<u64> {
    let w = width as usize;
    let h = height as usize;
    if mask.len() != w * h {
        return Vec::new();
    }

    let mut visited = vec![false; mask.len()];
    let mut areas = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let mut area = 0u64;

        while let Some(idx) = stack.pop() {
            area += 1;
            let x = idx % w;
            let y = idx / w;

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let n = ny as usize * w + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        areas.push(area);
    }

    areas
}
