use image::DynamicImage;
use std::time::Duration;

/// Decoded video frame, RGBA8 row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// Single-colour frame, mostly for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, fill: u8, frame_number: u64) -> Self {
        Self::new(
            width,
            height,
            vec![fill; (width * height * 4) as usize],
            0,
            frame_number,
        )
    }

    pub fn from_image(image: &DynamicImage, timestamp_ms: u64, frame_number: u64) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, rgba.into_raw(), timestamp_ms, frame_number)
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// A frame whose buffer does not match its dimensions cannot be analyzed.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.pixel_count() * 4
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    /// Luma plane using the integer BT.601 weights.
    pub fn to_gray(&self) -> Vec<u8> {
        self.data
            .chunks_exact(4)
            .map(|rgba| {
                ((rgba[0] as u32 * 299 + rgba[1] as u32 * 587 + rgba[2] as u32 * 114) / 1000) as u8
            })
            .collect()
    }
}
