//! Offscreen drawing surface
//!
//! Photos are taken by rasterizing the live frame into an RGBA surface of the
//! same size and encoding that surface as a PNG data URL.

use super::traits::VideoFrame;
use crate::utils::error::{AppError, AppResult};
use base64::{engine::general_purpose, Engine as _};

/// MIME type of encoded stills
pub const PHOTO_MIME_TYPE: &str = "image/png";

/// An offscreen RGBA8 surface
#[derive(Debug, Clone)]
pub struct FrameSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameSurface {
    /// Create a transparent surface
    pub fn new(width: u32, height: u32) -> AppResult<Self> {
        if width == 0 || height == 0 {
            return Err(AppError::Capture(format!(
                "Invalid surface size {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; VideoFrame::expected_len(width, height)],
        })
    }

    /// Create a surface sized to the frame and draw it at the origin
    pub fn from_frame(frame: &VideoFrame) -> AppResult<Self> {
        let mut surface = Self::new(frame.width, frame.height)?;
        surface.draw_frame(frame)?;
        Ok(surface)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Draw a frame at the origin, clipped to the surface
    pub fn draw_frame(&mut self, frame: &VideoFrame) -> AppResult<()> {
        if !frame.is_well_formed() {
            return Err(AppError::Capture(format!(
                "Frame buffer holds {} bytes, expected {} for {}x{}",
                frame.data.len(),
                VideoFrame::expected_len(frame.width, frame.height),
                frame.width,
                frame.height
            )));
        }

        let copy_width = self.width.min(frame.width) as usize * 4;
        let rows = self.height.min(frame.height) as usize;
        let src_stride = frame.width as usize * 4;
        let dst_stride = self.width as usize * 4;

        for row in 0..rows {
            let src = &frame.data[row * src_stride..row * src_stride + copy_width];
            self.pixels[row * dst_stride..row * dst_stride + copy_width].copy_from_slice(src);
        }
        Ok(())
    }

    /// Encode the surface as PNG
    pub fn encode_png(&self) -> AppResult<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Fast);

            let mut writer = encoder
                .write_header()
                .map_err(|e| AppError::Capture(format!("PNG header error: {}", e)))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| AppError::Capture(format!("PNG encode error: {}", e)))?;
            writer
                .finish()
                .map_err(|e| AppError::Capture(format!("PNG finish error: {}", e)))?;
        }
        Ok(out)
    }

    /// Encode the surface as a `data:image/png;base64,...` URL
    pub fn to_data_url(&self) -> AppResult<String> {
        Ok(data_url(PHOTO_MIME_TYPE, &self.encode_png()?))
    }
}

/// Build a base64 data URL
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}
