//! Ready-made frame sinks
use crate::traits::FrameSink;
use crate::types::RawFrame;

/// Bytes per pixel of expanded frames
pub const N_CHANNELS: usize = 4;

/// Keeps the packed indexed canvas as it is.
#[derive(Debug, Copy, Clone, Default)]
pub struct Indexed;

impl FrameSink for Indexed {
    type Image = RawFrame;

    fn create_frame(&mut self, frame: RawFrame) -> RawFrame {
        frame
    }
}

/// Expands every frame to 32bit RGBA.
#[derive(Debug, Copy, Clone, Default)]
pub struct TrueColor;

/// An RGBA image, rows stored top to bottom without padding
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    /// Hash of the canvas this image was expanded from.
    pub hash: u32,
}

impl FrameSink for TrueColor {
    type Image = RgbaFrame;

    fn create_frame(&mut self, frame: RawFrame) -> RgbaFrame {
        let mut pixels = vec![0; N_CHANNELS * frame.width * frame.height];
        expand_palette(&mut pixels, &frame);
        RgbaFrame {
            width: frame.width,
            height: frame.height,
            pixels,
            hash: frame.hash,
        }
    }
}

/// Naive version, one palette lookup per pixel
///
/// Transparent cells and indices past the end of the palette stay fully
/// transparent black.
fn expand_palette(buf: &mut [u8], frame: &RawFrame) {
    for y in 0..frame.height {
        for x in 0..frame.width {
            let plte_idx = frame.index_at(x, y);
            if Some(plte_idx) == frame.transparent {
                continue
            }
            if let Some(color) = frame.palette.get(plte_idx as usize) {
                let idx = (y * frame.width + x) * N_CHANNELS;
                buf[idx..idx + N_CHANNELS].copy_from_slice(&[color.r, color.g, color.b, 0xFF]);
            }
        }
    }
}
