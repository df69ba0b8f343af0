//! Places decoded images onto the canvas and turns it into frames
use std::io::prelude::*;

use log::trace;

use crate::buffer::PackedBuffer;
use crate::traits::FrameSink;
use crate::types::{DisposalMethod, Frame, ImageDescriptor, RawFrame, Rect, Rgb};

use super::decoder::DecodingError;
use super::lzw::LzwDecoder;
use super::palette::ColorTables;

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// Interlaced row passes as `(first row, step)`
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Row order in which image data arrives
#[derive(Debug, Clone)]
pub struct Rows {
    height: usize,
    interlaced: bool,
    pass: usize,
    next: usize,
}

impl Rows {
    pub fn new(height: usize, interlaced: bool) -> Rows {
        Rows { height, interlaced, pass: 0, next: 0 }
    }
}

impl Iterator for Rows {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if !self.interlaced {
            if self.next < self.height {
                self.next += 1;
                return Some(self.next - 1)
            }
            return None
        }
        while self.pass < INTERLACE_PASSES.len() {
            let (start, step) = INTERLACE_PASSES[self.pass];
            let row = start + self.next * step;
            if row < self.height {
                self.next += 1;
                return Some(row)
            }
            self.pass += 1;
            self.next = 0;
        }
        None
    }
}

/// 32-bit FNV-1a over the canvas, its palette, transparency and size.
///
/// Two visually identical canvases may still hash differently when their
/// raw indices or unused palette entries differ.
pub fn frame_hash(buffer: &[u8], palette: &[Rgb], transparent: Option<u8>, width: usize, height: usize) -> u32 {
    let transparent = transparent.map_or(-1, |idx| idx as i32);
    let tail = palette.iter()
        .flat_map(|color| color.to_argb().to_le_bytes())
        .chain(transparent.to_le_bytes())
        .chain((width as i32).to_le_bytes())
        .chain((height as i32).to_le_bytes());
    buffer.iter().cloned().chain(tail).fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// The live canvas and the canvas as it was before the last image
#[derive(Debug)]
pub struct Canvas {
    current: PackedBuffer,
    previous: PackedBuffer,
    /// Cells may hold the transparency sentinel.
    transparency: bool,
}

impl Canvas {
    /// Creates both buffers with every cell set to `sentinel`.
    pub fn new(width: usize, height: usize, depth: u8, sentinel: u8) -> Result<Canvas, DecodingError> {
        let current = PackedBuffer::new(width, height, depth, sentinel)?;
        Ok(Canvas {
            previous: current.clone(),
            current,
            transparency: true,
        })
    }

    #[cfg(test)]
    pub fn depth(&self) -> u8 {
        self.current.depth()
    }

    #[cfg(test)]
    pub fn current(&self) -> &PackedBuffer {
        &self.current
    }

    #[cfg(test)]
    pub fn current_mut(&mut self) -> &mut PackedBuffer {
        &mut self.current
    }

    #[cfg(test)]
    pub fn previous(&self) -> &PackedBuffer {
        &self.previous
    }

    #[cfg(test)]
    pub fn has_transparency(&self) -> bool {
        self.transparency
    }

    /// Widens both buffers until they have at least `depth` bits per pixel.
    pub fn grow_depth(&mut self, depth: u8) -> Result<(), DecodingError> {
        while self.current.depth() < depth {
            self.current.upsize()?;
        }
        while self.previous.depth() < depth {
            self.previous.upsize()?;
        }
        Ok(())
    }

    /// Moves the transparency sentinel from `old` to `new` in both buffers.
    pub fn replace(&mut self, old: u8, new: u8) -> Result<(), DecodingError> {
        self.current.replace(old, new)?;
        self.previous.replace(old, new)
    }

    /// Decodes one image's data onto the live buffer.
    ///
    /// Symbols equal to `transparent` leave the cell untouched; all others
    /// go through `tables.resolve`.
    pub fn draw<R: Read>(&mut self, lzw: &mut LzwDecoder, r: &mut R, min_code_size: u8,
                         desc: &ImageDescriptor, transparent: Option<u8>, tables: &ColorTables)
    -> Result<(), DecodingError> {
        let area = desc.subframe;
        // An opaque image covering the whole canvas hides every sentinel.
        if area == self.current.bounds() && transparent.is_none() {
            self.transparency = false;
        }
        let current = &mut self.current;
        let mut rows = Rows::new(area.height, desc.interlaced);
        let mut x = 0;
        let mut y = rows.next().unwrap_or(0);
        let produced = lzw.decode(r, min_code_size, area.width * area.height, |symbol| {
            if Some(symbol) != transparent {
                current.set(area.left + x, area.top + y, tables.resolve(symbol)?)?;
            }
            x += 1;
            if x == area.width {
                x = 0;
                y = rows.next().unwrap_or(area.height);
            }
            Ok(())
        })?;
        trace!("decoded {} of {} pixels at {:?}", produced, area.width * area.height, area);
        Ok(())
    }

    /// Copies the live buffer into a frame.
    pub fn snapshot<S: FrameSink>(&self, sink: &mut S, tables: &ColorTables, duration: u32) -> Frame<S::Image> {
        let buffer = self.current.as_bytes().to_vec();
        let palette = tables.table().to_vec();
        let transparent = if self.transparency {
            Some(tables.transparent())
        } else {
            None
        };
        let (width, height) = (self.current.width(), self.current.height());
        let hash = frame_hash(&buffer, &palette, transparent, width, height);
        let image = sink.create_frame(RawFrame {
            buffer,
            palette: palette.clone(),
            transparent,
            stride: self.current.stride(),
            width,
            height,
            depth: self.current.depth(),
            hash,
        });
        Frame::new(image, duration, palette, transparent)
    }

    /// Applies the disposal method to `area` and remembers the result as the
    /// previous canvas.
    pub fn dispose(&mut self, area: Rect, disposal: Option<DisposalMethod>, sentinel: u8)
    -> Result<(), DecodingError> {
        match disposal {
            Some(DisposalMethod::RestoreBackground) => {
                self.current.fill(sentinel, area)?;
                self.transparency = true;
            }
            Some(DisposalMethod::RestorePrevious) => {
                self.current.fill_from(&self.previous, area)?;
            }
            Some(DisposalMethod::Undefined) | Some(DisposalMethod::DoNotDispose) | None => (),
        }
        self.previous.make_equal(&self.current)
    }
}
