//! Packed indexed-color raster
//!
//! The canvas never leaves the decoder; sinks only see copies of its bytes.
//!
//! ```compile_fail
//! use gif_frames::PackedBuffer;
//! ```
use num::Integer;

use crate::reader::DecodingError;
use crate::types::Rect;

/// Supported bits per pixel
pub const DEPTHS: [u8; 4] = [1, 2, 4, 8];

/// A 2-D buffer of palette indices packed at 1, 2, 4 or 8 bits per pixel
///
/// Values are stored most significant bits first inside each byte. Rows are
/// `stride` bytes long, so the tail of a row may hold padding bits that are
/// never addressed.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBuffer {
    depth: u8,
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

impl PackedBuffer {
    /// Creates a buffer with every value set to `initial`.
    pub fn new(width: usize, height: usize, depth: u8, initial: u8) -> Result<PackedBuffer, DecodingError> {
        if !DEPTHS.contains(&depth) {
            return Err(DecodingError::Internal("bit depth must be 1, 2, 4 or 8"))
        }
        let stride = Integer::div_ceil(&(width * depth as usize), &8);
        let mut buffer = PackedBuffer {
            depth,
            width,
            height,
            stride,
            data: vec![0; stride * height],
        };
        if initial > buffer.max_value() {
            return Err(DecodingError::Internal("initial value does not fit the bit depth"))
        }
        if initial != 0 {
            let byte = buffer.replicate(initial);
            buffer.data.iter_mut().for_each(|b| *b = byte);
        }
        Ok(buffer)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Largest storable value.
    pub fn max_value(&self) -> u8 {
        (0xFFu16 >> (8 - self.depth)) as u8
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn per_byte(&self) -> usize {
        8 / self.depth as usize
    }

    /// Byte index and bit shift of the value at `(x, y)`.
    #[inline]
    fn locate(&self, x: usize, y: usize) -> (usize, u32) {
        let per_byte = self.per_byte();
        let index = y * self.stride + x / per_byte;
        let shift = 8 - self.depth as u32 * (x % per_byte + 1) as u32;
        (index, shift)
    }

    /// `value` repeated in every slot of a byte.
    fn replicate(&self, value: u8) -> u8 {
        let mut byte = value;
        let mut bits = self.depth;
        while bits < 8 {
            byte |= byte << bits;
            bits *= 2;
        }
        byte
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        let (index, shift) = self.locate(x, y);
        (self.data[index] >> shift) & self.max_value()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) -> Result<(), DecodingError> {
        if value > self.max_value() {
            return Err(DecodingError::Internal("value exceeds the buffer bit depth"))
        }
        self.put(x, y, value);
        Ok(())
    }

    #[inline]
    fn put(&mut self, x: usize, y: usize, value: u8) {
        let (index, shift) = self.locate(x, y);
        let mask = self.max_value() << shift;
        self.data[index] = (self.data[index] & !mask) | (value << shift);
    }

    /// Sets every value inside `area` to `value`.
    pub fn fill(&mut self, value: u8, area: Rect) -> Result<(), DecodingError> {
        if value > self.max_value() {
            return Err(DecodingError::Internal("value exceeds the buffer bit depth"))
        }
        let byte = self.replicate(value);
        self.fill_with(area, |_, _| value, |_| byte)
    }

    /// Copies the values inside `area` from `source`, which must have the
    /// same dimensions.
    pub fn fill_from(&mut self, source: &PackedBuffer, area: Rect) -> Result<(), DecodingError> {
        if source.width != self.width || source.height != self.height {
            return Err(DecodingError::Internal("buffers differ in size"))
        }
        if source.depth == self.depth {
            self.fill_with(area, |x, y| source.get(x, y), |i| source.data[i])
        } else {
            for y in area.top..area.bottom() {
                for x in area.left..area.right() {
                    self.set(x, y, source.get(x, y))?;
                }
            }
            Ok(())
        }
    }

    /// Walks each row of `area`, writing single values at the unaligned edges
    /// and whole bytes in between.
    fn fill_with<F, G>(&mut self, area: Rect, mut value: F, mut byte: G) -> Result<(), DecodingError>
    where F: FnMut(usize, usize) -> u8, G: FnMut(usize) -> u8 {
        if !self.bounds().contains(&area) {
            return Err(DecodingError::Internal("fill area extends outside the buffer"))
        }
        let per_byte = self.per_byte();
        let right = area.right();
        for y in area.top..area.bottom() {
            let row = y * self.stride;
            let mut x = area.left;
            while x < right && x % per_byte != 0 {
                self.put(x, y, value(x, y));
                x += 1;
            }
            while x + per_byte <= right {
                let index = row + x / per_byte;
                self.data[index] = byte(index);
                x += per_byte;
            }
            while x < right {
                self.put(x, y, value(x, y));
                x += 1;
            }
        }
        Ok(())
    }

    /// Doubles the bit depth, keeping every value.
    pub fn upsize(&mut self) -> Result<(), DecodingError> {
        if self.depth == 8 {
            return Err(DecodingError::Internal("bit depth is already at its maximum of 8"))
        }
        let mut wider = PackedBuffer::new(self.width, self.height, self.depth * 2, 0)?;
        for y in 0..self.height {
            for x in 0..self.width {
                wider.put(x, y, self.get(x, y));
            }
        }
        *self = wider;
        Ok(())
    }

    /// Makes this buffer hold the same values as `source`, growing the bit
    /// depth if `source` is deeper.
    pub fn make_equal(&mut self, source: &PackedBuffer) -> Result<(), DecodingError> {
        while self.depth < source.depth {
            self.upsize()?;
        }
        if self.depth == source.depth && self.data.len() == source.data.len() {
            self.data.copy_from_slice(&source.data);
            Ok(())
        } else {
            self.fill_from(source, self.bounds())
        }
    }

    /// Rewrites every occurrence of `old` to `new`.
    pub fn replace(&mut self, old: u8, new: u8) -> Result<(), DecodingError> {
        if new > self.max_value() {
            return Err(DecodingError::Internal("value exceeds the buffer bit depth"))
        }
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) == old {
                    self.put(x, y, new);
                }
            }
        }
        Ok(())
    }

    /// All values in raster order, skipping row padding.
    #[cfg(test)]
    pub fn values<'a>(&'a self) -> impl Iterator<Item = u8> + 'a {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| self.get(x, y)))
    }
}
