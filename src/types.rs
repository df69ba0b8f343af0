//! Common types produced and consumed by the decoder

/// Known block types
enum_from_primitive!{
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B
}
}

/// Known GIF extensions
enum_from_primitive!{
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF
}
}

/// Disposal method
enum_from_primitive!{
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DisposalMethod {
    Undefined = 0,
    DoNotDispose = 1,
    RestoreBackground = 2,
    RestorePrevious = 3
}
}

/// An RGB palette entry
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    /// Packed as `0xAARRGGBB` with an opaque alpha.
    pub fn to_argb(self) -> u32 {
        Argb::opaque(self).to_u32()
    }
}

/// An RGB color with an alpha channel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    pub fn new(a: u8, color: Rgb) -> Argb {
        Argb { a, r: color.r, g: color.g, b: color.b }
    }

    pub fn opaque(color: Rgb) -> Argb {
        Argb::new(0xFF, color)
    }

    pub fn to_u32(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

/// Canvas description found right after the header
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalScreenDescriptor {
    pub width: u16,
    pub height: u16,
    pub global_table: bool,
    /// Bits per primary color in the original image, 1 to 8.
    pub color_resolution: u8,
    pub global_table_sorted: bool,
    /// Number of entries in the global table, a power of two from 2 to 256.
    pub global_table_size: usize,
    pub background_index: u8,
    /// Approximate width to height ratio of a pixel.
    pub aspect_ratio: Option<f32>,
}

impl LogicalScreenDescriptor {
    pub fn from_packed(width: u16, height: u16, flags: u8, background: u8, aspect: u8)
    -> LogicalScreenDescriptor {
        LogicalScreenDescriptor {
            width,
            height,
            global_table: flags & 0b1000_0000 != 0,
            color_resolution: ((flags >> 4) & 0b111) + 1,
            global_table_sorted: flags & 0b0000_1000 != 0,
            global_table_size: 1 << ((flags & 0b111) + 1),
            background_index: background,
            aspect_ratio: if aspect == 0 {
                None
            } else {
                Some((aspect as f32 + 15.0) / 64.0)
            },
        }
    }
}

/// Rendering parameters for the next graphic block
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicControlExtension {
    pub disposal: DisposalMethod,
    pub user_input: bool,
    pub transparency: bool,
    /// Delay in milliseconds.
    pub delay: u32,
    pub transparent_index: u8,
}

impl GraphicControlExtension {
    /// Transparent index if the transparency flag is set.
    pub fn transparent(&self) -> Option<u8> {
        if self.transparency {
            Some(self.transparent_index)
        } else {
            None
        }
    }
}

/// A rectangle in canvas coordinates
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(left: usize, top: usize, width: usize, height: usize) -> Rect {
        Rect { left, top, width, height }
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }

    /// Whether `other` lies completely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Placement and layout of one table-based image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    pub subframe: Rect,
    pub local_table: bool,
    pub interlaced: bool,
    pub local_table_sorted: bool,
    pub local_table_size: usize,
}

impl ImageDescriptor {
    pub fn from_packed(left: u16, top: u16, width: u16, height: u16, flags: u8) -> ImageDescriptor {
        ImageDescriptor {
            subframe: Rect::new(left as usize, top as usize, width as usize, height as usize),
            local_table: flags & 0b1000_0000 != 0,
            interlaced: flags & 0b0100_0000 != 0,
            local_table_sorted: flags & 0b0010_0000 != 0,
            local_table_size: 1 << ((flags & 0b111) + 1),
        }
    }
}

/// The raw canvas handed to a `FrameSink`
///
/// `buffer` holds `stride * height` bytes of indices packed at `depth` bits
/// per pixel, most significant bits first. The palette may contain more
/// entries than `depth` can address.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub buffer: Vec<u8>,
    pub palette: Vec<Rgb>,
    pub transparent: Option<u8>,
    pub stride: usize,
    pub width: usize,
    pub height: usize,
    pub depth: u8,
    pub hash: u32,
}

impl RawFrame {
    /// Palette index stored at `(x, y)`.
    pub fn index_at(&self, x: usize, y: usize) -> u8 {
        let per_byte = 8 / self.depth as usize;
        let byte = self.buffer[y * self.stride + x / per_byte];
        let shift = 8 - self.depth as usize * (x % per_byte + 1);
        (byte >> shift) & (0xFF >> (8 - self.depth))
    }
}

/// A composited animation frame
#[derive(Debug, Clone)]
pub struct Frame<T> {
    pub image: T,
    /// Display duration in milliseconds.
    pub duration: u32,
    palette: Vec<Rgb>,
    transparent: Option<u8>,
}

impl<T> Frame<T> {
    pub fn new(image: T, duration: u32, palette: Vec<Rgb>, transparent: Option<u8>) -> Frame<T> {
        Frame { image, duration, palette, transparent }
    }

    pub fn color_table_size(&self) -> usize {
        self.palette.len()
    }

    pub fn transparent(&self) -> Option<u8> {
        self.transparent
    }

    /// The palette of this frame with the transparent entry's alpha cleared.
    pub fn color_table(&self) -> Vec<Argb> {
        let mut colors: Vec<Argb> = self.palette.iter().map(|&c| Argb::opaque(c)).collect();
        if let Some(idx) = self.transparent {
            if let Some(color) = colors.get_mut(idx as usize) {
                color.a = 0;
            }
        }
        colors
    }
}

/// A decoded GIF
#[derive(Debug, Clone)]
pub struct GifImage<T> {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) duration: u64,
    pub(crate) iterations: u16,
    pub(crate) frames: Vec<Frame<T>>,
}

impl<T> GifImage<T> {
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Sum of all frame durations in milliseconds.
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Number of times the animation plays, 0 meaning forever.
    pub fn iterations(&self) -> u16 {
        self.iterations
    }

    pub fn frames(&self) -> &[Frame<T>] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame<T>> {
        self.frames
    }
}
