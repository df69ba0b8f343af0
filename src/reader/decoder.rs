use std::error;
use std::fmt;
use std::io;
use std::io::prelude::*;

use bitflags::bitflags;
use enum_primitive::FromPrimitive;
use log::{debug, trace, warn};

use crate::traits::{FrameSink, ReadBlocksExt, ReadBytesExt};
use crate::types::{
    Block, DisposalMethod, Extension, Frame, GifImage, GraphicControlExtension,
    ImageDescriptor, LogicalScreenDescriptor, Rect,
};

use super::compositor::Canvas;
use super::lzw::LzwDecoder;
use super::palette::{read_color_table, ColorTables};

#[derive(Debug)]
pub enum DecodingError {
    /// The decoder was called with arguments it cannot work with.
    Precondition(&'static str),
    /// The stream is not a well-formed GIF.
    Format(&'static str),
    /// The stream is valid but uses something this decoder cannot represent.
    Unsupported(&'static str),
    /// An internal invariant was violated.
    Internal(&'static str),
    Io(io::Error),
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DecodingError::Precondition(msg) => write!(f, "invalid argument: {}", msg),
            DecodingError::Format(msg) => write!(f, "malformed GIF: {}", msg),
            DecodingError::Unsupported(msg) => write!(f, "unsupported GIF: {}", msg),
            DecodingError::Internal(msg) => write!(f, "internal error: {}", msg),
            DecodingError::Io(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for DecodingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            DecodingError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodingError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodingError::Format("unexpected EOF")
        } else {
            DecodingError::Io(err)
        }
    }
}

bitflags! {
    /// Bits per pixel the raster buffers may use
    ///
    /// The set must always contain `INDEXED_8BPP`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct BitDepths: u8 {
        const INDEXED_1BPP = 1;
        const INDEXED_2BPP = 2;
        const INDEXED_4BPP = 4;
        const INDEXED_8BPP = 8;
    }
}

impl BitDepths {
    /// Whether buffers may be stored with `depth` bits per pixel.
    pub fn allows(self, depth: u8) -> bool {
        depth.is_power_of_two() && self.bits() & depth != 0
    }

    pub(crate) fn validate(self) -> Result<(), DecodingError> {
        if self.bits() & !BitDepths::all().bits() != 0 {
            return Err(DecodingError::Precondition("unknown bit depth in the allowed set"))
        }
        if !self.contains(BitDepths::INDEXED_8BPP) {
            return Err(DecodingError::Precondition("the allowed bit depths must include 8 bits per pixel"))
        }
        Ok(())
    }
}

impl Default for BitDepths {
    fn default() -> BitDepths {
        BitDepths::all()
    }
}

/// Internal state of the GIF decoder
#[derive(Debug, Copy, Clone, PartialEq)]
enum State {
    Magic,
    ScreenDescriptor,
    BlockStart,
    Trailer,
}
use self::State::*;

/// Looping application extension
const NETSCAPE: (&[u8; 8], &[u8; 3]) = (b"NETSCAPE", b"2.0");

/// Decodes one GIF stream into composited frames
///
/// A `Decoder` is consumed by `decode`; all working buffers live and die with
/// it.
pub struct Decoder<S: FrameSink> {
    state: State,
    sink: S,
    version: &'static str,
    screen: Option<LogicalScreenDescriptor>,
    tables: ColorTables,
    canvas: Option<Canvas>,
    lzw: LzwDecoder,
    iterations: u16,
    duration: u64,
    frames: Vec<Frame<S::Image>>,
}

impl<S: FrameSink> Decoder<S> {
    pub fn new(depths: BitDepths, sink: S) -> Decoder<S> {
        Decoder {
            state: Magic,
            sink,
            version: "",
            screen: None,
            tables: ColorTables::new(depths),
            canvas: None,
            lzw: LzwDecoder::new(),
            iterations: 1,
            duration: 0,
            frames: Vec::new(),
        }
    }

    /// Reads `r` up to the trailer.
    ///
    /// The allowed bit depths are checked before the first byte is read.
    pub fn decode<R: Read>(mut self, r: &mut R) -> Result<GifImage<S::Image>, DecodingError> {
        self.tables.depths().validate()?;
        while self.state != Trailer {
            self.state = self.next_state(r)?;
        }
        let (width, height) = match self.screen {
            Some(ref screen) => (screen.width, screen.height),
            None => return Err(DecodingError::Internal("trailer reached without a logical screen")),
        };
        debug!(
            "decoded GIF{} {}x{}: {} frames, {} ms, {} iterations",
            self.version, width, height, self.frames.len(), self.duration, self.iterations
        );
        Ok(GifImage {
            width,
            height,
            duration: self.duration,
            iterations: self.iterations,
            frames: self.frames,
        })
    }

    fn next_state<R: Read>(&mut self, r: &mut R) -> Result<State, DecodingError> {
        match self.state {
            Magic => {
                self.read_header(r)?;
                Ok(ScreenDescriptor)
            }
            ScreenDescriptor => {
                self.read_logical_screen(r)?;
                Ok(BlockStart)
            }
            BlockStart => {
                let code: u8 = r.read_le()?;
                match Block::from_u8(code) {
                    Some(Block::Image) => {
                        self.read_table_based_image(r, None)?;
                        Ok(BlockStart)
                    }
                    Some(Block::Extension) => {
                        self.read_extension(r)?;
                        Ok(BlockStart)
                    }
                    Some(Block::Trailer) => Ok(Trailer),
                    None => {
                        debug!("unexpected block code {:#04x}", code);
                        Err(DecodingError::Format("unexpected block code"))
                    }
                }
            }
            Trailer => Ok(Trailer),
        }
    }

    fn read_header<R: Read>(&mut self, r: &mut R) -> Result<(), DecodingError> {
        let signature = r.read_chars::<3>()?;
        if &signature != b"GIF" {
            return Err(DecodingError::Format("malformed GIF header"))
        }
        self.version = match &r.read_chars::<3>()? {
            b"87a" => "87a",
            b"89a" => "89a",
            _ => return Err(DecodingError::Format("unsupported GIF version"))
        };
        Ok(())
    }

    fn read_logical_screen<R: Read>(&mut self, r: &mut R) -> Result<(), DecodingError> {
        let width: u16 = r.read_le()?;
        let height: u16 = r.read_le()?;
        let flags: u8 = r.read_le()?;
        let background: u8 = r.read_le()?;
        let aspect: u8 = r.read_le()?;
        let screen = LogicalScreenDescriptor::from_packed(width, height, flags, background, aspect);
        debug!("GIF{} logical screen {:?}", self.version, screen);
        if screen.global_table {
            let table = read_color_table(r, screen.global_table_size)?;
            let size = (width as usize, height as usize);
            self.tables.set_global(table, &mut self.canvas, size)?;
        }
        self.screen = Some(screen);
        Ok(())
    }

    fn read_extension<R: Read>(&mut self, r: &mut R) -> Result<(), DecodingError> {
        let label: u8 = r.read_le()?;
        match Extension::from_u8(label) {
            Some(Extension::Control) => self.read_graphic_block(r),
            Some(Extension::Application) => self.read_application_extension(r),
            Some(Extension::Comment) | Some(Extension::Text) => skip_extension(r),
            None => {
                warn!("Skipping unknown extension: {:#04x}", label);
                skip_extension(r)
            }
        }
    }

    /// A graphic control extension followed by the block it applies to.
    ///
    /// Application and other extensions may sit between the two; they are
    /// handled as usual and the search continues. The graphic block ends with
    /// an image or a plain text extension.
    fn read_graphic_block<R: Read>(&mut self, r: &mut R) -> Result<(), DecodingError> {
        let control = read_control_extension(r)?;
        loop {
            let code: u8 = r.read_le()?;
            match Block::from_u8(code) {
                Some(Block::Image) => return self.read_table_based_image(r, Some(control)),
                Some(Block::Extension) => {
                    let label: u8 = r.read_le()?;
                    match Extension::from_u8(label) {
                        Some(Extension::Text) => {
                            trace!("plain text extension skipped as graphic rendering block");
                            return skip_extension(r)
                        }
                        Some(Extension::Application) => self.read_application_extension(r)?,
                        Some(_) => skip_extension(r)?,
                        None => {
                            warn!("Skipping unknown extension: {:#04x}", label);
                            skip_extension(r)?
                        }
                    }
                }
                _ => return Err(DecodingError::Format(
                    "unexpected block code after a graphic control extension"
                ))
            }
        }
    }

    fn read_application_extension<R: Read>(&mut self, r: &mut R) -> Result<(), DecodingError> {
        let size: u8 = r.read_le()?;
        if size != 11 {
            return Err(DecodingError::Format("application extension has wrong length"))
        }
        let identifier = r.read_chars::<8>()?;
        let auth_code = r.read_chars::<3>()?;
        if (&identifier, &auth_code) != NETSCAPE {
            return Ok(r.skip_sub_blocks()?)
        }
        let size: u8 = r.read_le()?;
        if size != 3 {
            return Err(DecodingError::Format("looping extension has wrong length"))
        }
        let _id: u8 = r.read_le()?;
        self.iterations = r.read_le()?;
        debug!("loop count {}", self.iterations);
        finish_sub_blocks(r)
    }

    fn read_table_based_image<R: Read>(&mut self, r: &mut R, control: Option<GraphicControlExtension>)
    -> Result<(), DecodingError> {
        let left: u16 = r.read_le()?;
        let top: u16 = r.read_le()?;
        let width: u16 = r.read_le()?;
        let height: u16 = r.read_le()?;
        let flags: u8 = r.read_le()?;
        let desc = ImageDescriptor::from_packed(left, top, width, height, flags);

        let size = match self.screen {
            Some(ref screen) => (screen.width as usize, screen.height as usize),
            None => return Err(DecodingError::Internal("image before the logical screen")),
        };
        if !Rect::new(0, 0, size.0, size.1).contains(&desc.subframe) {
            return Err(DecodingError::Format("subframe extends outside the logical screen"))
        }

        if desc.local_table {
            let table = read_color_table(r, desc.local_table_size)?;
            self.tables.use_local(table, &mut self.canvas, size)?;
        } else if self.tables.has_global() && !self.tables.global_active() {
            self.tables.restore_global(&mut self.canvas, size)?;
        }
        if self.canvas.is_none() {
            // No color table at all; the image may still be fully transparent.
            let depth = self.tables.target_depth(1)?;
            self.canvas = Some(Canvas::new(size.0, size.1, depth, self.tables.transparent())?);
        }
        let canvas = match self.canvas {
            Some(ref mut canvas) => canvas,
            None => return Err(DecodingError::Internal("canvas missing")),
        };

        let min_code_size: u8 = r.read_le()?;
        let transparent = control.as_ref().and_then(|c| c.transparent());
        canvas.draw(&mut self.lzw, r, min_code_size, &desc, transparent, &self.tables)?;

        let delay = control.as_ref().map_or(0, |c| c.delay);
        let frame = canvas.snapshot(&mut self.sink, &self.tables, delay);
        trace!(
            "frame {}: {:?}, {} ms, transparent {:?}",
            self.frames.len(), desc.subframe, frame.duration, frame.transparent()
        );
        self.duration += frame.duration as u64;
        self.frames.push(frame);

        canvas.dispose(desc.subframe, control.map(|c| c.disposal), self.tables.transparent())
    }
}

fn read_control_extension<R: Read>(r: &mut R) -> Result<GraphicControlExtension, DecodingError> {
    let size: u8 = r.read_le()?;
    if size != 4 {
        return Err(DecodingError::Format("control extension has wrong length"))
    }
    let flags: u8 = r.read_le()?;
    let disposal = match DisposalMethod::from_u8((flags & 0b11100) >> 2) {
        Some(method) => method,
        None => return Err(DecodingError::Format("unknown disposal method"))
    };
    let delay: u16 = r.read_le()?;
    let transparent_index: u8 = r.read_le()?;
    finish_sub_blocks(r)?;
    Ok(GraphicControlExtension {
        disposal,
        user_input: flags & 0b10 != 0,
        transparency: flags & 1 != 0,
        delay: delay as u32 * 10,
        transparent_index,
    })
}

/// Reads the terminator after a fixed-size body, skipping any unexpected
/// trailing sub-blocks.
fn finish_sub_blocks<R: Read>(r: &mut R) -> Result<(), DecodingError> {
    let terminator: u8 = r.read_le()?;
    if terminator != 0 {
        trace!("skipping trailing sub-blocks of an extension");
        r.skip_bytes(terminator as usize)?;
        r.skip_sub_blocks()?;
    }
    Ok(())
}

/// Skips an extension: its first sub-block and whatever follows it.
fn skip_extension<R: Read>(r: &mut R) -> Result<(), DecodingError> {
    let size: u8 = r.read_le()?;
    if size == 0 {
        return Ok(())
    }
    r.skip_bytes(size as usize)?;
    Ok(r.skip_sub_blocks()?)
}
