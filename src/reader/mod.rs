use std::io;
use std::io::prelude::*;

use crate::traits::{FrameSink, HasParameters, Parameter};
use crate::types::GifImage;

mod decoder;
pub(crate) mod compositor;
pub(crate) mod lzw;
pub(crate) mod palette;

pub use self::decoder::{BitDepths, Decoder, DecodingError};
pub use self::palette::PLTE_CHANNELS;

impl<R: Read> Parameter<Reader<R>> for BitDepths {
    fn set_param(self, this: &mut Reader<R>) {
        this.depths = self;
    }
}

/// GIF reader
///
/// ```no_run
/// use gif_frames::{BitDepths, HasParameters, Reader, Indexed};
/// # fn main() -> Result<(), gif_frames::DecodingError> {
/// let file = std::fs::File::open("animation.gif")?;
/// let image = Reader::new(file)
///     .set(BitDepths::INDEXED_4BPP | BitDepths::INDEXED_8BPP)
///     .decode(Indexed)?;
/// for frame in image.frames() {
///     println!("{} ms, {} bpp", frame.duration, frame.image.depth);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Reader<R: Read> {
    r: io::BufReader<R>,
    depths: BitDepths,
}

impl<R: Read> HasParameters for Reader<R> {}

impl<R> Reader<R> where R: Read {
    /// Creates a reader that may use every supported bit depth.
    pub fn new(reader: R) -> Reader<R> {
        Reader {
            r: io::BufReader::new(reader),
            depths: BitDepths::default(),
        }
    }

    /// The bit depths the canvas may be stored with.
    pub fn depths(&self) -> BitDepths {
        self.depths
    }

    /// Decodes the whole stream, handing every composited frame to `sink`.
    pub fn decode<S: FrameSink>(&mut self, sink: S) -> Result<GifImage<S::Image>, DecodingError> {
        Decoder::new(self.depths, sink).decode(&mut self.r)
    }
}

/// Decodes a GIF from `reader` with the given set of bit depths.
pub fn decode<R: Read, S: FrameSink>(reader: R, depths: BitDepths, sink: S)
-> Result<GifImage<S::Image>, DecodingError> {
    Reader::new(reader).set(depths).decode(sink)
}

#[cfg(test)]
mod test {
    use super::{decode, Reader};
    use crate::test_utils::{grays, GifBuilder};
    use crate::traits::HasParameters;
    use crate::types::RawFrame;
    use crate::{BitDepths, DecodingError};

    fn gif() -> Vec<u8> {
        GifBuilder::new(3, 1, Some(&grays(2)))
            .image((0, 0, 3, 1), None, false, &[1, 0, 1])
            .finish()
    }

    #[test]
    fn parameters() {
        let mut reader = Reader::new(std::io::empty());
        assert_eq!(reader.depths(), BitDepths::all());
        reader.set(BitDepths::INDEXED_8BPP);
        assert_eq!(reader.depths(), BitDepths::INDEXED_8BPP);
    }

    #[test]
    fn depth_set_must_include_8bpp() {
        let data = gif();
        match decode(&data[..], BitDepths::INDEXED_1BPP | BitDepths::INDEXED_4BPP, |raw: RawFrame| raw) {
            Err(DecodingError::Precondition(_)) => (),
            other => panic!("unexpected {:?}", other.map(|g| g.frames().len())),
        }
        match decode(&data[..], BitDepths::from_bits_retain(0x18), |raw: RawFrame| raw) {
            Err(DecodingError::Precondition(_)) => (),
            other => panic!("unexpected {:?}", other.map(|g| g.frames().len())),
        }
    }

    #[test]
    fn only_8bpp() {
        let data = gif();
        let image = decode(&data[..], BitDepths::INDEXED_8BPP, |raw: RawFrame| raw).unwrap();
        let raw = &image.frames()[0].image;
        assert_eq!(raw.depth, 8);
        assert_eq!(raw.stride, 3);
        assert_eq!(raw.buffer, vec![1, 0, 1]);
    }

    #[test]
    fn smallest_allowed_depth() {
        let data = gif();
        let image = decode(&data[..], BitDepths::all(), |raw: RawFrame| raw).unwrap();
        let raw = &image.frames()[0].image;
        // Two colors plus the sentinel need two bits.
        assert_eq!(raw.depth, 2);
        assert_eq!(raw.stride, 1);
        // The padding bits still hold the initial sentinel.
        assert_eq!(raw.buffer, vec![0b0100_0110]);
    }
}
