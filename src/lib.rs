//! # GIF decoder producing composited frames
//!
//! Every image of a GIF is drawn onto a persistent canvas, honoring subframe
//! placement, transparency and disposal, and a snapshot of the whole canvas
//! is handed to a [`FrameSink`] after each image. Canvases are kept as packed
//! palette indices at the smallest allowed bit depth.
//!
//! ```no_run
//! use gif_frames::{BitDepths, TrueColor};
//! # fn main() -> Result<(), gif_frames::DecodingError> {
//! let file = std::fs::File::open("animation.gif")?;
//! let image = gif_frames::decode(file, BitDepths::all(), TrueColor)?;
//! println!("{} frames, played {} times", image.frames().len(), image.iterations());
//! # Ok(())
//! # }
//! ```

#[macro_use] extern crate enum_primitive;

mod traits;
mod types;
mod buffer;
mod reader;
mod sink;

#[cfg(test)]
mod test_utils;

pub use traits::{FrameSink, HasParameters, Parameter};
pub use types::{
    Argb, Block, DisposalMethod, Extension, Frame, GifImage, GraphicControlExtension,
    ImageDescriptor, LogicalScreenDescriptor, RawFrame, Rect, Rgb,
};

pub use reader::{decode, BitDepths, Decoder, DecodingError, Reader, PLTE_CHANNELS};
pub use sink::{Indexed, RgbaFrame, TrueColor, N_CHANNELS};

#[cfg(test)]
#[test]
fn composited_animation() {
    use crate::test_utils::{grays, GifBuilder};

    let gif = GifBuilder::new(3, 2, Some(&grays(4)))
        .netscape(0)
        .control(1, None, 10)
        .image((0, 0, 3, 2), None, false, &[1, 1, 1, 1, 1, 1])
        .control(2, None, 10)
        .image((1, 0, 2, 1), None, false, &[2, 3])
        .control(0, Some(0), 20)
        .image((0, 1, 3, 1), None, true, &[0, 3, 0])
        .finish();
    let image = decode(&gif[..], BitDepths::all(), Indexed).unwrap();
    assert_eq!((image.width(), image.height()), (3, 2));
    assert_eq!(image.iterations(), 0);
    assert_eq!(image.duration(), 400);

    let rows: Vec<Vec<u8>> = image.frames().iter().map(|f| {
        (0..2).flat_map(|y| (0..3).map(move |x| (x, y))).map(|(x, y)| f.image.index_at(x, y)).collect()
    }).collect();
    assert_eq!(rows[0], vec![1, 1, 1, 1, 1, 1]);
    assert_eq!(rows[1], vec![1, 2, 3, 1, 1, 1]);
    // The second image was cleared back to the sentinel.
    assert_eq!(rows[2], vec![1, 4, 4, 1, 3, 1]);
    assert_eq!(image.frames()[0].transparent(), None);
    assert_eq!(image.frames()[1].transparent(), None);
    assert_eq!(image.frames()[2].transparent(), Some(4));
    assert_eq!(image.frames()[2].color_table()[4].a, 0);
}
