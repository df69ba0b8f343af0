//! Traits used in this library
use std::io;

use crate::types::RawFrame;

/// Configuration parameter trait
pub trait Parameter<Object> {
    fn set_param(self, this: &mut Object);
}

/// Object has parameters
pub trait HasParameters: Sized {
    fn set<T: Parameter<Self>>(&mut self, value: T) -> &mut Self {
        value.set_param(self);
        self
    }
}

/// Turns a raw composited canvas into the caller's image type
///
/// Called once per decoded frame. The buffer and palette inside the
/// `RawFrame` are private copies and may be kept indefinitely.
pub trait FrameSink {
    type Image;

    fn create_frame(&mut self, frame: RawFrame) -> Self::Image;
}

impl<T, F> FrameSink for F where F: FnMut(RawFrame) -> T {
    type Image = T;

    fn create_frame(&mut self, frame: RawFrame) -> T {
        self(frame)
    }
}

/// Reader extension to read little endian data
pub trait ReadBytesExt<T> {
    fn read_le(&mut self) -> io::Result<T>;
}

impl<R: io::Read + ?Sized> ReadBytesExt<u8> for R {
    #[inline]
    fn read_le(&mut self) -> io::Result<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}

impl<R: io::Read + ?Sized> ReadBytesExt<u16> for R {
    #[inline]
    fn read_le(&mut self) -> io::Result<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

/// Reader extension for the length-prefixed data sub-blocks of GIF
pub trait ReadBlocksExt: io::Read {
    /// Reads a run of `N` bytes, e.g. a signature or identifier.
    fn read_chars<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads one sub-block into `buf` and returns its length.
    ///
    /// A length of zero is the block terminator.
    fn read_sub_block(&mut self, buf: &mut [u8; 255]) -> io::Result<usize> {
        let len: u8 = self.read_le()?;
        let len = len as usize;
        self.read_exact(&mut buf[..len])?;
        Ok(len)
    }

    /// Skips `n` bytes.
    fn skip_bytes(&mut self, n: usize) -> io::Result<()> {
        let skipped = io::copy(&mut io::Read::take(&mut *self, n as u64), &mut io::sink())?;
        if skipped < n as u64 {
            return Err(io::ErrorKind::UnexpectedEof.into())
        }
        Ok(())
    }

    /// Skips sub-blocks up to and including the terminator.
    fn skip_sub_blocks(&mut self) -> io::Result<()> {
        loop {
            let len: u8 = self.read_le()?;
            if len == 0 {
                return Ok(())
            }
            self.skip_bytes(len as usize)?;
        }
    }
}

impl<R: io::Read + ?Sized> ReadBlocksExt for R {}

#[cfg(test)]
mod test {
    use super::{ReadBlocksExt, ReadBytesExt};

    #[test]
    fn little_endian() {
        let mut data: &[u8] = &[0x34, 0x12, 0xFF];
        let n: u16 = data.read_le().unwrap();
        assert_eq!(n, 0x1234);
        let b: u8 = data.read_le().unwrap();
        assert_eq!(b, 0xFF);
        assert!(ReadBytesExt::<u8>::read_le(&mut data).is_err());
    }

    #[test]
    fn sub_blocks() {
        let mut data: &[u8] = &[2, 7, 8, 1, 9, 0, 0x3B];
        let mut buf = [0; 255];
        assert_eq!(data.read_sub_block(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[7, 8]);
        data.skip_sub_blocks().unwrap();
        assert_eq!(data, &[0x3B]);
    }

    #[test]
    fn truncated_skip() {
        let mut data: &[u8] = &[5, 1, 2];
        let err = data.skip_sub_blocks().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chars() {
        let mut data: &[u8] = b"GIF89a";
        assert_eq!(&data.read_chars::<3>().unwrap(), b"GIF");
        assert_eq!(&data.read_chars::<3>().unwrap(), b"89a");
    }
}
