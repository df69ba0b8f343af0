use std::io;
use std::io::prelude::*;

use log::trace;

use crate::traits::ReadBlocksExt;

use super::decoder::DecodingError;

const MAX_CODESIZE: u8 = 12;
const MAX_ENTRIES: usize = 1 << MAX_CODESIZE;

/// Reads codes least significant bit first from a chain of data sub-blocks
struct LsbReader<'a, R: 'a> {
    r: &'a mut R,
    block: [u8; 255],
    len: usize,
    pos: usize,
    acc: u32,
    bits: u8,
    /// The zero-length sub-block was consumed.
    terminated: bool,
}

impl<'a, R: Read> LsbReader<'a, R> {
    fn new(r: &'a mut R) -> LsbReader<'a, R> {
        LsbReader {
            r,
            block: [0; 255],
            len: 0,
            pos: 0,
            acc: 0,
            bits: 0,
            terminated: false,
        }
    }

    /// Next code of `size` bits, or `None` once the sub-blocks run out.
    fn read_code(&mut self, size: u8) -> io::Result<Option<u16>> {
        while self.bits < size {
            if self.terminated {
                return Ok(None)
            }
            if self.pos == self.len {
                self.len = self.r.read_sub_block(&mut self.block)?;
                self.pos = 0;
                if self.len == 0 {
                    self.terminated = true;
                    return Ok(None)
                }
            }
            self.acc |= (self.block[self.pos] as u32) << self.bits;
            self.pos += 1;
            self.bits += 8;
        }
        let code = self.acc & ((1 << size) - 1);
        self.acc >>= size;
        self.bits -= size;
        Ok(Some(code as u16))
    }

    /// Skips what is left of the image data, terminator included.
    fn drain(&mut self) -> io::Result<()> {
        if !self.terminated {
            self.r.skip_sub_blocks()?;
            self.terminated = true;
        }
        Ok(())
    }
}

/// GIF flavoured LZW decompressor
///
/// The dictionary is stored as prefix/suffix arrays: every word is a shorter
/// word plus one symbol, so a code expands by walking its prefix chain down to
/// a root. The arrays are reused between images.
pub struct LzwDecoder {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    stack: Vec<u8>,
}

impl LzwDecoder {
    pub fn new() -> LzwDecoder {
        LzwDecoder {
            prefix: vec![0; MAX_ENTRIES],
            suffix: vec![0; MAX_ENTRIES],
            stack: Vec::with_capacity(MAX_ENTRIES + 1),
        }
    }

    /// Decodes up to `count` symbols from the sub-blocks in `r`, passing each
    /// one to `emit`, and returns the number produced.
    ///
    /// `r` is left right after the image data's terminating sub-block.
    pub fn decode<R, F>(&mut self, r: &mut R, min_code_size: u8, count: usize, mut emit: F)
    -> Result<usize, DecodingError>
    where R: Read, F: FnMut(u8) -> Result<(), DecodingError> {
        if min_code_size == 0 || min_code_size >= MAX_CODESIZE {
            return Err(DecodingError::Format("invalid minimum code size"))
        }
        let clear = 1u16 << min_code_size;
        let end = clear + 1;
        for i in 0..clear {
            self.prefix[i as usize] = 0;
            self.suffix[i as usize] = i as u8;
        }
        self.stack.clear();

        let mut code_size = min_code_size + 1;
        let mut next = end + 1;
        let mut prev: Option<u16> = None;
        // First symbol of the previous word.
        let mut first = 0u8;
        let mut produced = 0;
        let mut bits = LsbReader::new(r);

        while produced < count {
            if self.stack.is_empty() {
                let code = match bits.read_code(code_size)? {
                    Some(code) => code,
                    None => break,
                };
                if code == end || code > next {
                    break
                }
                if code == clear {
                    trace!("lzw reset after {} symbols", produced);
                    code_size = min_code_size + 1;
                    next = end + 1;
                    prev = None;
                    continue
                }
                let prev_code = match prev {
                    Some(prev_code) => prev_code,
                    None => {
                        if code >= clear {
                            break
                        }
                        first = self.suffix[code as usize];
                        self.stack.push(first);
                        prev = Some(code);
                        continue
                    }
                };

                let mut walk = code;
                if code == next {
                    // The word being defined right now: previous word plus
                    // its own first symbol.
                    self.stack.push(first);
                    walk = prev_code;
                }
                while walk > clear {
                    self.stack.push(self.suffix[walk as usize]);
                    walk = self.prefix[walk as usize];
                }
                first = self.suffix[walk as usize];
                self.stack.push(first);

                if (next as usize) < MAX_ENTRIES {
                    self.prefix[next as usize] = prev_code;
                    self.suffix[next as usize] = first;
                    next += 1;
                    if (next as usize) < MAX_ENTRIES && next & ((1 << code_size) - 1) == 0 {
                        code_size += 1;
                    }
                }
                prev = Some(code);
            }

            if let Some(symbol) = self.stack.pop() {
                emit(symbol)?;
                produced += 1;
            }
        }

        self.stack.clear();
        bits.drain()?;
        Ok(produced)
    }
}

#[cfg(test)]
mod test {
    use super::LzwDecoder;
    use crate::test_utils::{compress_without_reset, noise, pack_codes, sub_blocks, uncompressed};
    use crate::DecodingError;

    fn decode_all(data: &[u8], min_code_size: u8, count: usize) -> (Vec<u8>, usize) {
        let mut r = data;
        let mut out = Vec::new();
        LzwDecoder::new().decode(&mut r, min_code_size, count, |b| {
            out.push(b);
            Ok(())
        }).unwrap();
        (out, r.len())
    }

    #[test]
    fn repeated_word_before_definition() {
        // clear, 0, 6, 6, end: the first 6 is used before the decoder has
        // finished defining it.
        let codes = pack_codes(&[(4, 3), (0, 3), (6, 3), (6, 3), (5, 4)]);
        let data = sub_blocks(&codes);
        let (out, left) = decode_all(&data, 2, 100);
        assert_eq!(out, vec![0, 0, 0, 0, 0]);
        assert_eq!(left, 0);
    }

    #[test]
    fn stops_at_pixel_count_and_drains() {
        let pixels = [1, 2, 3, 0, 1, 2, 3, 0, 3, 3];
        let mut data = uncompressed(2, &pixels);
        data.push(0x3B);
        let (out, left) = decode_all(&data, 2, 4);
        assert_eq!(out, &pixels[..4]);
        assert_eq!(left, 1);
    }

    #[test]
    fn uncompressed_stream() {
        let pixels: Vec<u8> = (0..600u32).map(|i| (i * 31 % 256) as u8).collect();
        let data = uncompressed(8, &pixels);
        let (out, left) = decode_all(&data, 8, pixels.len());
        assert_eq!(out, pixels);
        assert_eq!(left, 0);
    }

    #[test]
    fn code_width_grows() {
        // min size 2: after codes 0,1,2 the dictionary reaches 8 entries and
        // the following code is read with 4 bits.
        let codes = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (7, 4), (5, 4)]);
        let data = sub_blocks(&codes);
        let (out, _) = decode_all(&data, 2, 100);
        // 6 = 0+1, 7 = 1+2, 8 = 2+3
        assert_eq!(out, vec![0, 1, 2, 3, 1, 2]);
    }

    #[test]
    fn code_beyond_dictionary_ends_data() {
        let codes = pack_codes(&[(4, 3), (1, 3), (7, 3), (1, 3)]);
        let data = sub_blocks(&codes);
        let (out, left) = decode_all(&data, 2, 100);
        assert_eq!(out, vec![1]);
        assert_eq!(left, 0);
    }

    #[test]
    fn terminator_without_end_code() {
        // Exactly three bytes of codes, so no padding bits are left over.
        let codes = pack_codes(&[(4, 3), (2, 3), (2, 3), (2, 3), (2, 4), (2, 4), (2, 4)]);
        assert_eq!(codes.len(), 3);
        let data = sub_blocks(&codes);
        let (out, left) = decode_all(&data, 2, 100);
        assert_eq!(out, vec![2; 6]);
        assert_eq!(left, 0);
    }

    #[test]
    fn empty_image_still_drains() {
        let mut data = uncompressed(2, &[1, 1, 1]);
        data.push(0x3B);
        let (out, left) = decode_all(&data, 2, 0);
        assert!(out.is_empty());
        assert_eq!(left, 1);
    }

    #[test]
    fn full_dictionary_without_clear() {
        // The table fills long before the end; later codes stay 12 bits wide
        // and add nothing.
        let pixels = noise(300 * 300, 127);
        let (data, assigned) = compress_without_reset(7, &pixels);
        assert_eq!(assigned, 4096);
        let (out, left) = decode_all(&data, 7, pixels.len());
        assert_eq!(out, pixels);
        assert_eq!(left, 0);
    }

    #[test]
    fn full_dictionary_small_code_size() {
        let pixels = noise(40_000, 4);
        let (data, assigned) = compress_without_reset(2, &pixels);
        assert_eq!(assigned, 4096);
        let (out, _) = decode_all(&data, 2, pixels.len());
        assert_eq!(out, pixels);
    }

    #[test]
    fn rejects_code_size() {
        let data = [0u8];
        let mut r = &data[..];
        match LzwDecoder::new().decode(&mut r, 12, 1, |_| Ok(())) {
            Err(DecodingError::Format(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn emit_errors_propagate() {
        let data = uncompressed(2, &[1, 1]);
        let mut r = &data[..];
        let result = LzwDecoder::new().decode(&mut r, 2, 2, |_| Err(DecodingError::Internal("stop")));
        assert!(result.is_err());
    }
}
