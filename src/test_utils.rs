//! Builders for GIF streams used by the unit tests
use std::collections::HashMap;

/// Packs `(code, width)` pairs least significant bit first.
pub fn pack_codes(codes: &[(u16, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc = 0u32;
    let mut bits = 0u8;
    for &(code, width) in codes {
        acc |= (code as u32) << bits;
        bits += width;
        while bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        out.push(acc as u8);
    }
    out
}

/// Splits `data` into sub-blocks and appends the terminator.
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Image data that never lets the dictionary grow: every pixel is sent as a
/// root code and a clear code is repeated before the code width would change.
pub fn uncompressed(min_code_size: u8, pixels: &[u8]) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let width = min_code_size + 1;
    let mut codes = Vec::new();
    for chunk in pixels.chunks(clear as usize - 2) {
        codes.push((clear, width));
        codes.extend(chunk.iter().map(|&p| (p as u16, width)));
    }
    codes.push((clear + 1, width));
    sub_blocks(&pack_codes(&codes))
}

/// GIF LZW that keeps going with a full dictionary instead of sending a
/// clear code. Returns the sub-blocks and the number of dictionary codes
/// assigned.
pub fn compress_without_reset(min_code_size: u8, pixels: &[u8]) -> (Vec<u8>, usize) {
    let clear = 1u16 << min_code_size;
    let mut dict: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next = clear + 2;
    let mut width = min_code_size + 1;
    let mut codes = vec![(clear, width)];
    let mut word: Option<u16> = None;
    for &pixel in pixels {
        let prefix = match word {
            Some(prefix) => prefix,
            None => {
                word = Some(pixel as u16);
                continue
            }
        };
        if let Some(&code) = dict.get(&(prefix, pixel)) {
            word = Some(code);
            continue
        }
        codes.push((prefix, width));
        if next < 4096 {
            dict.insert((prefix, pixel), next);
            next += 1;
            if next > 1 << width && width < 12 {
                width += 1;
            }
        }
        word = Some(pixel as u16);
    }
    if let Some(code) = word {
        codes.push((code, width));
    }
    codes.push((clear + 1, width));
    (sub_blocks(&pack_codes(&codes)), next as usize)
}

/// Deterministic pseudo-random values below `colors`.
pub fn noise(len: usize, colors: u8) -> Vec<u8> {
    let mut state = 0x2545_F491u32;
    (0..len).map(|_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state % colors as u32) as u8
    }).collect()
}

fn table_bits(colors: &[[u8; 3]]) -> u8 {
    assert!(colors.len().is_power_of_two() && colors.len() >= 2 && colors.len() <= 256);
    colors.len().trailing_zeros() as u8 - 1
}

/// Minimal GIF writer
pub struct GifBuilder {
    data: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, global: Option<&[[u8; 3]]>) -> GifBuilder {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        match global {
            Some(colors) => {
                data.extend_from_slice(&[0x80 | 0x70 | table_bits(colors), 0, 0]);
                for c in colors {
                    data.extend_from_slice(c);
                }
            }
            None => data.extend_from_slice(&[0, 0, 0]),
        }
        GifBuilder { data }
    }

    pub fn raw(mut self, bytes: &[u8]) -> GifBuilder {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn control(self, disposal: u8, transparent: Option<u8>, delay: u16) -> GifBuilder {
        let flags = disposal << 2 | transparent.is_some() as u8;
        let delay = delay.to_le_bytes();
        self.raw(&[0x21, 0xF9, 4, flags, delay[0], delay[1], transparent.unwrap_or(0), 0])
    }

    pub fn netscape(self, loops: u16) -> GifBuilder {
        let loops = loops.to_le_bytes();
        self.raw(&[0x21, 0xFF, 11])
            .raw(b"NETSCAPE2.0")
            .raw(&[3, 1, loops[0], loops[1], 0])
    }

    pub fn comment(self, text: &[u8]) -> GifBuilder {
        let body = sub_blocks(text);
        self.raw(&[0x21, 0xFE]).raw(&body)
    }

    /// Appends a table-based image, `pixels` in stream order.
    pub fn image(mut self, rect: (u16, u16, u16, u16), local: Option<&[[u8; 3]]>, interlaced: bool,
                 pixels: &[u8]) -> GifBuilder {
        self.data.push(0x2C);
        for v in [rect.0, rect.1, rect.2, rect.3].iter() {
            self.data.extend_from_slice(&v.to_le_bytes());
        }
        let mut flags = if interlaced { 0x40 } else { 0 };
        if let Some(colors) = local {
            flags |= 0x80 | table_bits(colors);
        }
        self.data.push(flags);
        if let Some(colors) = local {
            for c in colors {
                self.data.extend_from_slice(c);
            }
        }
        let max = pixels.iter().cloned().max().unwrap_or(0);
        let mut min_code_size = 2;
        while (1u16 << min_code_size) <= max as u16 {
            min_code_size += 1;
        }
        self.data.push(min_code_size);
        let body = uncompressed(min_code_size, pixels);
        self.data.extend_from_slice(&body);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data.push(0x3B);
        self.data
    }
}

/// `n` distinct gray levels.
pub fn grays(n: usize) -> Vec<[u8; 3]> {
    (0..n).map(|i| [i as u8; 3]).collect()
}
