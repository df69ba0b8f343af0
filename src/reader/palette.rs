//! Global and local color tables and the transparency sentinel
use std::io::prelude::*;

use log::debug;

use crate::buffer::DEPTHS;
use crate::traits::ReadBlocksExt;
use crate::types::Rgb;

use super::compositor::Canvas;
use super::decoder::{BitDepths, DecodingError};

/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;

/// Reads a color table of `entries` RGB triples.
pub fn read_color_table<R: Read>(r: &mut R, entries: usize) -> Result<Vec<Rgb>, DecodingError> {
    let mut table = Vec::with_capacity(entries + 1);
    for _ in 0..entries {
        let [red, green, blue] = r.read_chars::<PLTE_CHANNELS>()?;
        table.push(Rgb::new(red, green, blue));
    }
    Ok(table)
}

/// Which table is in effect
#[derive(Debug, Copy, Clone, PartialEq)]
enum Active {
    None,
    Global,
    Local,
}

/// Tracks the active color table and the palette slot reserved to mark
/// canvas cells that no image has drawn to.
///
/// The sentinel is a slot whose color duplicates another entry (`remap`),
/// or a slot appended past the end of the table. Decoded pixels that happen
/// to use the sentinel value are stored as `remap` instead.
#[derive(Debug)]
pub struct ColorTables {
    depths: BitDepths,
    global: Option<Vec<Rgb>>,
    table: Vec<Rgb>,
    active: Active,
    transparent: u8,
    remap: u8,
}

impl ColorTables {
    pub fn new(depths: BitDepths) -> ColorTables {
        ColorTables {
            depths,
            global: None,
            table: Vec::new(),
            active: Active::None,
            transparent: 0,
            remap: 0,
        }
    }

    pub fn depths(&self) -> BitDepths {
        self.depths
    }

    /// The active table, including an appended sentinel slot.
    pub fn table(&self) -> &[Rgb] {
        &self.table
    }

    pub fn transparent(&self) -> u8 {
        self.transparent
    }

    #[cfg(test)]
    pub fn remap(&self) -> u8 {
        self.remap
    }

    pub fn has_global(&self) -> bool {
        self.global.is_some()
    }

    pub fn global_active(&self) -> bool {
        self.active == Active::Global
    }

    /// Installs the global table and makes it active.
    pub fn set_global(&mut self, table: Vec<Rgb>, canvas: &mut Option<Canvas>, size: (usize, usize))
    -> Result<(), DecodingError> {
        self.global = Some(table.clone());
        self.activate(table, Active::Global, canvas, size)
    }

    /// Makes a local table active for the next image.
    pub fn use_local(&mut self, table: Vec<Rgb>, canvas: &mut Option<Canvas>, size: (usize, usize))
    -> Result<(), DecodingError> {
        self.activate(table, Active::Local, canvas, size)
    }

    /// Switches back to the global table if a local one is in effect.
    pub fn restore_global(&mut self, canvas: &mut Option<Canvas>, size: (usize, usize))
    -> Result<(), DecodingError> {
        match self.global {
            Some(ref global) if self.active != Active::Global => {
                let table = global.clone();
                self.activate(table, Active::Global, canvas, size)
            }
            _ => Ok(())
        }
    }

    fn activate(&mut self, table: Vec<Rgb>, active: Active, canvas: &mut Option<Canvas>,
                size: (usize, usize)) -> Result<(), DecodingError> {
        let old_transparent = self.transparent;
        self.table = table;
        self.active = active;
        self.reserve_transparent();
        let depth = self.target_depth(self.table.len())?;
        debug!(
            "{:?} color table: {} entries, transparent {} (remap {}), {} bpp",
            active, self.table.len(), self.transparent, self.remap, depth
        );
        match *canvas {
            None => {
                *canvas = Some(Canvas::new(size.0, size.1, depth, self.transparent)?);
            }
            Some(ref mut canvas) => {
                canvas.grow_depth(depth)?;
                if old_transparent != self.transparent {
                    canvas.replace(old_transparent, self.transparent)?;
                }
            }
        }
        Ok(())
    }

    /// Picks the sentinel: the last entry that duplicates an earlier one, else
    /// a new slot past the end, else (256 distinct colors) the last entry.
    fn reserve_transparent(&mut self) {
        let len = self.table.len();
        for i in (1..len).rev() {
            if let Some(j) = (0..i).rev().find(|&j| self.table[j] == self.table[i]) {
                self.transparent = i as u8;
                self.remap = j as u8;
                return
            }
        }
        if len < 256 {
            self.table.push(Rgb::default());
        }
        let last = self.table.len() - 1;
        self.transparent = last as u8;
        self.remap = last as u8;
    }

    /// Smallest allowed depth able to index `entries` colors.
    pub fn target_depth(&self, entries: usize) -> Result<u8, DecodingError> {
        let bits = if entries <= 1 {
            0
        } else {
            usize::BITS - (entries - 1).leading_zeros()
        };
        DEPTHS.iter()
            .cloned()
            .find(|&depth| depth as u32 >= bits && self.depths.allows(depth))
            .ok_or(DecodingError::Format("color table too large for any allowed bit depth"))
    }

    /// The value to store for a decoded, visible pixel.
    pub fn resolve(&self, pixel: u8) -> Result<u8, DecodingError> {
        if pixel != self.transparent {
            if pixel as usize >= self.table.len() {
                return Err(DecodingError::Format("pixel index outside of the color table"))
            }
            Ok(pixel)
        } else if self.remap != self.transparent {
            Ok(self.remap)
        } else {
            Err(DecodingError::Unsupported(
                "no palette slot left for transparency: at most 255 colors can be combined with transparency"
            ))
        }
    }
}
