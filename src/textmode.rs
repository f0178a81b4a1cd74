//! # Text helpers for the HD44780 driver
//!
//! The controller has a character generator ROM, so text is written as character codes instead
//! of pixel columns. This module maps Rust `char`s onto the codes of the common A00 (Japanese)
//! ROM, and implements `core::fmt::Write` on the driver so `write!()` "just works".
//!
//! It also holds the clamping and truncation rules used everywhere else: bad positions and
//! overlong text are never an error, they get clamped into range.
use core::fmt::Error as FmtError;
use core::fmt::Result as FmtResult;
use core::fmt::Write;

use hal::blocking::delay::DelayUs;

use crate::{bus::LcdBus, display::Hd44780};

/// Code of the glyph printed for characters the ROM doesn't have.
pub const UNKNOWN_GLYPH: u8 = b'?';

/// Solid 5x8 block, handy for bar graphs.
pub const FULL_BLOCK: u8 = 0xFF;

/// Clamp `row` into `0..rows`. `rows` must be at least 1.
pub fn clamp_row(row: u8, rows: u8) -> u8 {
    if row >= rows {
        warn!("row {=u8} clamped to {=u8}", row, rows - 1);
        rows - 1
    } else {
        row
    }
}

/// The first `max` glyphs of `glyphs`.
pub fn truncate(glyphs: &[u8], max: usize) -> &[u8] {
    if glyphs.len() > max {
        trace!("text truncated from {=usize} to {=usize}", glyphs.len(), max);
        &glyphs[..max]
    } else {
        glyphs
    }
}

/// Returns the ROM code for `c`.
///
/// Custom glyphs live at codes 0..8; use [`Hd44780::write_glyph`] for those, a `char` never
/// maps there.
pub fn char_to_glyph(c: char) -> u8 {
    match c {
        // A00 has a yen sign at 0x5C and right/left arrows at 0x7E/0x7F
        '\\' => b'/',
        '~' => b'-',
        ' '..='}' => c as u8,
        '¥' => 0x5C,
        '→' => 0x7E,
        '←' => 0x7F,
        '·' => 0xA5,
        '°' => 0xDF,
        '█' => FULL_BLOCK,
        _ => UNKNOWN_GLYPH,
    }
}

impl<B, D> Write for Hd44780<B, D>
where
    B: LcdBus,
    D: DelayUs<u16>,
{
    // Writes at the current address. '\n' moves to the start of the next row, '\r' to the start
    // of the current one; nothing wraps by itself since the controller's address counter runs
    // on into invisible DDRAM.
    fn write_str(&mut self, s: &str) -> FmtResult {
        for c in s.chars() {
            match c {
                '\r' => {
                    let row = self.row;
                    self.set_cursor(0, row).map_err(|_| FmtError)?;
                }
                '\n' => {
                    let row = self.row.saturating_add(1);
                    self.set_cursor(0, row).map_err(|_| FmtError)?;
                }
                _ => {
                    self.write_glyph(char_to_glyph(c)).map_err(|_| FmtError)?;
                }
            }
        }
        Ok(())
    }
}
