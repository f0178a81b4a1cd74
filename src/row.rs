//! Background row state and its scroll animation.
//!
//! A row holds up to [`CONTENT_CAPACITY`] glyphs but only [`COLUMNS`] of them are visible. Rows
//! longer than that slide a 16-wide window over the content, one column per step. Nothing here
//! talks to the display; the scheduler asks a row for its window and renders it.
use heapless::Vec;

use crate::{
    clock::Millis,
    textmode::{char_to_glyph, truncate},
    COLUMNS, CONTENT_CAPACITY,
};

const WIDTH: usize = COLUMNS as usize;

/// How a row longer than the display moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScrollMode {
    /// show the first 16 glyphs, never step
    Static,
    /// scroll to the end, then back to the start, and again
    Bounce,
    /// scroll to the end, then jump back to the start
    Loop,
}

/// Direction the window moves on the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Backward,
}

/// One persistent background row.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    content: Vec<u8, CONTENT_CAPACITY>,
    offset: usize,
    direction: Direction,
    mode: ScrollMode,
    next_step: Millis,
}

impl RowBuffer {
    pub fn new(mode: ScrollMode) -> Self {
        RowBuffer {
            content: Vec::new(),
            offset: 0,
            direction: Direction::Forward,
            mode,
            next_step: 0,
        }
    }

    /// Replace the content with `text` and restart the animation. The first step is due one
    /// `interval` after `now`.
    ///
    /// Characters are mapped to ROM codes, anything past [`CONTENT_CAPACITY`] is dropped.
    pub fn set_text(&mut self, text: &str, now: Millis, interval: Millis) {
        self.content.clear();
        for c in text.chars().take(CONTENT_CAPACITY) {
            // can't overflow, the take() bounds it
            let _ = self.content.push(char_to_glyph(c));
        }
        self.restart(now, interval);
    }

    /// Same as [`RowBuffer::set_text`] for raw glyph codes.
    pub fn set_glyphs(&mut self, glyphs: &[u8], now: Millis, interval: Millis) {
        self.content.clear();
        let _ = self
            .content
            .extend_from_slice(truncate(glyphs, CONTENT_CAPACITY));
        self.restart(now, interval);
    }

    fn restart(&mut self, now: Millis, interval: Millis) {
        self.offset = 0;
        self.direction = Direction::Forward;
        self.next_step = now.saturating_add(interval);
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    pub fn next_step(&self) -> Millis {
        self.next_step
    }

    /// Change how the row moves from the next step on. The window stays where it is.
    pub fn set_mode(&mut self, mode: ScrollMode) {
        self.mode = mode;
    }

    /// True when the content doesn't fit the display.
    pub fn is_scrollable(&self) -> bool {
        self.content.len() > WIDTH
    }

    /// Largest valid offset, 0 for rows that fit.
    pub fn max_offset(&self) -> usize {
        self.content.len().saturating_sub(WIDTH)
    }

    /// True when the row animates and its step deadline has passed.
    pub fn is_due(&self, now: Millis) -> bool {
        self.mode != ScrollMode::Static && self.is_scrollable() && now >= self.next_step
    }

    /// Push the next step to one `interval` after `now`.
    pub fn reschedule(&mut self, now: Millis, interval: Millis) {
        self.next_step = now.saturating_add(interval);
    }

    /// Move the window one column according to the mode.
    pub fn step(&mut self) {
        if !self.is_scrollable() {
            return;
        }
        let max = self.max_offset();
        match self.mode {
            ScrollMode::Static => {}
            ScrollMode::Bounce => {
                // a mode switch can leave us pointing past an end
                if self.direction == Direction::Forward && self.offset >= max {
                    self.direction = Direction::Backward;
                } else if self.direction == Direction::Backward && self.offset == 0 {
                    self.direction = Direction::Forward;
                }
                match self.direction {
                    Direction::Forward => self.offset = (self.offset + 1).min(max),
                    Direction::Backward => self.offset = self.offset.saturating_sub(1),
                }
                if self.offset == max {
                    self.direction = Direction::Backward;
                } else if self.offset == 0 {
                    self.direction = Direction::Forward;
                }
            }
            ScrollMode::Loop => {
                self.direction = Direction::Forward;
                self.offset = if self.offset >= max { 0 } else { self.offset + 1 };
            }
        }
    }

    /// The 16 visible glyphs, padded with spaces.
    pub fn window(&self) -> [u8; WIDTH] {
        let mut window = [b' '; WIDTH];
        let end = (self.offset + WIDTH).min(self.content.len());
        let visible = &self.content[self.offset.min(end)..end];
        window[..visible.len()].copy_from_slice(visible);
        window
    }
}

impl Default for RowBuffer {
    fn default() -> Self {
        RowBuffer::new(ScrollMode::Bounce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, mode: ScrollMode) -> RowBuffer {
        let mut row = RowBuffer::new(mode);
        row.set_text(text, 0, 450);
        row
    }

    #[test]
    fn test_short_row_is_padded_and_never_steps() {
        let mut row = row("Key down: 7", ScrollMode::Bounce);
        assert_eq!(&row.window(), b"Key down: 7     ");
        assert!(!row.is_scrollable());
        assert!(!row.is_due(10_000));
        row.step();
        assert_eq!(row.offset(), 0);
    }

    #[test]
    fn test_exactly_sixteen_fits() {
        let row = row("0123456789abcdef", ScrollMode::Loop);
        assert!(!row.is_scrollable());
        assert_eq!(&row.window(), b"0123456789abcdef");
    }

    #[test]
    fn test_bounce_reverses_at_both_ends() {
        let mut row = row("0123456789abcdefXYZ", ScrollMode::Bounce);
        assert_eq!(row.max_offset(), 3);

        let mut offsets = [0usize; 8];
        for slot in offsets.iter_mut() {
            row.step();
            *slot = row.offset();
        }
        assert_eq!(offsets, [1, 2, 3, 2, 1, 0, 1, 2]);
        assert_eq!(&row.window(), b"23456789abcdefXY");
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let mut row = row("0123456789abcdefXY", ScrollMode::Loop);
        let mut offsets = [0usize; 6];
        for slot in offsets.iter_mut() {
            row.step();
            *slot = row.offset();
        }
        assert_eq!(offsets, [1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_static_holds_still() {
        let mut row = row("0123456789abcdefXY", ScrollMode::Static);
        assert!(!row.is_due(10_000));
        row.step();
        assert_eq!(row.offset(), 0);
    }

    #[test]
    fn test_mode_change_keeps_offset() {
        let mut row = row("0123456789abcdefXYZ", ScrollMode::Loop);
        row.step();
        row.step();
        row.step();
        assert_eq!(row.offset(), 3);
        row.set_mode(ScrollMode::Bounce);
        assert_eq!(row.offset(), 3);
        // forward at the end turns around instead of sticking
        row.step();
        assert_eq!(row.offset(), 2);
        assert_eq!(row.direction(), Direction::Backward);
    }

    #[test]
    fn test_new_text_restarts() {
        let mut row = row("0123456789abcdefXYZ", ScrollMode::Bounce);
        row.step();
        row.set_text("0123456789abcdefXYZW", 1_000, 450);
        assert_eq!(row.offset(), 0);
        assert_eq!(row.direction(), Direction::Forward);
        assert_eq!(row.next_step(), 1_450);
        assert!(!row.is_due(1_449));
        assert!(row.is_due(1_450));
    }

    #[test]
    fn test_content_is_truncated() {
        let mut row = RowBuffer::default();
        let long = [b'x'; 100];
        row.set_glyphs(&long, 0, 450);
        assert_eq!(row.content().len(), CONTENT_CAPACITY);
        assert_eq!(row.max_offset(), CONTENT_CAPACITY - WIDTH);
    }
}
