//! # Overlay and scroll scheduler
//!
//! Keeps a persistent two-line background on the display and lets short-lived messages
//! ("Key down: 7", "Vol: 42") take over the screen for a while. Once the overlay times out the
//! background comes back exactly as it was, including the scroll position of long rows.
//!
//! Everything is driven from the main loop:
//!
//! ```ignore
//! let mut screen = OverlayDisplay::new(lcd, clock, SchedulerConfig::default());
//! screen.set_background_rows("Media keys", "Press a key to see its code")?;
//! loop {
//!     // key scanning etc
//!     screen.tick(clock.now_ms())?;
//! }
//! ```
//!
//! There are two independent pieces of state. The overlay is either idle or active with an
//! expiry time; while it is active it owns the whole screen and the background rows are only
//! updated in memory. Each background row longer than 16 glyphs additionally steps its visible
//! window every `step_interval_ms` while the overlay is idle.
//!
//! Display writes block for the controller timing (about 1.3ms per 16-glyph row), so the
//! common path of [`OverlayDisplay::tick`] does no I/O at all.
use core::fmt::Error as FmtError;
use core::fmt::Result as FmtResult;
use core::fmt::Write;

use hal::blocking::delay::DelayUs;

use crate::{
    bus::LcdBus,
    clock::{Clock, Millis},
    display::Hd44780,
    row::{RowBuffer, ScrollMode},
    textmode::{char_to_glyph, clamp_row},
    COLUMNS, ROWS,
};

/// Timing defaults. They were tuned by eye on the real panel and are not protocol limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerConfig {
    /// time between two scroll steps of a long row
    pub step_interval_ms: Millis,
    /// overlay timeout used by `clear()` and the `core::fmt::Write` impl
    pub default_timeout_ms: Millis,
    /// scroll mode new rows start with
    pub mode: ScrollMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            step_interval_ms: 450,
            default_timeout_ms: 1000,
            mode: ScrollMode::Bounce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverlayState {
    /// the screen shows the background rows
    Idle,
    /// the screen shows transient content until `expiry`
    Active { expiry: Millis },
}

/// The scheduler. Owns the driver, so every display write goes through here.
pub struct OverlayDisplay<B, D, C> {
    lcd: Hd44780<B, D>,
    clock: C,
    config: SchedulerConfig,
    rows: [RowBuffer; ROWS as usize],
    overlay: OverlayState,
    cursor: (u8, u8),
    enabled: bool,
    /// CGRAM contents, reloaded when output is enabled again
    glyphs: [[u8; 8]; 8],
    /// bit n set when slot n was defined
    defined: u8,
}

impl<B, D, C> OverlayDisplay<B, D, C>
where
    B: LcdBus,
    D: DelayUs<u16>,
    C: Clock,
{
    /// Put the scheduler on top of an initialized driver. The background starts out empty,
    /// which matches the cleared screen the driver leaves behind.
    pub fn new(lcd: Hd44780<B, D>, clock: C, config: SchedulerConfig) -> Self {
        OverlayDisplay {
            lcd,
            clock,
            config,
            rows: [RowBuffer::new(config.mode), RowBuffer::new(config.mode)],
            overlay: OverlayState::Idle,
            cursor: (0, 0),
            enabled: true,
            glyphs: [[0; 8]; 8],
            defined: 0,
        }
    }

    pub fn release(self) -> (Hd44780<B, D>, C) {
        (self.lcd, self.clock)
    }

    pub fn driver(&self) -> &Hd44780<B, D> {
        &self.lcd
    }

    /// Direct access to the driver for flag tweaks (blink, cursor).
    ///
    /// Text written here is not tracked, the next render overwrites it.
    pub fn driver_mut(&mut self) -> &mut Hd44780<B, D> {
        &mut self.lcd
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn overlay_state(&self) -> OverlayState {
        self.overlay
    }

    pub fn is_overlay_active(&self) -> bool {
        matches!(self.overlay, OverlayState::Active { .. })
    }

    /// Background row `index`, clamped to the last row.
    pub fn row(&self, index: u8) -> &RowBuffer {
        &self.rows[clamp_row(index, ROWS) as usize]
    }

    /// Position the next `print` starts at, as (column, row).
    pub fn cursor(&self) -> (u8, u8) {
        self.cursor
    }

    pub fn output_enabled(&self) -> bool {
        self.enabled
    }

    /// Gate all display writes.
    ///
    /// While disabled, overlays and prints are accepted and dropped, background changes, glyph
    /// definitions and scroll steps only update memory. Enabling again reloads the custom glyphs
    /// and redraws the background from scratch.
    pub fn set_output_enabled(&mut self, enabled: bool) -> Result<(), B::Error> {
        if enabled == self.enabled {
            return Ok(());
        }
        debug!("overlay: output enabled {=bool}", enabled);
        self.enabled = enabled;
        if enabled {
            for slot in 0..8u8 {
                if self.defined & (1 << slot) != 0 {
                    self.lcd.define_glyph(slot, &self.glyphs[slot as usize])?;
                }
            }
            let now = self.clock.now_ms();
            self.restore(now)?;
        }
        Ok(())
    }

    /// Replace the persistent text of `row`. Shown right away unless an overlay is up.
    pub fn set_background(&mut self, row: u8, text: &str) -> Result<(), B::Error> {
        let row = clamp_row(row, ROWS);
        let now = self.clock.now_ms();
        self.rows[row as usize].set_text(text, now, self.config.step_interval_ms);
        self.background_changed(row)
    }

    /// Same as [`OverlayDisplay::set_background`] for raw character codes.
    pub fn set_background_glyphs(&mut self, row: u8, glyphs: &[u8]) -> Result<(), B::Error> {
        let row = clamp_row(row, ROWS);
        let now = self.clock.now_ms();
        self.rows[row as usize].set_glyphs(glyphs, now, self.config.step_interval_ms);
        self.background_changed(row)
    }

    fn background_changed(&mut self, row: u8) -> Result<(), B::Error> {
        debug!(
            "overlay: background row {=u8}, {=usize} glyphs",
            row,
            self.rows[row as usize].content().len()
        );
        if !self.is_overlay_active() {
            self.render_row(row)?;
        }
        Ok(())
    }

    /// Replace both background rows.
    pub fn set_background_rows(&mut self, upper: &str, lower: &str) -> Result<(), B::Error> {
        self.set_background(0, upper)?;
        self.set_background(1, lower)
    }

    /// Change how `row` scrolls. The current window position is kept.
    pub fn set_animation_mode(&mut self, row: u8, mode: ScrollMode) {
        let row = clamp_row(row, ROWS);
        self.rows[row as usize].set_mode(mode);
    }

    /// Replace the whole screen with two lines of text for `duration` ms.
    ///
    /// Text is written as is, no scrolling: anything past column 16 is cut. Calling this while
    /// another overlay is up replaces it and restarts the timeout. The print cursor is left at
    /// the end of `lower`, so a following `print` adds to it.
    pub fn show_overlay(&mut self, upper: &str, lower: &str, duration: Millis) -> Result<(), B::Error> {
        if !self.enabled {
            return Ok(());
        }
        let now = self.clock.now_ms();
        self.lcd.clear()?;
        self.cursor = (0, 0);
        self.write_text(upper)?;
        self.cursor = (0, 1);
        self.write_text(lower)?;
        self.arm(now, duration);
        Ok(())
    }

    /// Move the print cursor. Takes effect on the next `print`.
    pub fn set_cursor(&mut self, col: u8, row: u8) {
        self.cursor = (col.min(COLUMNS - 1), clamp_row(row, ROWS));
    }

    /// Blank the screen for a new overlay and home the print cursor.
    ///
    /// The background returns after the default timeout unless a `print` extends it.
    pub fn clear(&mut self) -> Result<(), B::Error> {
        if !self.enabled {
            return Ok(());
        }
        let now = self.clock.now_ms();
        self.lcd.clear()?;
        self.cursor = (0, 0);
        self.arm(now, self.config.default_timeout_ms);
        Ok(())
    }

    /// Write `text` at the print cursor as an overlay that lasts `timeout` ms.
    ///
    /// If no overlay is up the screen is cleared first, otherwise the text is added to the one
    /// that is showing and its timeout restarts. Text past column 16 is cut.
    /// With `timeout == 0` there is no overlay: `text` becomes the background of the cursor's
    /// row instead.
    pub fn print(&mut self, text: &str, timeout: Millis) -> Result<(), B::Error> {
        if timeout == 0 {
            let row = self.cursor.1;
            return self.set_background(row, text);
        }
        if !self.enabled {
            return Ok(());
        }
        let now = self.clock.now_ms();
        self.begin_overlay()?;
        self.write_text(text)?;
        self.arm(now, timeout);
        Ok(())
    }

    /// Same as [`OverlayDisplay::print`] for one raw character code, e.g. a custom glyph slot.
    pub fn print_glyph(&mut self, glyph: u8, timeout: Millis) -> Result<(), B::Error> {
        if timeout == 0 {
            let row = self.cursor.1;
            return self.set_background_glyphs(row, &[glyph]);
        }
        if !self.enabled {
            return Ok(());
        }
        let now = self.clock.now_ms();
        self.begin_overlay()?;
        self.lcd.set_cursor(self.cursor.0, self.cursor.1)?;
        if self.cursor.0 < COLUMNS {
            self.lcd.write_glyph(glyph)?;
            self.cursor.0 += 1;
        }
        self.arm(now, timeout);
        Ok(())
    }

    /// Bring the background back now instead of waiting for the timeout.
    pub fn dismiss_overlay(&mut self) -> Result<(), B::Error> {
        if self.is_overlay_active() {
            let now = self.clock.now_ms();
            self.restore(now)?;
        }
        Ok(())
    }

    /// Load a custom glyph into CGRAM slot 0..8 (the slot is masked).
    ///
    /// The bitmap is kept, so a glyph defined while output is disabled shows up once it is
    /// enabled again.
    pub fn define_glyph(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), B::Error> {
        let slot = slot & 0x07;
        self.glyphs[slot as usize] = *bitmap;
        self.defined |= 1 << slot;
        if !self.enabled {
            return Ok(());
        }
        self.lcd.define_glyph(slot, bitmap)?;
        // the address counter now points into CGRAM, put it back where text goes
        self.lcd.set_cursor(self.cursor.0, self.cursor.1)
    }

    /// Advance the overlay timeout and the scroll animation. Call once per main loop pass.
    pub fn tick(&mut self, now: Millis) -> Result<(), B::Error> {
        if let OverlayState::Active { expiry } = self.overlay {
            if now >= expiry {
                debug!("overlay: expired at {=u64}", now);
                self.restore(now)?;
            }
            return Ok(());
        }

        for index in 0..ROWS {
            let row = &mut self.rows[index as usize];
            if row.is_due(now) {
                row.step();
                row.reschedule(now, self.config.step_interval_ms);
                trace!("overlay: row {=u8} at offset {=usize}", index, row.offset());
                self.render_row(index)?;
            }
        }
        Ok(())
    }

    fn arm(&mut self, now: Millis, duration: Millis) {
        let expiry = now.saturating_add(duration);
        trace!("overlay: armed until {=u64}", expiry);
        self.overlay = OverlayState::Active { expiry };
    }

    fn begin_overlay(&mut self) -> Result<(), B::Error> {
        if !self.is_overlay_active() {
            self.lcd.clear()?;
        }
        Ok(())
    }

    // Writes at the print cursor and moves it along. '\n' goes to the start of the next row.
    fn write_text(&mut self, text: &str) -> Result<(), B::Error> {
        let (mut col, mut row) = self.cursor;
        self.lcd.set_cursor(col, row)?;
        for c in text.chars() {
            match c {
                '\n' | '\r' => {
                    if c == '\n' {
                        row = clamp_row(row + 1, ROWS);
                    }
                    col = 0;
                    self.lcd.set_cursor(col, row)?;
                }
                _ if col >= COLUMNS => {}
                _ => {
                    self.lcd.write_glyph(char_to_glyph(c))?;
                    col += 1;
                }
            }
        }
        self.cursor = (col, row);
        Ok(())
    }

    // Clear the overlay off the screen and draw the background windows where they are.
    fn restore(&mut self, now: Millis) -> Result<(), B::Error> {
        self.overlay = OverlayState::Idle;
        self.cursor = (0, 0);
        for row in self.rows.iter_mut() {
            row.reschedule(now, self.config.step_interval_ms);
        }
        if !self.enabled {
            return Ok(());
        }
        self.lcd.clear()?;
        for index in 0..ROWS {
            self.render_row(index)?;
        }
        Ok(())
    }

    // Always exactly 16 glyphs, so nothing of a previous longer text survives.
    fn render_row(&mut self, index: u8) -> Result<(), B::Error> {
        if !self.enabled {
            return Ok(());
        }
        let window = self.rows[index as usize].window();
        self.lcd.set_cursor(0, index)?;
        for glyph in window.iter() {
            self.lcd.write_glyph(*glyph)?;
        }
        Ok(())
    }
}

impl<B, D, C> Write for OverlayDisplay<B, D, C>
where
    B: LcdBus,
    D: DelayUs<u16>,
    C: Clock,
{
    // `write!(screen, "Vol: {}", v)` prints as an overlay with the default timeout.
    fn write_str(&mut self, s: &str) -> FmtResult {
        let timeout = self.config.default_timeout_ms;
        self.print(s, timeout).map_err(|_| FmtError)
    }
}
