//! # Protocol driver for the HD44780
//!
//! This module keeps the shadow state of the controller (the three flag groups and the DDRAM
//! row offsets) and turns every operation into 4-bit nibble writes on an [`LcdBus`].
//!
//! The controller is write only from our side, so nothing is ever read back: the busy flag is
//! replaced by fixed waits on the injected delay. All waits are data sheet minimums rounded up.
//!
//! Typically you want to look into the following functions:
//!  - Hd44780.new() to initialize the display and create a driver instance
//!  - Hd44780.set_cursor() and the `core::fmt::Write` impl to put text on it
//!  - Hd44780.define_glyph() to load one of the 8 custom characters
//!
//! The rest is for tweaking the display control and entry mode flags.
use hal::blocking::delay::DelayUs;

use crate::{
    bus::{BusWord, LcdBus},
    instructions::{is_slow_byte, prelude::*},
    textmode::clamp_row,
    COLUMNS,
};

/// wait after power rises above 2.7V before the first command, 40ms in the data sheet
const POWER_ON_DELAY_US: u16 = 50_000;
/// wait after the first and second function set of the init handshake, min 4.1ms
const INIT_LONG_DELAY_US: u16 = 4_500;
/// wait after the third function set of the init handshake, min 100us
const INIT_SHORT_DELAY_US: u16 = 150;
/// enable pulse width and setup, min 450ns
const ENABLE_PULSE_US: u16 = 1;
/// instruction execution time, min 37us
const SETTLE_US: u16 = 100;
/// clear display and return home execution time, min 1.52ms
const SLOW_SETTLE_US: u16 = 2_000;

/// nibble of a function set with DL=1, used blind while the bus width is unknown
const HANDSHAKE_8BIT: u8 = 0x03;
/// nibble of a function set with DL=0
const HANDSHAKE_4BIT: u8 = 0x02;

/// Geometry the controller is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverConfig {
    pub lines: Lines,
    pub font: Font,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            lines: Lines::Two,
            font: Font::Dots5x8,
        }
    }
}

/// main struct for state keeping of the HD44780 driver
#[derive(Debug)]
pub struct Hd44780<B, D> {
    bus: B,
    delay: D,
    function: FunctionFlags,
    control: DisplayControl,
    entry_mode: EntryMode,
    row_offsets: [u8; 4],
    /// row of the last set_cursor(), the controller can't tell us
    pub(crate) row: u8,
}

impl<B, D> Hd44780<B, D>
where
    B: LcdBus,
    D: DelayUs<u16>,
{
    /// Create a 16x2 driver instance and initialize the controller.
    ///
    /// Arguments:
    ///
    /// - bus: the transport to the shift register, see the [`crate::bus`] module
    /// - delay: a blocking microsecond delay
    pub fn new(bus: B, delay: D) -> Result<Self, B::Error> {
        Self::with_config(bus, delay, DriverConfig::default())
    }

    /// Create a driver instance for the given line count and font and initialize the controller.
    pub fn with_config(bus: B, delay: D, config: DriverConfig) -> Result<Self, B::Error> {
        let mut lcd = Hd44780 {
            bus,
            delay,
            function: FunctionFlags::four_bit(config.lines, config.font),
            control: DisplayControl::default(),
            entry_mode: EntryMode::default(),
            row_offsets: [0x00, 0x40, COLUMNS, 0x40 + COLUMNS],
            row: 0,
        };

        // resetting the MCU does not reset the display, so the controller can be in any state
        // (even halfway through a 4-bit byte). The handshake has to run every time.
        lcd.initialize()?;

        Ok(lcd)
    }

    /// Runs the "initializing by instruction" sequence from figure 24 of the data sheet.
    ///
    /// The first three nibbles are read as 8-bit function sets whatever state the controller is
    /// in, which resynchronizes it. After that the real function set, display control, clear and
    /// entry mode are written. The new() function calls this, it only needs to be called again to
    /// recover a display that glitched (ESD, brown-out).
    pub fn initialize(&mut self) -> Result<(), B::Error> {
        debug!("hd44780: init handshake");
        self.delay.delay_us(POWER_ON_DELAY_US);

        self.write_nibble(false, HANDSHAKE_8BIT)?;
        self.delay.delay_us(INIT_LONG_DELAY_US);
        self.write_nibble(false, HANDSHAKE_8BIT)?;
        self.delay.delay_us(INIT_LONG_DELAY_US);
        self.write_nibble(false, HANDSHAKE_8BIT)?;
        self.delay.delay_us(INIT_SHORT_DELAY_US);
        self.write_nibble(false, HANDSHAKE_4BIT)?;

        // number of lines and font can only be set here
        self.write_instruction(FunctionSet(self.function))?;

        self.control = DisplayControl::default();
        self.write_instruction(DisplayOnOff(self.control))?;

        self.clear()?;

        self.entry_mode = EntryMode::default();
        self.write_instruction(EntryModeSet(self.entry_mode))?;

        debug!("hd44780: ready, function set {=u8:#x}", FunctionSet(self.function).byte());
        Ok(())
    }

    /// Give the bus and delay back.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn lines(&self) -> u8 {
        match self.function.lines {
            Lines::One => 1,
            Lines::Two => 2,
        }
    }

    pub fn function_flags(&self) -> FunctionFlags {
        self.function
    }

    pub fn display_control(&self) -> DisplayControl {
        self.control
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    pub fn row_offsets(&self) -> [u8; 4] {
        self.row_offsets
    }

    /// Override the DDRAM start address of each row, for odd panels (16x1 wired as 8x2 etc).
    pub fn set_row_offsets(&mut self, offsets: [u8; 4]) {
        self.row_offsets = offsets;
    }

    /// Clears DDRAM and moves the cursor to (0, 0). Blocks for the 2ms execution time.
    pub fn clear(&mut self) -> Result<(), B::Error> {
        self.row = 0;
        self.write_instruction(ClearDisplay)
    }

    /// Moves the cursor to (0, 0) and undoes display shifts. Blocks for the 2ms execution time.
    pub fn home(&mut self) -> Result<(), B::Error> {
        self.row = 0;
        self.write_instruction(ReturnHome)
    }

    /// Move the cursor to `col` on `row`.
    ///
    /// `row` is clamped to the number of lines, so anything past the bottom lands on the last
    /// line. `col` is not checked, the resulting address is masked to the 7-bit DDRAM range.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), B::Error> {
        let rows = (self.row_offsets.len() as u8).min(self.lines());
        let row = clamp_row(row, rows);
        self.row = row;
        let address = col.wrapping_add(self.row_offsets[row as usize]);
        self.write_instruction(SetDdramAddress(address))
    }

    /// Blank the display without losing DDRAM contents (false), or show it again (true).
    pub fn set_display(&mut self, on: bool) -> Result<(), B::Error> {
        self.control.display = on;
        self.write_instruction(DisplayOnOff(self.control))
    }

    /// Show or hide the underline cursor.
    pub fn set_cursor_visible(&mut self, on: bool) -> Result<(), B::Error> {
        self.control.cursor = on;
        self.write_instruction(DisplayOnOff(self.control))
    }

    /// Turn the blinking block cursor on or off.
    pub fn set_blink(&mut self, on: bool) -> Result<(), B::Error> {
        self.control.blink = on;
        self.write_instruction(DisplayOnOff(self.control))
    }

    pub fn set_text_direction(&mut self, direction: TextDirection) -> Result<(), B::Error> {
        self.entry_mode.direction = direction;
        self.write_instruction(EntryModeSet(self.entry_mode))
    }

    /// With autoscroll on, the display shifts on every write instead of the cursor moving.
    pub fn set_autoscroll(&mut self, on: bool) -> Result<(), B::Error> {
        self.entry_mode.autoscroll = on;
        self.write_instruction(EntryModeSet(self.entry_mode))
    }

    /// Shift the whole display one cell, without touching DDRAM.
    pub fn scroll_display(&mut self, direction: ShiftDirection) -> Result<(), B::Error> {
        self.write_instruction(ShiftDisplay(direction))
    }

    /// Write one character code at the current address.
    pub fn write_glyph(&mut self, value: u8) -> Result<(), B::Error> {
        self.send(true, value)
    }

    /// Load a custom 5x8 character into CGRAM slot 0..8 (the slot is masked).
    ///
    /// Each bitmap byte is one pixel row, the low five bits are the pixels. The glyph is then
    /// printed with `write_glyph(slot)`.
    /// The address counter is left in CGRAM, so call set_cursor() before writing text again.
    pub fn define_glyph(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), B::Error> {
        let slot = slot & 0x07;
        self.write_instruction(SetCgramAddress(slot << 3))?;
        for row in bitmap.iter() {
            self.write_glyph(*row)?;
        }
        Ok(())
    }

    /// Send a raw instruction byte. Waits the long settle time for clear and home.
    pub fn command(&mut self, value: u8) -> Result<(), B::Error> {
        self.send(false, value)?;
        if is_slow_byte(value) {
            self.delay.delay_us(SLOW_SETTLE_US);
        }
        Ok(())
    }

    /// Send an instruction from the Instruction enum.
    pub fn write_instruction(&mut self, instruction: Instruction) -> Result<(), B::Error> {
        trace!("hd44780: instruction {=u8:#x}", instruction.byte());
        self.send(false, instruction.byte())?;
        if instruction.is_slow() {
            self.delay.delay_us(SLOW_SETTLE_US);
        }
        Ok(())
    }

    // A byte in 4-bit mode is two nibble writes, high nibble first.
    fn send(&mut self, data: bool, value: u8) -> Result<(), B::Error> {
        self.write_nibble(data, value >> 4)?;
        self.write_nibble(data, value & 0x0F)
    }

    // One strobe of the E line. The controller latches D4..D7 on the falling edge.
    fn write_nibble(&mut self, data: bool, nibble: u8) -> Result<(), B::Error> {
        self.bus.transmit(BusWord::new(data, false, nibble))?;
        self.delay.delay_us(ENABLE_PULSE_US);

        self.bus.transmit(BusWord::new(data, true, nibble))?;
        self.delay.delay_us(ENABLE_PULSE_US);

        self.bus.transmit(BusWord::new(data, false, nibble))?;
        self.delay.delay_us(SETTLE_US);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use heapless::Vec;

    #[derive(Default)]
    struct Recorder {
        words: Vec<BusWord, 1024>,
    }

    impl LcdBus for Recorder {
        type Error = Infallible;

        fn transmit(&mut self, word: BusWord) -> Result<(), Infallible> {
            self.words.push(word).unwrap();
            Ok(())
        }
    }

    impl Recorder {
        // (data, byte) pairs, built from the nibbles latched on each falling edge of E
        fn bytes(&self) -> Vec<(bool, u8), 256> {
            let mut nibbles: Vec<(bool, u8), 512> = Vec::new();
            let mut enable = false;
            for word in self.words.iter() {
                if enable && !word.enable {
                    nibbles.push((word.register_select, word.data)).unwrap();
                }
                enable = word.enable;
            }
            nibbles
                .chunks(2)
                .map(|pair| (pair[0].0, (pair[0].1 << 4) | pair[1].1))
                .collect()
        }
    }

    struct NoWait;

    impl DelayUs<u16> for NoWait {
        fn delay_us(&mut self, _us: u16) {}
    }

    fn lcd() -> Hd44780<Recorder, NoWait> {
        let mut lcd = Hd44780::new(Recorder::default(), NoWait).unwrap();
        lcd.bus.words.clear();
        lcd
    }

    #[test]
    fn test_every_nibble_is_one_strobe() {
        let mut lcd = lcd();
        lcd.write_glyph(b'A').unwrap();
        let words = &lcd.bus().words;
        assert_eq!(words.len(), 6);
        assert_eq!(words.iter().filter(|w| w.enable).count(), 2);
        assert!(words.iter().all(|w| w.register_select));
        assert_eq!(words[1].data, 0x4);
        assert_eq!(words[4].data, 0x1);
    }

    #[test]
    fn test_set_cursor_clamps_row() {
        let mut lcd = lcd();
        lcd.set_cursor(3, 0).unwrap();
        lcd.set_cursor(3, 1).unwrap();
        lcd.set_cursor(3, 7).unwrap();
        assert_eq!(
            lcd.bus().bytes().as_slice(),
            &[(false, 0x83), (false, 0xC3), (false, 0xC3)]
        );
        assert_eq!(lcd.row, 1);
    }

    #[test]
    fn test_one_line_clamps_to_first_row() {
        let config = DriverConfig {
            lines: Lines::One,
            font: Font::Dots5x10,
        };
        let mut lcd = Hd44780::with_config(Recorder::default(), NoWait, config).unwrap();
        // the four handshake nibbles pair up into two bytes ahead of the function set
        assert_eq!(lcd.bus().bytes()[2], (false, 0x24));
        lcd.bus.words.clear();
        lcd.set_cursor(2, 1).unwrap();
        assert_eq!(lcd.bus().bytes().as_slice(), &[(false, 0x82)]);
    }

    #[test]
    fn test_flag_setters_rewrite_whole_group() {
        let mut lcd = lcd();
        lcd.set_cursor_visible(true).unwrap();
        lcd.set_blink(true).unwrap();
        lcd.set_display(false).unwrap();
        lcd.set_text_direction(TextDirection::RightToLeft).unwrap();
        lcd.set_autoscroll(true).unwrap();
        lcd.scroll_display(ShiftDirection::Right).unwrap();
        assert_eq!(
            lcd.bus().bytes().as_slice(),
            &[
                (false, 0x0E),
                (false, 0x0F),
                (false, 0x0B),
                (false, 0x04),
                (false, 0x05),
                (false, 0x1C)
            ]
        );
        assert!(!lcd.display_control().display);
        assert!(lcd.entry_mode().autoscroll);
    }

    #[test]
    fn test_define_glyph() {
        let mut lcd = lcd();
        let bitmap = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];
        lcd.define_glyph(9, &bitmap).unwrap();
        let bytes = lcd.bus().bytes();
        // slot 9 wraps to slot 1
        assert_eq!(bytes[0], (false, 0x48));
        assert_eq!(bytes.len(), 9);
        for (sent, row) in bytes[1..].iter().zip(bitmap.iter()) {
            assert_eq!(*sent, (true, *row));
        }
    }
}
