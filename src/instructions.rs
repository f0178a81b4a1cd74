//! # Module defining the instruction set of the HD44780
//!
//! All instructions are implemented as enums and most arguments as well.
//! The source code is written to resemble table 6 of the Hitachi data sheet as close as
//! possible, so the bit patterns are spelled out in binary.
//!
//! ## Flag groups
//! The controller keeps three small groups of mode bits, each written with its own instruction:
//!  - Function set: bus width, number of lines, font. Only valid right after the init
//!    handshake, the controller ignores later changes.
//!  - Display control: display on, cursor on, cursor blink.
//!  - Entry mode: in which direction the address counter moves after a write, and whether the
//!    whole display shifts along with it.
//!
//! None of these can be read back over a write-only shift register, so the driver keeps a shadow
//! copy and always writes the complete group.
//!
//! ## Execution times
//! Clear display and return home take up to 1.52ms at the nominal 270kHz oscillator, every
//! other instruction 37us. The driver waits 2ms and 100us respectively.

/// Number of lines the controller multiplexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lines {
    One,
    Two,
}

/// Character cell height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Font {
    /// 5x8 dots, works with both line counts
    Dots5x8,
    /// 5x10 dots, only available in one-line mode
    Dots5x10,
}

/// Function set flags, fixed once the controller is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FunctionFlags {
    /// 8-bit bus when true. The shift register only carries four data lines, so this stays false
    pub eight_bit: bool,
    pub lines: Lines,
    pub font: Font,
}

impl FunctionFlags {
    /// Four bit flags for the given geometry. A 5x10 font with two lines is not supported by the
    /// controller and falls back to 5x8.
    pub fn four_bit(lines: Lines, font: Font) -> Self {
        let font = match lines {
            Lines::One => font,
            Lines::Two => Font::Dots5x8,
        };
        FunctionFlags {
            eight_bit: false,
            lines,
            font,
        }
    }

    pub fn bits(self) -> u8 {
        ((self.eight_bit as u8) << 4)
            | (((self.lines == Lines::Two) as u8) << 3)
            | (((self.font == Font::Dots5x10) as u8) << 2)
    }
}

/// Display on/off control flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayControl {
    pub display: bool,
    pub cursor: bool,
    pub blink: bool,
}

impl Default for DisplayControl {
    fn default() -> Self {
        DisplayControl {
            display: true,
            cursor: false,
            blink: false,
        }
    }
}

impl DisplayControl {
    pub fn bits(self) -> u8 {
        ((self.display as u8) << 2) | ((self.cursor as u8) << 1) | self.blink as u8
    }
}

/// Direction the address counter moves after each write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

/// Entry mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EntryMode {
    pub direction: TextDirection,
    /// shift the entire display on every write, which makes text appear right-justified to the
    /// cursor
    pub autoscroll: bool,
}

impl Default for EntryMode {
    fn default() -> Self {
        EntryMode {
            direction: TextDirection::LeftToRight,
            autoscroll: false,
        }
    }
}

impl EntryMode {
    pub fn bits(self) -> u8 {
        (((self.direction == TextDirection::LeftToRight) as u8) << 1) | self.autoscroll as u8
    }
}

/// Direction for [`Instruction::ShiftDisplay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShiftDirection {
    Left,
    Right,
}

/// HD44780 instruction set, see data sheet table 6.
///
/// The busy flag / address read is missing: the shift register bridge is write only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    /// clear DDRAM and return the cursor to address 0
    // translates to: 0x01
    ClearDisplay,

    /// cursor to address 0, undo display shifts. DDRAM is untouched
    // translates to: 0x02
    ReturnHome,

    // translates to: 0x04 OR I/D, S
    EntryModeSet(EntryMode),

    // translates to: 0x08 OR D, C, B
    DisplayOnOff(DisplayControl),

    /// move the cursor without writing
    // translates to: 0x10 OR R/L
    ShiftCursor(ShiftDirection),

    /// move the whole display without changing DDRAM
    // translates to: 0x18 OR R/L
    ShiftDisplay(ShiftDirection),

    // translates to: 0x20 OR DL, N, F
    FunctionSet(FunctionFlags),

    /// 6-bit CGRAM address, glyph slot times 8 plus the pixel row
    // translates to: 0x40 OR address
    SetCgramAddress(u8),

    /// 7-bit DDRAM address
    // translates to: 0x80 OR address
    SetDdramAddress(u8),
}

use Instruction::*;

impl Instruction {
    /// Returns the instruction as the byte that goes over the bus.
    ///
    /// Addresses wider than their field are masked, not rejected.
    pub fn byte(self) -> u8 {
        match self {
            ClearDisplay => 0b0000_0001,
            ReturnHome => 0b0000_0010,
            EntryModeSet(mode) => 0b0000_0100 | mode.bits(),
            DisplayOnOff(control) => 0b0000_1000 | control.bits(),
            ShiftCursor(direction) => 0b0001_0000 | shift_bits(direction),
            ShiftDisplay(direction) => 0b0001_1000 | shift_bits(direction),
            FunctionSet(flags) => 0b0010_0000 | flags.bits(),
            SetCgramAddress(address) => 0b0100_0000 | (address & 0b0011_1111),
            SetDdramAddress(address) => 0b1000_0000 | (address & 0b0111_1111),
        }
    }

    /// Returns true for the two slow instructions that need the long settle time.
    pub fn is_slow(&self) -> bool {
        is_slow_byte(self.byte())
    }
}

/// True when the raw instruction `value` is clear display (0x01) or return home (0x02, 0x03).
/// Every other instruction has its opcode bit at 0x04 or above.
pub fn is_slow_byte(value: u8) -> bool {
    value != 0 && value < 0b0000_0100
}

fn shift_bits(direction: ShiftDirection) -> u8 {
    match direction {
        ShiftDirection::Left => 0b0000_0000,
        ShiftDirection::Right => 0b0000_0100,
    }
}

/// A prelude for convenience, it pulls all enums into scope.
pub mod prelude {
    pub use super::{
        DisplayControl, EntryMode, Font, FunctionFlags, Instruction, Instruction::*, Lines,
        ShiftDirection, TextDirection,
    };
}
