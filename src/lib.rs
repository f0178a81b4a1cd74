//! # HD44780 character LCD over a shift register
//!
//! Drives a 16x2 HD44780-compatible character display whose parallel pins hang off a serial
//! shift register (clock, data and latch lines), and keeps a persistent two-line background on
//! it that transient overlay messages can temporarily replace.
//!
//! The crate is layered:
//!  - [`bus`]: packs one [`BusWord`] (RS, Enable, 4 data bits) into a byte and shifts it out.
//!  - [`display`]: the [`Hd44780`] protocol driver (4-bit init handshake, commands, glyphs).
//!  - [`overlay`]: the [`OverlayDisplay`] scheduler, owning the background rows, the overlay
//!    timeout and the per-row scroll animation.
//!
//! Typically you want to look into the following:
//!  - [`Hd44780::new()`] to initialize the controller
//!  - [`OverlayDisplay::new()`] to put the scheduler on top of it
//!  - [`OverlayDisplay::tick()`] to call from your main loop
#![no_std]
#![deny(unsafe_code)]

extern crate embedded_hal as hal;

#[macro_use]
mod fmt;

pub mod bus;
pub mod clock;
pub mod display;
pub mod instructions;
pub mod overlay;
pub mod row;
pub mod textmode;

pub use bus::{BusWord, LcdBus, ShiftRegisterBus, SpiBusError, SpiShiftBus};
pub use clock::{Clock, Millis};
pub use display::{DriverConfig, Hd44780};
pub use overlay::{OverlayDisplay, OverlayState, SchedulerConfig};
pub use row::{Direction, RowBuffer, ScrollMode};

/// visible columns per row
pub const COLUMNS: u8 = 16;

/// visible rows
pub const ROWS: u8 = 2;

/// maximum number of glyphs a background row can hold
pub const CONTENT_CAPACITY: usize = 64;
