//! # Serial bus adapter
//!
//! The HD44780 wants a parallel word (RS, Enable, D4..D7). On this board that word sits on the
//! outputs of a serial-in/parallel-out shift register, so every change of a single control line
//! means shifting a whole byte out and toggling the latch.
//!
//! Bit layout of the shifted byte, as wired on the bridge:
//!
//! | bit | 7  | 6 | 5 | 4  | 3  | 2  | 1  | 0 |
//! |-----|----|---|---|----|----|----|----|---|
//! |     | RS | - | E | d0 | d1 | d2 | d3 | - |
//!
//! where `d0..d3` are the bits of the nibble being written. The byte goes out least
//! significant bit first.
//!
//! Two transports are provided: [`ShiftRegisterBus`] bit-bangs the clock and data pins, and
//! [`SpiShiftBus`] uses a hardware SPI peripheral. Anything else (an I/O expander, a test
//! recorder) only has to implement [`LcdBus`].
use core::marker::PhantomData;

use hal::blocking::delay::DelayUs;
use hal::blocking::spi::Write as SpiWrite;
use hal::digital::v2::OutputPin;

const RS_BIT: u8 = 7;
const ENABLE_BIT: u8 = 5;
const DATA_MSB: u8 = 4;

/// One parallel word on the LCD side of the shift register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusWord {
    /// register select: false for the instruction register, true for data (DDRAM/CGRAM)
    pub register_select: bool,
    /// the E line. The controller samples the data lines on its falling edge
    pub enable: bool,
    /// data lines, only the low 4 bits are used
    pub data: u8,
}

impl BusWord {
    pub fn new(register_select: bool, enable: bool, data: u8) -> Self {
        BusWord {
            register_select,
            enable,
            data: data & 0x0F,
        }
    }

    /// Pack the word into the byte that is shifted into the register.
    pub fn byte(self) -> u8 {
        let mut value = ((self.register_select as u8) << RS_BIT) | ((self.enable as u8) << ENABLE_BIT);
        for i in 0..4 {
            value |= ((self.data >> i) & 0x01) << (DATA_MSB - i);
        }
        value
    }

    /// Inverse of [`BusWord::byte`]. Bits 6 and 0 are ignored.
    pub fn from_byte(value: u8) -> Self {
        let mut data = 0;
        for i in 0..4 {
            data |= ((value >> (DATA_MSB - i)) & 0x01) << i;
        }
        BusWord {
            register_select: value & (1 << RS_BIT) != 0,
            enable: value & (1 << ENABLE_BIT) != 0,
            data,
        }
    }
}

/// Transport for [`BusWord`]s. This is the only seam that touches signal lines.
pub trait LcdBus {
    type Error;

    /// Put `word` on the parallel outputs. Returns once the outputs are latched.
    fn transmit(&mut self, word: BusWord) -> Result<(), Self::Error>;
}

impl<T: LcdBus + ?Sized> LcdBus for &mut T {
    type Error = T::Error;

    fn transmit(&mut self, word: BusWord) -> Result<(), Self::Error> {
        (**self).transmit(word)
    }
}

/// Used to run without clock delay on a slow enough MCU (below 8Mhz)
pub struct NoDelay {}

impl DelayUs<u8> for NoDelay {
    #[inline]
    fn delay_us(&mut self, _us: u8) {}
}

/// "Bit bang" shift register transport.
///
/// Use when the register's clock and data inputs are on plain GPIOs.
pub struct ShiftRegisterBus<ERR, CLK, DAT, LATCH, DELAY> {
    clk: CLK,
    dat: DAT,
    latch: LATCH,
    delay: DELAY,
    _phantom: PhantomData<ERR>,
}

impl<ERR, CLK, DAT, LATCH> ShiftRegisterBus<ERR, CLK, DAT, LATCH, NoDelay>
where
    CLK: OutputPin<Error = ERR>,
    DAT: OutputPin<Error = ERR>,
    LATCH: OutputPin<Error = ERR>,
{
    /// Constructs the transport from the "clock", "data" and "latch" pins.
    /// If your clock frequency is higher than 8Mhz please consider `new_with_delay`,
    /// the register may miss edges otherwise.
    pub fn new(clk: CLK, dat: DAT, latch: LATCH) -> Result<Self, ERR> {
        Self::new_with_delay(clk, dat, latch, NoDelay {})
    }
}

impl<ERR, CLK, DAT, LATCH, DELAY> ShiftRegisterBus<ERR, CLK, DAT, LATCH, DELAY>
where
    CLK: OutputPin<Error = ERR>,
    DAT: OutputPin<Error = ERR>,
    LATCH: OutputPin<Error = ERR>,
    DELAY: DelayUs<u8>,
{
    /// Constructs the transport with a 1us delay around every clock edge.
    pub fn new_with_delay(mut clk: CLK, dat: DAT, mut latch: LATCH, delay: DELAY) -> Result<Self, ERR> {
        clk.set_low()?;
        latch.set_high()?;
        Ok(ShiftRegisterBus {
            clk,
            dat,
            latch,
            delay,
            _phantom: PhantomData,
        })
    }

    /// Give the pins back.
    pub fn release(self) -> (CLK, DAT, LATCH) {
        (self.clk, self.dat, self.latch)
    }

    #[inline]
    fn write_bit(&mut self, high: bool) -> Result<(), ERR> {
        if high {
            self.dat.set_high()?;
        } else {
            self.dat.set_low()?;
        }
        self.clk.set_high()?;
        self.delay.delay_us(1);
        self.clk.set_low()?;
        self.delay.delay_us(1);
        Ok(())
    }
}

impl<ERR, CLK, DAT, LATCH, DELAY> LcdBus for ShiftRegisterBus<ERR, CLK, DAT, LATCH, DELAY>
where
    CLK: OutputPin<Error = ERR>,
    DAT: OutputPin<Error = ERR>,
    LATCH: OutputPin<Error = ERR>,
    DELAY: DelayUs<u8>,
{
    type Error = ERR;

    fn transmit(&mut self, word: BusWord) -> Result<(), ERR> {
        let mut value = word.byte();
        self.latch.set_low()?;
        for _ in 0..8 {
            self.write_bit((value & 0x01) == 0x01)?;
            value >>= 1;
        }
        self.latch.set_high()
    }
}

#[derive(Debug)]
pub enum SpiBusError<PinErr, SpiErr> {
    Pin(PinErr),
    Spi(SpiErr),
}

/// Shift register transport on a hardware SPI peripheral (MOSI to data, SCK to clock).
///
/// SPI peripherals shift MSB first, so each byte is mirrored before it is written.
pub struct SpiShiftBus<SPI, LATCH> {
    spi: SPI,
    latch: LATCH,
}

impl<SPI, LATCH, PinErr, SpiErr> SpiShiftBus<SPI, LATCH>
where
    SPI: SpiWrite<u8, Error = SpiErr>,
    LATCH: OutputPin<Error = PinErr>,
{
    pub fn new(spi: SPI, mut latch: LATCH) -> Result<Self, PinErr> {
        latch.set_high()?;
        Ok(SpiShiftBus { spi, latch })
    }

    pub fn release(self) -> (SPI, LATCH) {
        (self.spi, self.latch)
    }
}

impl<SPI, LATCH, PinErr, SpiErr> LcdBus for SpiShiftBus<SPI, LATCH>
where
    SPI: SpiWrite<u8, Error = SpiErr>,
    LATCH: OutputPin<Error = PinErr>,
{
    type Error = SpiBusError<PinErr, SpiErr>;

    fn transmit(&mut self, word: BusWord) -> Result<(), Self::Error> {
        self.latch.set_low().map_err(SpiBusError::Pin)?;
        self.spi
            .write(&[word.byte().reverse_bits()])
            .map_err(SpiBusError::Spi)?;
        self.latch.set_high().map_err(SpiBusError::Pin)
    }
}
