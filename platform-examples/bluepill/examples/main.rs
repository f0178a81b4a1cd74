#![deny(unsafe_code)]
#![deny(warnings)]
#![no_std]
#![no_main]
extern crate cortex_m;
extern crate embedded_hal;
extern crate stm32f1xx_hal as hal;

use defmt_rtt as _;
use panic_halt as _;

use core::cell::Cell;
use core::fmt::Write;
use cortex_m_rt::entry;
use hal::{pac, prelude::*};

use shiftlcd::{Hd44780, OverlayDisplay, SchedulerConfig, ScrollMode, ShiftRegisterBus};

// one pass of the main loop, at 8MHz
const LOOP_MS: u64 = 5;
const LOOP_CYCLES: u32 = 8_000 * LOOP_MS as u32;

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();
    let mut flash = dp.FLASH.constrain();
    let rcc = dp.RCC.constrain();

    let clocks = rcc.cfgr.freeze(&mut flash.acr);
    let delay = cp.SYST.delay(&clocks);

    let mut gpioa = dp.GPIOA.split();
    let mut gpiob = dp.GPIOB.split();

    // 74HC595: SRCLK, SER, RCLK
    let lcd_clk   = gpiob.pb13.into_push_pull_output(&mut gpiob.crh);
    let lcd_dat   = gpiob.pb15.into_push_pull_output(&mut gpiob.crh);
    let lcd_latch = gpiob.pb12.into_push_pull_output(&mut gpiob.crh);
    let key       = gpioa.pa0.into_pull_up_input(&mut gpioa.crl);

    let now = Cell::new(0u64);
    let clock = || now.get();

    let bus = ShiftRegisterBus::new(lcd_clk, lcd_dat, lcd_latch).unwrap();
    let lcd = Hd44780::new(bus, delay).unwrap();
    let mut screen = OverlayDisplay::new(lcd, clock, SchedulerConfig::default());

    screen.set_background_rows("Media keys", "Press the key on PA0 to see it echoed").unwrap();
    screen.set_animation_mode(0, ScrollMode::Static);

    let mut presses = 0u32;
    let mut was_down = false;
    loop {
        let down = key.is_low();
        if down && !was_down {
            presses += 1;
            defmt::info!("key down #{=u32}", presses);
            screen.clear().unwrap();
            write!(screen, "Key down: {}", presses).unwrap();
        }
        was_down = down;

        screen.tick(now.get()).unwrap();
        cortex_m::asm::delay(LOOP_CYCLES);
        now.set(now.get() + LOOP_MS);
    }
}
