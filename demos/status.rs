use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2;
use shiftlcd::{Hd44780, OverlayDisplay, SchedulerConfig, ScrollMode, ShiftRegisterBus};
use std::cell::Cell;
use std::convert::Infallible;
use std::fmt::Write;
use std::thread::sleep;
use std::time::{Duration, Instant};

pub struct DummyOutputPin;

impl v2::OutputPin for DummyOutputPin {
    type Error = Infallible;
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct ThreadDelay;

impl DelayUs<u16> for ThreadDelay {
    fn delay_us(&mut self, us: u16) {
        sleep(Duration::from_micros(us as u64));
    }
}

fn main() {
    let start = Instant::now();
    let now = Cell::new(0u64);
    let clock = || now.get();

    let bus = ShiftRegisterBus::new(DummyOutputPin, DummyOutputPin, DummyOutputPin)
        .expect("Infallible cannot fail");
    let lcd = Hd44780::new(bus, ThreadDelay).expect("Infallible cannot fail");
    let mut screen = OverlayDisplay::new(lcd, clock, SchedulerConfig::default());

    screen
        .set_background_rows("Media keys", "This is a very long status line")
        .expect("Infallible cannot fail");
    screen.set_animation_mode(0, ScrollMode::Static);

    let mut last_key = 0;
    loop {
        now.set(start.elapsed().as_millis() as u64);
        let seconds = now.get() / 1000;
        if seconds > last_key && seconds % 3 == 0 {
            last_key = seconds;
            screen.clear().expect("Infallible cannot fail");
            write!(screen, "Key down: {}", seconds % 10).unwrap();
        }
        screen.tick(now.get()).expect("Infallible cannot fail");
        if seconds >= 15 {
            break;
        }
        sleep(Duration::from_millis(10));
    }
}
