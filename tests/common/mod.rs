//! Test doubles: a bus and a delay that log into one shared event list, a manual clock, and a
//! model of the controller that replays the log into DDRAM.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayUs;
use shiftlcd::{BusWord, Clock, Hd44780, LcdBus, Millis, OverlayDisplay, SchedulerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Word(BusWord),
    Delay(u16),
}

pub type Log = Rc<RefCell<Vec<Event>>>;

#[derive(Clone)]
pub struct RecordingBus {
    pub log: Log,
}

impl LcdBus for RecordingBus {
    type Error = Infallible;

    fn transmit(&mut self, word: BusWord) -> Result<(), Infallible> {
        self.log.borrow_mut().push(Event::Word(word));
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingDelay {
    pub log: Log,
}

impl DelayUs<u16> for RecordingDelay {
    fn delay_us(&mut self, us: u16) {
        self.log.borrow_mut().push(Event::Delay(us));
    }
}

#[derive(Clone, Default)]
pub struct ManualClock {
    pub now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}

/// A byte as the controller saw it, with the waits that followed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub data: bool,
    pub value: u8,
    /// microseconds waited between this transfer's last strobe and the next transmission
    pub settle_us: u32,
}

/// Nibbles latched on falling edges of E, each with the time waited after it.
pub fn strobes(log: &[Event]) -> Vec<(bool, u8, u32)> {
    let mut strobes: Vec<(bool, u8, u32)> = Vec::new();
    let mut enable = false;
    for event in log {
        match event {
            Event::Word(word) => {
                if enable && !word.enable {
                    strobes.push((word.register_select, word.data, 0));
                }
                enable = word.enable;
            }
            Event::Delay(us) => {
                if let Some(last) = strobes.last_mut() {
                    last.2 += *us as u32;
                }
            }
        }
    }
    strobes
}

/// Model of the controller's 4-bit interface and DDRAM.
///
/// Starts in 8-bit mode like a freshly powered controller, so it has to see the init handshake
/// to make sense of anything.
pub struct Panel {
    four_bit: bool,
    pending: Option<(bool, u8)>,
    cgram: bool,
    address: usize,
    pub ddram: [u8; 128],
    pub transfers: Vec<Transfer>,
    pub handshake: Vec<u8>,
}

impl Panel {
    pub fn new() -> Self {
        Panel {
            four_bit: false,
            pending: None,
            cgram: false,
            address: 0,
            ddram: [b' '; 128],
            transfers: Vec::new(),
            handshake: Vec::new(),
        }
    }

    pub fn replay(log: &[Event]) -> Self {
        let mut panel = Panel::new();
        for (data, nibble, settle_us) in strobes(log) {
            panel.strobe(data, nibble, settle_us);
        }
        panel
    }

    fn strobe(&mut self, data: bool, nibble: u8, settle_us: u32) {
        if !self.four_bit {
            // 8-bit mode: D4..D7 carry the high nibble of a whole instruction
            self.handshake.push(nibble);
            if nibble == 0x2 {
                self.four_bit = true;
            }
            return;
        }
        match self.pending.take() {
            None => self.pending = Some((data, nibble)),
            Some((first_data, high)) => {
                assert_eq!(first_data, data, "RS changed in the middle of a byte");
                let value = (high << 4) | nibble;
                self.transfers.push(Transfer {
                    data,
                    value,
                    settle_us,
                });
                self.execute(data, value);
            }
        }
    }

    fn execute(&mut self, data: bool, value: u8) {
        if data {
            if !self.cgram {
                self.ddram[self.address & 0x7F] = value;
                self.address = (self.address + 1) & 0x7F;
            }
            return;
        }
        if value & 0x80 != 0 {
            self.cgram = false;
            self.address = (value & 0x7F) as usize;
        } else if value & 0x40 != 0 {
            self.cgram = true;
        } else if value == 0x01 {
            self.ddram = [b' '; 128];
            self.cgram = false;
            self.address = 0;
        } else if value & 0xFE == 0x02 {
            self.cgram = false;
            self.address = 0;
        }
    }

    /// The 16 visible glyphs of `row` as a string.
    pub fn line(&self, row: usize) -> String {
        let start = [0x00, 0x40][row];
        self.ddram[start..start + 16].iter().map(|b| *b as char).collect()
    }

    pub fn commands(&self) -> Vec<u8> {
        self.transfers.iter().filter(|t| !t.data).map(|t| t.value).collect()
    }
}

pub type TestDisplay = OverlayDisplay<RecordingBus, RecordingDelay, ManualClock>;

pub struct Rig {
    pub log: Log,
    pub clock: ManualClock,
    pub screen: TestDisplay,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let clock = ManualClock::default();
        let lcd = Hd44780::new(
            RecordingBus { log: log.clone() },
            RecordingDelay { log: log.clone() },
        )
        .unwrap();
        let screen = OverlayDisplay::new(lcd, clock.clone(), config);
        Rig { log, clock, screen }
    }

    /// Everything the controller has seen since power on.
    pub fn panel(&self) -> Panel {
        Panel::replay(&self.log.borrow())
    }

    pub fn lines(&self) -> (String, String) {
        let panel = self.panel();
        (panel.line(0), panel.line(1))
    }

    pub fn events(&self) -> usize {
        self.log.borrow().len()
    }

    /// Transfers after the first `mark` events, decoded in 4-bit mode.
    pub fn transfers_since(&self, mark: usize) -> Vec<Transfer> {
        let log = self.log.borrow();
        let mut panel = Panel::new();
        panel.four_bit = true;
        for (data, nibble, settle_us) in strobes(&log[mark..]) {
            panel.strobe(data, nibble, settle_us);
        }
        panel.transfers
    }

    pub fn tick(&mut self, now: Millis) {
        self.clock.set(now);
        self.screen.tick(now).unwrap();
    }
}

/// Pad to the 16-column line the panel shows.
pub fn padded(text: &str) -> String {
    format!("{:<16}", text)
}
