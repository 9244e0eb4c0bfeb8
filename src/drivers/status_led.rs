//! Single-colour connectivity indicator.
//!
//! Blinks while the WiFi link is down and stays steady once it is up.
//! The blinking itself is paced by the
//! [`LinkSupervisor`](crate::app::link::LinkSupervisor); this driver only
//! knows on, off and toggle.

use crate::app::ports::DigitalOutput;
use crate::drivers::relay::level_for;

pub struct StatusLed<O: DigitalOutput> {
    out: O,
    active_low: bool,
    on: bool,
    toggles: u32,
}

impl<O: DigitalOutput> StatusLed<O> {
    /// Take ownership of the output and start with the LED off.
    pub fn new(out: O, active_low: bool) -> Self {
        let mut led = Self {
            out,
            active_low,
            on: false,
            toggles: 0,
        };
        led.write(false);
        led
    }

    pub fn on(&mut self) {
        self.write(true);
    }

    pub fn off(&mut self) {
        self.write(false);
    }

    pub fn toggle(&mut self) {
        self.toggles = self.toggles.wrapping_add(1);
        self.write(!self.on);
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Number of toggles since construction (blink activity).
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    fn write(&mut self, on: bool) {
        self.out.set(level_for(on, self.active_low));
        self.on = on;
    }
}
