//! Door strike relay driver.
//!
//! One digital output drives the relay coil (usually through a transistor
//! or opto-coupler).  Many cheap relay boards pull in on a LOW input, so
//! polarity is configurable and the rest of the firmware only ever talks
//! about [`RelayLine::Energized`] / [`RelayLine::DeEnergized`].
//!
//! The driver does not enforce any timing; that is the
//! [`ActuatorGuard`](crate::app::actuator::ActuatorGuard)'s job.

use crate::app::ports::{DigitalOutput, Level};

/// Physical state of the relay coil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayLine {
    /// Coil pulled in; the strike releases and the door may open.
    Energized,
    /// Coil released; the door stays latched.
    DeEnergized,
}

pub struct RelayDriver<O: DigitalOutput> {
    out: O,
    active_low: bool,
    line: RelayLine,
    /// Number of DeEnergized → Energized transitions driven.
    pulls: u32,
}

impl<O: DigitalOutput> RelayDriver<O> {
    /// Take ownership of the output and immediately drive it de-energized.
    pub fn new(out: O, active_low: bool) -> Self {
        let mut relay = Self {
            out,
            active_low,
            line: RelayLine::DeEnergized,
            pulls: 0,
        };
        relay.write(RelayLine::DeEnergized);
        relay
    }

    pub fn energize(&mut self) {
        if self.line == RelayLine::DeEnergized {
            self.pulls = self.pulls.wrapping_add(1);
        }
        self.write(RelayLine::Energized);
    }

    pub fn de_energize(&mut self) {
        self.write(RelayLine::DeEnergized);
    }

    pub fn line(&self) -> RelayLine {
        self.line
    }

    pub fn pulls(&self) -> u32 {
        self.pulls
    }

    fn write(&mut self, line: RelayLine) {
        let on = line == RelayLine::Energized;
        self.out.set(level_for(on, self.active_low));
        self.line = line;
    }
}

/// Electrical level that puts a load `on`, given its polarity.
pub(crate) fn level_for(on: bool, active_low: bool) -> Level {
    if on != active_low { Level::High } else { Level::Low }
}
