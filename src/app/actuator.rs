//! ActuatorGuard: sole owner of the door relay.
//!
//! One actuation cycle is `energize → dwell → de-energize`, run to completion
//! on the calling thread.  The guard refuses to start a cycle while one is
//! running and refuses commands that were issued before the previous cycle
//! finished: the network stacks accept requests on their own tasks, so
//! duplicates that piled up during a dwell reach us only after it ends.
//!
//! ```text
//!   try_open(t) ──▶ busy? ──yes──▶ Rejected(AlreadyBusy)
//!                    │no
//!                    ▼
//!            t < last_end? ──yes──▶ Rejected(AlreadyBusy)
//!                    │no
//!                    ▼
//!   busy=1 · energize · delay(dwell) · de-energize · busy=0 ──▶ Started
//! ```

use core::fmt;

use log::{debug, info};

use crate::drivers::relay::{RelayDriver, RelayLine};

use super::ports::{Clock, DigitalOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A cycle is running, or the command predates the end of the last one.
    AlreadyBusy,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyBusy => write!(f, "already busy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Started,
    Rejected(RejectReason),
}

/// Start/end timestamps of a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleWindow {
    pub started_ms: u64,
    pub ended_ms: u64,
}

impl CycleWindow {
    pub fn held_ms(&self) -> u64 {
        self.ended_ms.saturating_sub(self.started_ms)
    }
}

pub struct ActuatorGuard<R: DigitalOutput> {
    relay: RelayDriver<R>,
    busy: bool,
    dwell_ms: u32,
    last_cycle: Option<CycleWindow>,
    cycles: u32,
    rejections: u32,
}

impl<R: DigitalOutput> ActuatorGuard<R> {
    /// Wrap `relay`.  The driver already holds the line de-energized.
    pub fn new(relay: RelayDriver<R>, dwell_ms: u32) -> Self {
        Self {
            relay,
            busy: false,
            dwell_ms,
            last_cycle: None,
            cycles: 0,
            rejections: 0,
        }
    }

    /// Run one actuation cycle for a command issued at `requested_at_ms`.
    pub fn try_open(&mut self, requested_at_ms: u64, clock: &mut impl Clock) -> OpenOutcome {
        if self.busy || self.predates_last_cycle(requested_at_ms) {
            self.rejections = self.rejections.wrapping_add(1);
            debug!("Door: rejecting command from t={}ms", requested_at_ms);
            return OpenOutcome::Rejected(RejectReason::AlreadyBusy);
        }

        self.busy = true;
        let started_ms = clock.now_ms();
        self.relay.energize();
        clock.delay_ms(self.dwell_ms);
        self.relay.de_energize();
        let ended_ms = clock.now_ms();
        self.busy = false;

        self.cycles = self.cycles.wrapping_add(1);
        let window = CycleWindow {
            started_ms,
            ended_ms,
        };
        self.last_cycle = Some(window);
        info!("Door: cycle #{} held {}ms", self.cycles, window.held_ms());
        OpenOutcome::Started
    }

    fn predates_last_cycle(&self, requested_at_ms: u64) -> bool {
        self.last_cycle
            .is_some_and(|w| requested_at_ms < w.ended_ms)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn line(&self) -> RelayLine {
        self.relay.line()
    }

    pub fn dwell_ms(&self) -> u32 {
        self.dwell_ms
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    pub fn last_cycle(&self) -> Option<CycleWindow> {
        self.last_cycle
    }

    /// Number of times the relay has actually been pulled in.
    pub fn relay_pulls(&self) -> u32 {
        self.relay.pulls()
    }
}
