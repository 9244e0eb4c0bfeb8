//! LinkSupervisor: watches the WiFi association and drives the indicator.
//!
//! The radio driver owns association retries; this supervisor only asks for
//! the initial association, observes the result and shows it:
//!
//! | link          | indicator                          |
//! |---------------|------------------------------------|
//! | down          | toggled every `blink_ms` while waiting |
//! | came up       | steady on                          |

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::drivers::status_led::StatusLed;

use super::Step;
use super::events::AppEvent;
use super::ports::{Clock, DigitalOutput, EventSink, LinkError, LinkPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

pub struct LinkSupervisor<L: LinkPort, I: DigitalOutput> {
    link: L,
    led: StatusLed<I>,
    state: LinkState,
    blink_ms: u32,
    ip: Option<Ipv4Addr>,
    outages: u32,
}

impl<L: LinkPort, I: DigitalOutput> LinkSupervisor<L, I> {
    pub fn new(link: L, led: StatusLed<I>, blink_ms: u32) -> Self {
        Self {
            link,
            led,
            state: LinkState::Disconnected,
            blink_ms,
            ip: None,
            outages: 0,
        }
    }

    /// Request the initial association.  Only ever called once at boot.
    pub fn begin(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        info!("WiFi: associating with '{}'", ssid);
        self.link.begin(ssid, password).inspect_err(|e| {
            warn!("WiFi: association request failed: {}", e);
        })
    }

    /// Observe the driver and record any transition.
    pub fn is_up(&mut self, sink: &mut impl EventSink) -> bool {
        let up = self.link.is_connected();
        match (self.state, up) {
            (LinkState::Disconnected, true) => {
                self.state = LinkState::Connected;
                self.ip = self.link.ip_address();
                self.led.on();
                sink.emit(&AppEvent::LinkUp { ip: self.ip });
            }
            (LinkState::Connected, false) => {
                self.state = LinkState::Disconnected;
                self.ip = None;
                self.outages = self.outages.wrapping_add(1);
                sink.emit(&AppEvent::LinkLost {
                    outages: self.outages,
                });
            }
            _ => {}
        }
        up
    }

    /// Raw driver check without recording a transition.
    pub fn sense(&self) -> bool {
        self.link.is_connected()
    }

    /// One non-blocking poll: `Ready` when up, otherwise blink and wait.
    pub fn step(&mut self, sink: &mut impl EventSink) -> Step {
        if self.is_up(sink) {
            return Step::Ready;
        }
        self.led.toggle();
        Step::Wait(self.blink_ms)
    }

    /// Block until the link is up.  Returns at once if it already is.
    pub fn ensure_up(&mut self, clock: &mut impl Clock, sink: &mut impl EventSink) {
        while let Step::Wait(ms) = self.step(sink) {
            clock.delay_ms(ms);
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    pub fn outages(&self) -> u32 {
        self.outages
    }

    pub fn indicator_on(&self) -> bool {
        self.led.is_on()
    }

    pub fn indicator_toggles(&self) -> u32 {
        self.led.toggles()
    }

    pub fn port(&self) -> &L {
        &self.link
    }
}
