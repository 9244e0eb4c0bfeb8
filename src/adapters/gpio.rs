//! Bridge from any `embedded-hal` output pin to [`DigitalOutput`].
//!
//! On ESP-IDF this wraps a `PinDriver<'static, AnyOutputPin, Output>`;
//! pin errors are logged and otherwise ignored, since a GPIO write on a
//! configured output cannot meaningfully fail.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{DigitalOutput, Level};

pub struct GpioOutput<P: OutputPin> {
    pin: P,
    label: &'static str,
}

impl<P: OutputPin> GpioOutput<P> {
    pub fn new(pin: P, label: &'static str) -> Self {
        Self { pin, label }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> DigitalOutput for GpioOutput<P> {
    fn set(&mut self, level: Level) {
        if let Err(e) = self.pin.set_state(level) {
            warn!("GPIO: {} write failed: {:?}", self.label, e);
        }
    }
}

/// Simulation pin: remembers its level and counts writes.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    writes: u32,
}

#[cfg(not(target_os = "espidf"))]
impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }
}

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::digital::ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

#[cfg(not(target_os = "espidf"))]
impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

/// GPIO number → output pin on ESP-IDF.
#[cfg(target_os = "espidf")]
pub fn output_pin(
    gpio: i32,
) -> Result<
    esp_idf_svc::hal::gpio::PinDriver<
        'static,
        esp_idf_svc::hal::gpio::AnyOutputPin,
        esp_idf_svc::hal::gpio::Output,
    >,
    esp_idf_svc::sys::EspError,
> {
    use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};

    // SAFETY: each configured GPIO is claimed exactly once, in main.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    PinDriver::output(pin)
}
