//! Output drivers: the door relay and the connectivity indicator.

pub mod relay;
pub mod status_led;
