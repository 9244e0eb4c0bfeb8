//! Default GPIO assignments for the door controller board.
//!
//! These are only defaults: both pins are part of
//! [`DeviceConfig`](crate::config::DeviceConfig) and can be overridden from
//! the NVS config blob for boards wired differently.

// ---------------------------------------------------------------------------
// Door relay module
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor.
pub const RELAY_GPIO: i32 = 4;
/// Most opto-isolated relay boards pull the coil in on a LOW input.
pub const RELAY_ACTIVE_LOW: bool = true;

// ---------------------------------------------------------------------------
// Status indicator
// ---------------------------------------------------------------------------

/// On-board LED used as the connectivity indicator.
pub const STATUS_LED_GPIO: i32 = 2;
pub const STATUS_LED_ACTIVE_LOW: bool = false;
