//! `critical-section` 1.x provider for ESP-IDF builds.
//!
//! The adapter queues use `CriticalSectionRawMutex` from embassy-sync and
//! are shared between the main loop and ESP-IDF tasks (httpd, mqtt pump).
//! A process-wide std mutex backs the section; nesting on one thread only
//! takes it once.

use core::cell::{Cell, RefCell};
use std::sync::{Mutex, MutexGuard, PoisonError};

static SECTION: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: Cell<u8> = const { Cell::new(0) };
    static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // Sections never panic while held, so a poisoned lock is still sound.
            let guard = SECTION.lock().unwrap_or_else(PoisonError::into_inner);
            HELD.with(|held| *held.borrow_mut() = Some(guard));
        }
        let next = d.saturating_add(1);
        depth.set(next);
        next
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            HELD.with(|held| *held.borrow_mut() = None);
        }
    })
}
