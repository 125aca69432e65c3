//! Shared clock state and cross-task signalling.
//!
//! One blocking mutex owns everything the interrupt-driven tasks contend
//! on: the calendar record, the operator message, the set-mode controller
//! and the display frame. Every access runs inside a critical section via
//! [`with`], so a task can never observe a record mid-update and the
//! multiplexer can never read a torn digit pair.
//!
//! Keep the closures short; the multiplex task takes this lock at 1 kHz.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use nixie_core::display::Frame;
use nixie_core::setmode::SetModeState;
use nixie_core::time::{ClockTime, UserData};

/// Everything shared between the tick, multiplex, roll, button and serial
/// paths.
pub struct Shared {
    pub time: ClockTime,
    pub user: UserData,
    pub set: SetModeState,
    pub frame: Frame,
}

impl Shared {
    const fn boot() -> Self {
        Shared {
            time: ClockTime::boot(),
            user: UserData {
                seconds: 0,
                minutes: 0,
                hours: 0,
            },
            set: SetModeState::new(),
            frame: Frame::new(),
        }
    }
}

static STATE: Mutex<CriticalSectionRawMutex, RefCell<Shared>> =
    Mutex::new(RefCell::new(Shared::boot()));

/// Runs `f` on the shared state inside a critical section.
pub fn with<R>(f: impl FnOnce(&mut Shared) -> R) -> R {
    STATE.lock(|cell| f(&mut cell.borrow_mut()))
}

/// Raised by the tick task when the idle limit throws the controller out
/// of setting mode; the button task waits on this while parked in the
/// setting flow.
pub static SET_MODE_EXITED: Signal<CriticalSectionRawMutex, ()> = Signal::new();
