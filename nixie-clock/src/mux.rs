//! Display multiplexing and the roll cadence.
//!
//! Two periodic tasks share the display frame:
//!
//! - [`mux_task`] scans the six tubes at 1 kHz. Each period starts with a
//!   deterministic blanking window: all anodes off, the phase counter
//!   advances, and after 100 µs the cathode lines take the next digit;
//!   another 100 µs later the phase's anode switches on. The two delays
//!   keep ionized digits from ghosting across tube switches. While the
//!   blink flag is up the lit portion is skipped entirely, which is what
//!   makes the tubes flash during setting.
//! - [`roll_task`] runs the view animation at 15 Hz whenever the clock is
//!   not being set.
//!
//! While setting, the frame bypasses the animator and tracks the clock
//! fields directly, so every button press lands on the tubes within one
//! scan.

use embassy_time::{Duration, Ticker, Timer};

use nixie_core::display::{Animator, Frame, PHASE_COUNT};
use nixie_core::time::View;

use crate::hardware::DisplayPins;
use crate::state;

/// Base multiplex period, one tube per period.
const MUX_PERIOD: Duration = Duration::from_hz(1000);

/// Blanking sub-interval; fires twice per period (cathodes, then anode).
const BLANK_INTERVAL: Duration = Duration::from_micros(100);

/// Animation step rate for the view-switch roll.
const ROLL_PERIOD: Duration = Duration::from_hz(15);

#[embassy_executor::task]
pub async fn mux_task(mut pins: DisplayPins) {
    let mut ticker = Ticker::every(MUX_PERIOD);
    let mut phase: u8 = 0;

    loop {
        ticker.next().await;

        pins.blank_all();
        phase = (phase + 1) % PHASE_COUNT;

        let (digit, blink) = state::with(|s| {
            // While setting, show the live fields for the current view;
            // the animator is parked and would hold a stale frame.
            if s.set.is_setting() {
                s.frame = if s.time.view == View::Time {
                    Frame::snap_time(&s.time)
                } else {
                    Frame::snap_date(&s.time)
                };
            }
            (s.frame.nibble(phase), s.set.blink)
        });

        if blink {
            continue;
        }

        Timer::after(BLANK_INTERVAL).await;
        pins.set_cathodes(digit);

        Timer::after(BLANK_INTERVAL).await;
        pins.light_anode(phase);
    }
}

#[embassy_executor::task]
pub async fn roll_task() {
    let mut ticker = Ticker::every(ROLL_PERIOD);
    let mut animator = Animator::new();

    loop {
        ticker.next().await;

        state::with(|s| {
            if !s.set.is_setting() {
                let state::Shared {
                    time, user, frame, ..
                } = s;
                animator.step(time, user, frame);
            }
        });
    }
}
