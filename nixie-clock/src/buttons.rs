//! Button gesture driver.
//!
//! Bridges the two EXTI inputs to the set-mode controller. The task mirrors
//! the controller's state: outside setting it watches for the two-button
//! gesture (a quick chord toggles the view, holding the chord for a second
//! arms the setting flow), inside setting it watches single presses and
//! runs the ramping auto-repeat while a button stays down.
//!
//! Which edges are listened to in which state is the whole
//! interrupt-enable story: a gesture that the controller would ignore is
//! simply never awaited.

use embassy_futures::select::{Either, Either3, select, select3};
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer, with_timeout};

use nixie_core::setmode::{REPEAT_START_MICROS, SetMode, next_repeat_interval};

use crate::state::{self, SET_MODE_EXITED};

/// Settle time after an edge before the levels are trusted. The board has
/// an RC and glitch filter in front of the inputs; this only rides out
/// what slips through.
const DEBOUNCE: Duration = Duration::from_millis(10);

/// How long the chord must be held before the setting flow arms.
const HOLD_ARM: Duration = Duration::from_secs(1);

#[embassy_executor::task]
pub async fn buttons_task(mut down: ExtiInput<'static>, mut up: ExtiInput<'static>) {
    loop {
        let mode = state::with(|s| s.set.mode);
        match mode {
            SetMode::NotSetting | SetMode::PreSet => {
                chord_gesture(&mut down, &mut up).await;
            }
            SetMode::SetBlink => {
                adjust_or_exit(&mut down, &mut up).await;
            }
            SetMode::SetInc { .. } => {
                // Only reachable if the repeat loop was abandoned; settle
                // the controller and re-enter the normal flow.
                state::with(|s| s.set.on_adjust_release());
            }
        }
    }
}

/// Outside the setting flow: waits for the two-button chord and resolves
/// it into either the view toggle (quick release) or the setting interlock
/// (held for [`HOLD_ARM`], then released).
async fn chord_gesture(down: &mut ExtiInput<'static>, up: &mut ExtiInput<'static>) {
    if down.is_high() && up.is_high() {
        select(down.wait_for_falling_edge(), up.wait_for_falling_edge()).await;
        Timer::after(DEBOUNCE).await;
    }

    // A single press means nothing on its own; either the second button
    // joins the chord or the first goes back up and the gesture dissolves.
    while !(down.is_low() && up.is_low()) {
        if down.is_high() && up.is_high() {
            return;
        }
        select(down.wait_for_any_edge(), up.wait_for_any_edge()).await;
        Timer::after(DEBOUNCE).await;
    }

    let held = with_timeout(
        HOLD_ARM,
        select(down.wait_for_rising_edge(), up.wait_for_rising_edge()),
    )
    .await
    .is_err();

    if held {
        state::with(|s| s.set.on_hold_elapsed());
        #[cfg(feature = "debug-mode")]
        defmt::info!("setting flow armed");
    }

    wait_both_high(down, up).await;

    let entered = state::with(|s| {
        let state::Shared { time, set, .. } = s;
        set.on_both_released(time)
    });

    if entered {
        #[cfg(feature = "debug-mode")]
        defmt::info!("entered set mode");
    }
}

/// Inside `SetBlink`: a press on either button starts adjusting, or the
/// tick task's idle exit sends the driver back to watching for the chord.
async fn adjust_or_exit(down: &mut ExtiInput<'static>, up: &mut ExtiInput<'static>) {
    SET_MODE_EXITED.reset();

    match select3(
        down.wait_for_falling_edge(),
        up.wait_for_falling_edge(),
        SET_MODE_EXITED.wait(),
    )
    .await
    {
        Either3::First(_) => run_repeat(down, -1).await,
        Either3::Second(_) => run_repeat(up, 1).await,
        Either3::Third(_) => {
            #[cfg(feature = "debug-mode")]
            defmt::info!("set mode idle exit");
        }
    }
}

/// Press-and-hold auto-repeat.
///
/// Applies the immediate step, then keeps stepping while the button stays
/// down, shortening the interval by one sixth per firing down to the
/// floor. The button's release edge ends the run.
async fn run_repeat(button: &mut ExtiInput<'static>, dir: i8) {
    let armed = state::with(|s| {
        let state::Shared { time, set, .. } = s;
        set.on_adjust_press(dir, time)
    });
    if !armed {
        return;
    }

    let mut interval = REPEAT_START_MICROS;
    loop {
        match select(
            button.wait_for_rising_edge(),
            Timer::after(Duration::from_micros(interval as u64)),
        )
        .await
        {
            Either::First(_) => break,
            Either::Second(_) => {
                state::with(|s| {
                    let state::Shared { time, set, .. } = s;
                    set.on_repeat(time)
                });
                interval = next_repeat_interval(interval);
            }
        }
    }

    Timer::after(DEBOUNCE).await;
    state::with(|s| s.set.on_adjust_release());
}

/// Waits until both buttons read high, riding out bounce.
async fn wait_both_high(down: &mut ExtiInput<'static>, up: &mut ExtiInput<'static>) {
    loop {
        Timer::after(DEBOUNCE).await;
        if down.is_high() && up.is_high() {
            return;
        }
        select(down.wait_for_rising_edge(), up.wait_for_rising_edge()).await;
    }
}
