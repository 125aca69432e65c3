//! Button-driven time-setting state machine.
//!
//! Two push-buttons drive everything. Holding both for a second arms the
//! setting flow (`PreSet`); releasing both then enters it (`SetBlink`), a
//! two-stage interlock so neither a stray press nor a stray release can
//! enter or leave setting on its own. Inside, a press of either button
//! nudges the clock and starts the ramping auto-repeat (`SetInc`); four
//! idle seconds fall back out to `NotSetting`.
//!
//! The machine itself is pure: the firmware's button task feeds it edge
//! events, the 1 Hz tick feeds it [`SetModeState::on_tick`], and the
//! returned values tell the task what to arm or tear down.

use crate::time::{ClockTime, Field, View};

/// Idle seconds in `SetBlink` before the controller gives up and exits.
pub const SET_IDLE_EXIT_SECS: u8 = 4;

/// First auto-repeat interval after a press is held (3 Hz).
pub const REPEAT_START_MICROS: u32 = 333_333;
/// Auto-repeat floor (100 Hz).
pub const REPEAT_MIN_MICROS: u32 = 10_000;

/// Setting-flow state. `SetInc` carries the direction recorded at the
/// press so a firing repeat timer can never observe a stale sign.
#[derive(Clone, Copy, PartialEq, Eq, Debug, defmt::Format)]
pub enum SetMode {
    NotSetting,
    PreSet,
    SetBlink,
    SetInc { dir: i8 },
}

/// What the 1 Hz tick asks the firmware to do afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickAction {
    None,
    /// Idle limit hit: setting mode was left, the view-toggle gesture is
    /// live again.
    LeftSetMode,
}

/// Set-mode controller state: the mode, the blink flag the multiplexer
/// honors, and the idle counter behind the auto-exit.
pub struct SetModeState {
    pub mode: SetMode,
    pub blink: bool,
    idle_secs: u8,
}

impl SetModeState {
    pub const fn new() -> Self {
        SetModeState {
            mode: SetMode::NotSetting,
            blink: false,
            idle_secs: 0,
        }
    }

    pub fn is_setting(&self) -> bool {
        self.mode != SetMode::NotSetting
    }

    /// One-second tick.
    ///
    /// Seconds keep counting in every state except `SetInc`, where the
    /// operator owns the minute field and a tick through :59 would fight
    /// the adjustment. Blink toggles while armed or editing, the view
    /// rotation only runs outside the setting flow, and `SetBlink` ages
    /// toward the idle exit.
    pub fn on_tick(&mut self, time: &mut ClockTime) -> TickAction {
        match self.mode {
            SetMode::NotSetting => {
                time.advance(1, Field::Seconds, false);
                self.blink = false;
                time.tick_views();
                TickAction::None
            }
            SetMode::PreSet => {
                self.blink = !self.blink;
                time.advance(1, Field::Seconds, false);
                TickAction::None
            }
            SetMode::SetBlink => {
                self.blink = !self.blink;
                time.advance(1, Field::Seconds, false);
                self.idle_secs += 1;
                if self.idle_secs > SET_IDLE_EXIT_SECS {
                    self.idle_secs = 0;
                    self.mode = SetMode::NotSetting;
                    self.blink = false;
                    time.view_timeout = 0;
                    TickAction::LeftSetMode
                } else {
                    TickAction::None
                }
            }
            SetMode::SetInc { .. } => {
                self.idle_secs = 0;
                TickAction::None
            }
        }
    }

    /// Both buttons have been held down for the arming delay.
    pub fn on_hold_elapsed(&mut self) {
        if self.mode == SetMode::NotSetting {
            self.mode = SetMode::PreSet;
        }
    }

    /// Both buttons are back up.
    ///
    /// From `PreSet` this completes the interlock and enters `SetBlink`;
    /// returns `true` so the caller mutes the toggle gesture. Outside the
    /// setting flow the same release is the view-toggle gesture.
    pub fn on_both_released(&mut self, time: &mut ClockTime) -> bool {
        match self.mode {
            SetMode::PreSet => {
                self.mode = SetMode::SetBlink;
                self.idle_secs = 0;
                true
            }
            SetMode::NotSetting => {
                time.toggle_view();
                false
            }
            _ => false,
        }
    }

    /// An adjustment button went down while setting.
    ///
    /// Applies one immediate step and records the direction for the repeat
    /// timer. In the time view the adjustment is whole minutes with the
    /// seconds zeroed and the date pinned; in any other view it is days.
    /// Returns `true` when the caller should arm the repeat timer.
    pub fn on_adjust_press(&mut self, dir: i8, time: &mut ClockTime) -> bool {
        match self.mode {
            SetMode::SetBlink | SetMode::SetInc { .. } => {
                Self::apply(dir, time, true);
                self.mode = SetMode::SetInc { dir };
                self.blink = false;
                self.idle_secs = 0;
                true
            }
            _ => false,
        }
    }

    /// The held adjustment button came back up: stop repeating.
    pub fn on_adjust_release(&mut self) {
        if let SetMode::SetInc { .. } = self.mode {
            self.mode = SetMode::SetBlink;
        }
    }

    /// Repeat timer fired: apply another step in the recorded direction.
    pub fn on_repeat(&mut self, time: &mut ClockTime) {
        if let SetMode::SetInc { dir } = self.mode {
            Self::apply(dir, time, false);
        }
    }

    fn apply(dir: i8, time: &mut ClockTime, initial: bool) {
        if time.view == View::Time {
            if initial {
                time.seconds = 0;
            }
            time.advance(dir, Field::Minutes, true);
        } else {
            time.advance(dir, Field::Days, false);
        }
    }
}

/// Next auto-repeat interval: one sixth faster each firing, floored at
/// [`REPEAT_MIN_MICROS`].
pub fn next_repeat_interval(micros: u32) -> u32 {
    let next = micros - micros / 6;
    if next < REPEAT_MIN_MICROS {
        REPEAT_MIN_MICROS
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::View;

    #[test]
    fn interlock_walks_the_full_sequence() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();

        assert_eq!(set.mode, SetMode::NotSetting);
        set.on_hold_elapsed();
        assert_eq!(set.mode, SetMode::PreSet);

        let entered = set.on_both_released(&mut time);
        assert!(entered);
        assert_eq!(set.mode, SetMode::SetBlink);

        let armed = set.on_adjust_press(1, &mut time);
        assert!(armed);
        assert_eq!(set.mode, SetMode::SetInc { dir: 1 });

        set.on_adjust_release();
        assert_eq!(set.mode, SetMode::SetBlink);

        // Four idle seconds are tolerated, the fifth tick exits.
        for _ in 0..SET_IDLE_EXIT_SECS {
            assert_eq!(set.on_tick(&mut time), TickAction::None);
        }
        assert_eq!(set.on_tick(&mut time), TickAction::LeftSetMode);
        assert_eq!(set.mode, SetMode::NotSetting);
        assert!(!set.blink);
        assert_eq!(time.view_timeout, 0);
    }

    #[test]
    fn quick_release_outside_setting_toggles_the_view() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();

        let entered = set.on_both_released(&mut time);
        assert!(!entered);
        assert_eq!(set.mode, SetMode::NotSetting);
        assert_eq!(time.view, View::Date);
        assert!(time.locked);
    }

    #[test]
    fn blink_toggles_only_while_armed_or_editing() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();

        set.on_tick(&mut time);
        assert!(!set.blink);

        set.on_hold_elapsed();
        set.on_tick(&mut time);
        assert!(set.blink);
        set.on_tick(&mut time);
        assert!(!set.blink);

        set.on_both_released(&mut time);
        set.on_tick(&mut time);
        assert!(set.blink);

        // A press lights the tubes again right away.
        set.on_adjust_press(1, &mut time);
        assert!(!set.blink);
    }

    #[test]
    fn seconds_freeze_while_a_button_is_held() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();
        set.on_hold_elapsed();
        set.on_both_released(&mut time);
        set.on_adjust_press(1, &mut time);

        let minutes = time.minutes;
        let seconds = time.seconds;
        for _ in 0..10 {
            set.on_tick(&mut time);
        }
        assert_eq!(time.minutes, minutes);
        assert_eq!(time.seconds, seconds);
        // And the idle exit never fires while held.
        assert_eq!(set.mode, SetMode::SetInc { dir: 1 });
    }

    #[test]
    fn time_view_adjusts_minutes_and_zeroes_seconds() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();
        time.seconds = 42;
        set.on_hold_elapsed();
        set.on_both_released(&mut time);

        set.on_adjust_press(1, &mut time);
        assert_eq!(time.seconds, 0);
        assert_eq!(time.minutes, 2);

        // Repeats step minutes without touching seconds again.
        time.seconds = 30;
        set.on_repeat(&mut time);
        assert_eq!(time.seconds, 30);
        assert_eq!(time.minutes, 3);

        // Backing up through midnight leaves the date alone.
        set.on_adjust_release();
        time.minutes = 0;
        time.hours = 0;
        set.on_adjust_press(-1, &mut time);
        assert_eq!((time.minutes, time.hours), (59, 23));
        assert_eq!((time.days, time.months), (31, 12));
    }

    #[test]
    fn date_view_adjusts_days() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();
        time.select_view(View::Date);
        set.on_hold_elapsed();
        set.on_both_released(&mut time);

        set.on_adjust_press(1, &mut time);
        assert_eq!((time.days, time.months, time.years), (1, 1, 2018));

        set.on_adjust_release();
        set.on_adjust_press(-1, &mut time);
        assert_eq!((time.days, time.months, time.years), (31, 12, 2017));
    }

    #[test]
    fn presses_outside_setting_are_ignored() {
        let mut set = SetModeState::new();
        let mut time = ClockTime::boot();
        let minutes = time.minutes;

        assert!(!set.on_adjust_press(1, &mut time));
        assert_eq!(set.mode, SetMode::NotSetting);
        assert_eq!(time.minutes, minutes);

        set.on_hold_elapsed();
        assert!(!set.on_adjust_press(1, &mut time));
        assert_eq!(set.mode, SetMode::PreSet);
    }

    #[test]
    fn repeat_interval_ramps_to_the_floor() {
        let mut interval = REPEAT_START_MICROS;
        let mut firings = 0;
        while interval > REPEAT_MIN_MICROS {
            let next = next_repeat_interval(interval);
            assert!(next < interval);
            interval = next;
            firings += 1;
            assert!(firings < 64);
        }
        assert_eq!(interval, REPEAT_MIN_MICROS);
        assert_eq!(next_repeat_interval(interval), REPEAT_MIN_MICROS);
    }
}
