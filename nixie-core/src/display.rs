//! Display frame and the view-switch rolling animation.
//!
//! [`Frame`] is "what is currently lit": three packed digit pairs the
//! multiplexer reads one nibble at a time. [`Animator`] rewrites the frame
//! at the roll cadence, either copying the active view straight in or
//! odometer-rolling every tube toward it after a view switch.

use crate::bcd::{BcdPair, year_suffix};
use crate::time::{ClockTime, UserData, View};

/// Number of physical digit positions scanned by the multiplexer.
pub const PHASE_COUNT: u8 = 6;

/// The three digit pairs currently driven onto the tubes.
///
/// Pair names follow the time view; the date view carries the year
/// remainder on the seconds tubes, the month on the minutes tubes and the
/// day on the hours tubes, mirroring the board's silkscreen.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Frame {
    pub seconds: BcdPair,
    pub minutes: BcdPair,
    pub hours: BcdPair,
}

impl Frame {
    pub const fn new() -> Self {
        Frame {
            seconds: BcdPair::new(0),
            minutes: BcdPair::new(0),
            hours: BcdPair::new(0),
        }
    }

    /// Digit for one multiplex phase, ones position first within each pair.
    pub fn nibble(&self, phase: u8) -> u8 {
        match phase % PHASE_COUNT {
            0 => self.seconds.low(),
            1 => self.seconds.high(),
            2 => self.minutes.low(),
            3 => self.minutes.high(),
            4 => self.hours.low(),
            _ => self.hours.high(),
        }
    }

    pub fn snap_time(time: &ClockTime) -> Self {
        Frame {
            seconds: BcdPair::from_binary(time.seconds),
            minutes: BcdPair::from_binary(time.minutes),
            hours: BcdPair::from_binary(time.hours),
        }
    }

    pub fn snap_date(time: &ClockTime) -> Self {
        Frame {
            seconds: BcdPair::from_binary(year_suffix(time.years)),
            minutes: BcdPair::from_binary(time.months),
            hours: BcdPair::from_binary(time.days),
        }
    }

    pub fn snap_user(user: &UserData) -> Self {
        Frame {
            seconds: BcdPair::from_binary(user.seconds),
            minutes: BcdPair::from_binary(user.minutes),
            hours: BcdPair::from_binary(user.hours),
        }
    }
}

/// View-switch animation state.
///
/// Each view keeps its own elapsed-step counter so a switch mid-roll
/// restarts the sweep for the new target. `one_time_roll` makes the time
/// view roll in once after arriving from another view; without it the
/// normal once-per-second display updates would roll on every tick.
pub struct Animator {
    over_time: u8,
    over_date: u8,
    over_user: u8,
    one_time_roll: bool,
}

impl Animator {
    pub const fn new() -> Self {
        Animator {
            over_time: 0,
            over_date: 0,
            over_user: 0,
            one_time_roll: false,
        }
    }

    /// One animation step at the roll cadence.
    ///
    /// Rolls the frame toward the active view's digits, or copies them
    /// straight in when the time view is already settled. Completion hands
    /// off: the other views' counters reset, the one-time-roll latch flips
    /// so the next view rolls in from the tubes' current digits, and the
    /// view unlocks, releasing the timeout-driven rotation.
    pub fn step(&mut self, time: &mut ClockTime, user: &UserData, frame: &mut Frame) {
        match time.view {
            View::Date => {
                let target = Frame::snap_date(time);
                let s = frame.seconds.roll_step(target.seconds, self.over_date);
                let m = frame.minutes.roll_step(target.minutes, self.over_date);
                let h = frame.hours.roll_step(target.hours, self.over_date);
                if s && m && h {
                    self.one_time_roll = true;
                    self.over_time = 0;
                    self.over_user = 0;
                    time.locked = false;
                } else {
                    self.over_date = self.over_date.wrapping_add(1);
                }
            }
            View::Time => {
                if self.one_time_roll {
                    let target = Frame::snap_time(time);
                    let s = frame.seconds.roll_step(target.seconds, self.over_time);
                    let m = frame.minutes.roll_step(target.minutes, self.over_time);
                    let h = frame.hours.roll_step(target.hours, self.over_time);
                    if s && m && h {
                        self.one_time_roll = false;
                        self.over_date = 0;
                        self.over_user = 0;
                        time.locked = false;
                    } else {
                        self.over_time = self.over_time.wrapping_add(1);
                    }
                } else {
                    *frame = Frame::snap_time(time);
                }
            }
            View::UserData => {
                let target = Frame::snap_user(user);
                let s = frame.seconds.roll_step(target.seconds, self.over_user);
                let m = frame.minutes.roll_step(target.minutes, self.over_user);
                let h = frame.hours.roll_step(target.hours, self.over_user);
                if s && m && h {
                    self.one_time_roll = true;
                    self.over_date = 0;
                    self.over_time = 0;
                    time.locked = false;
                } else {
                    self.over_user = self.over_user.wrapping_add(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcd::BcdPair;

    fn settle(anim: &mut Animator, time: &mut ClockTime, user: &UserData, frame: &mut Frame) -> usize {
        let mut steps = 0;
        loop {
            let before = *frame;
            let was_locked = time.locked;
            anim.step(time, user, frame);
            steps += 1;
            if *frame == before && was_locked != time.locked {
                // completion step: nothing moved and the view unlocked
                return steps;
            }
            if !time.locked && *frame == before {
                return steps;
            }
            assert!(steps < 64, "animation never settled");
        }
    }

    #[test]
    fn settled_time_view_copies_directly() {
        let mut anim = Animator::new();
        let mut time = ClockTime::boot();
        let user = UserData::default();
        let mut frame = Frame::new();

        anim.step(&mut time, &user, &mut frame);
        assert_eq!(frame, Frame::snap_time(&time));

        time.advance(1, crate::time::Field::Seconds, false);
        anim.step(&mut time, &user, &mut frame);
        assert_eq!(frame.seconds, BcdPair::from_binary(time.seconds));
    }

    #[test]
    fn date_switch_rolls_and_unlocks() {
        let mut anim = Animator::new();
        let mut time = ClockTime::boot();
        let user = UserData::default();
        let mut frame = Frame::snap_time(&time);

        time.select_view(View::Date);
        settle(&mut anim, &mut time, &user, &mut frame);

        assert_eq!(frame, Frame::snap_date(&time));
        assert!(!time.locked);
    }

    #[test]
    fn time_rolls_back_in_once_then_snaps() {
        let mut anim = Animator::new();
        let mut time = ClockTime::boot();
        let user = UserData::default();
        let mut frame = Frame::snap_time(&time);

        // Out to the date view and back.
        time.select_view(View::Date);
        settle(&mut anim, &mut time, &user, &mut frame);
        time.select_view(View::Time);

        // The return trip must roll (frame changes digit by digit), not snap.
        let before = frame;
        anim.step(&mut time, &user, &mut frame);
        assert_ne!(frame, before);
        assert_ne!(frame, Frame::snap_time(&time));

        settle(&mut anim, &mut time, &user, &mut frame);
        assert_eq!(frame, Frame::snap_time(&time));
        assert!(!time.locked);

        // Settled again: ordinary tick updates are direct copies.
        time.advance(1, crate::time::Field::Seconds, false);
        anim.step(&mut time, &user, &mut frame);
        assert_eq!(frame, Frame::snap_time(&time));
    }

    #[test]
    fn user_data_rolls_in_like_a_view() {
        let mut anim = Animator::new();
        let mut time = ClockTime::boot();
        let user = UserData {
            seconds: 11,
            minutes: 22,
            hours: 33,
        };
        let mut frame = Frame::snap_time(&time);

        time.select_view(View::UserData);
        settle(&mut anim, &mut time, &user, &mut frame);

        assert_eq!(frame, Frame::snap_user(&user));
        assert!(!time.locked);
    }

    #[test]
    fn nibbles_index_phases_in_scan_order() {
        let frame = Frame {
            seconds: BcdPair::new(0x12),
            minutes: BcdPair::new(0x34),
            hours: BcdPair::new(0x56),
        };
        let digits: [u8; 6] = core::array::from_fn(|phase| frame.nibble(phase as u8));
        assert_eq!(digits, [2, 1, 4, 3, 6, 5]);
    }
}
