//! Calendar/time model.
//!
//! [`ClockTime`] is the single source of truth for what the clock thinks the
//! time and date are, which view the tubes are showing, and how long that
//! view has been up. All mutation goes through [`ClockTime::advance`], which
//! normalizes every field back into range, so the rest of the system can
//! assume seconds/minutes/hours/day/month are always displayable and the
//! year never drops below 2000.
//!
//! February has 29 days whenever `year % 4 == 0`. That is the rule the
//! deployed boards run and the protocol peers expect; it stays.

/// Lower bound for the year field. Borrow arithmetic clamps here.
pub const YEAR_MIN: u16 = 2000;

/// Seconds the time view stays up before switching to the date.
pub const SHOW_TIME_SECS: u16 = 90;
/// Seconds the date view stays up before switching back to the time.
pub const SHOW_DATE_SECS: u16 = 10;
/// Seconds an operator message stays up before reverting to the time.
pub const SHOW_USER_SECS: u16 = 10;

/// Which three digit pairs the tubes are rendering.
#[derive(Clone, Copy, PartialEq, Eq, Debug, defmt::Format)]
pub enum View {
    /// Hours / minutes / seconds
    Time,
    /// Day / month / year remainder
    Date,
    /// Operator-supplied message digits
    UserData,
}

/// Field selector for [`ClockTime::advance`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, defmt::Format)]
pub enum Field {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

/// Transient operator message shown on the UserData view.
///
/// Field names mirror the tube positions they land on, not wall-clock
/// meaning. Loaded by the serial `DISP` command, displayed once, discarded.
#[derive(Clone, Copy, Default, Debug)]
pub struct UserData {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
}

/// Time-of-day and date record plus view selection state.
///
/// Shared between the 1 Hz tick, the multiplex path, the set-mode
/// controller and the serial protocol; the firmware wraps it in a critical
/// section, this type only guarantees that every method leaves the fields
/// in range.
#[derive(Clone, Copy, Debug)]
pub struct ClockTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub days: u8,
    pub months: u8,
    pub years: u16,
    /// View the display is (or is rolling toward) showing.
    pub view: View,
    /// Suppresses the timeout-driven view switch until the roll-in lands.
    pub locked: bool,
    /// Seconds the current view has been up. Reset on every view change.
    pub view_timeout: u16,
}

/// Days in `month` of `year`, by the clock's own calendar.
///
/// Months 1,3,5,7,8,10,12 have 31 days, months 4,6,9,11 have 30, and
/// February has 29 exactly when `year` is divisible by four.
pub fn days_in_month(month: u8, year: u16) -> u8 {
    if month != 2 {
        if ((month < 7) && (month % 2 == 0)) || ((month > 7) && (month % 2 == 1)) {
            30
        } else {
            31
        }
    } else if year % 4 != 0 {
        28
    } else {
        29
    }
}

impl ClockTime {
    /// Power-on state: 12:01:00 on 2017-12-31, time view, unlocked.
    pub const fn boot() -> Self {
        ClockTime {
            seconds: 0,
            minutes: 1,
            hours: 12,
            days: 31,
            months: 12,
            years: 2017,
            view: View::Time,
            locked: false,
            view_timeout: 0,
        }
    }

    /// Adds `delta` to `field` and normalizes every field back into range.
    ///
    /// A positive result carries upward: seconds past 59 roll a minute,
    /// minutes past 59 roll an hour, hours past 23 roll a day (suppressed
    /// by `time_only`, so nudging minutes while setting never moves the
    /// date), days past the month length roll a month, months past 12 roll
    /// a year.
    ///
    /// A negative result borrows from the next larger unit with the same
    /// `time_only` cut-off, taking the new month's length on a day borrow.
    /// The year clamps at [`YEAR_MIN`] on every downward path.
    pub fn advance(&mut self, delta: i8, field: Field, time_only: bool) {
        let mut seconds = self.seconds as i16;
        let mut minutes = self.minutes as i16;
        let mut hours = self.hours as i16;
        let mut days = self.days as i16;
        let mut months = self.months as i16;
        let mut years = self.years as i32;

        match field {
            Field::Seconds => seconds += delta as i16,
            Field::Minutes => minutes += delta as i16,
            Field::Hours => hours += delta as i16,
            Field::Days => days += delta as i16,
            Field::Months => months += delta as i16,
            Field::Years => years += delta as i32,
        }

        if delta > 0 {
            if seconds > 59 {
                minutes += 1;
                seconds = 0;
            }
            if minutes > 59 {
                hours += 1;
                minutes = 0;
            }
            if hours > 23 {
                if !time_only {
                    days += 1;
                }
                hours = 0;
            }
            if days > days_in_month(months as u8, years as u16) as i16 {
                months += 1;
                days = 1;
            }
            if months > 12 {
                years += 1;
                months = 1;
            }
        } else {
            if seconds < 0 {
                minutes -= 1;
                seconds = 59;
            }
            if minutes < 0 {
                hours -= 1;
                minutes = 59;
            }
            if hours < 0 {
                if !time_only {
                    days -= 1;
                }
                hours = 23;
            }
            if days < 1 {
                months -= 1;
                if months < 1 {
                    years -= 1;
                    months = 12;
                }
                days = days_in_month(months as u8, years as u16) as i16;
            }
            if months < 1 {
                years -= 1;
                months = 12;
            }
            if years < YEAR_MIN as i32 {
                years = YEAR_MIN as i32;
            }
        }

        self.seconds = seconds as u8;
        self.minutes = minutes as u8;
        self.hours = hours as u8;
        self.days = days as u8;
        self.months = months as u8;
        self.years = years as u16;
    }

    /// Per-second view bookkeeping: ages the current view and runs the
    /// automatic time/date rotation once the window expires. A locked view
    /// keeps aging but never switches; the animation engine unlocks it when
    /// the roll-in completes.
    pub fn tick_views(&mut self) {
        self.view_timeout += 1;

        if self.locked {
            return;
        }
        match self.view {
            View::Time if self.view_timeout > SHOW_TIME_SECS => {
                self.view = View::Date;
                self.locked = true;
                self.view_timeout = 0;
            }
            View::Date if self.view_timeout > SHOW_DATE_SECS => {
                self.view = View::Time;
                self.locked = true;
                self.view_timeout = 0;
            }
            View::UserData if self.view_timeout > SHOW_USER_SECS => {
                self.view = View::Time;
                self.locked = true;
                self.view_timeout = 0;
            }
            _ => {}
        }
    }

    /// Button-driven view toggle. Acts only on an unlocked time or date
    /// view; a view still rolling in ignores the press. Resets the window
    /// either way.
    pub fn toggle_view(&mut self) {
        match (self.view, self.locked) {
            (View::Time, false) => {
                self.view = View::Date;
                self.locked = true;
            }
            (View::Date, false) => {
                self.view = View::Time;
                self.locked = true;
            }
            _ => {}
        }
        self.view_timeout = 0;
    }

    /// Forces `view` onto the display, locked, with a fresh window. Used by
    /// the serial protocol, which switches unconditionally.
    pub fn select_view(&mut self, view: View) {
        self.view = view;
        self.locked = true;
        self.view_timeout = 0;
    }

    /// Coarse time-of-day stamp for the receive watchdog.
    ///
    /// `seconds + minutes * 60 + hours * 360`; the hour weight is not 3600,
    /// so this is not elapsed seconds, but it moves forward monotonically
    /// within an hour, which is all the 2 s idle window needs.
    pub fn timestamp(&self) -> i32 {
        self.seconds as i32 + self.minutes as i32 * 60 + self.hours as i32 * 360
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(t: &ClockTime) -> bool {
        t.seconds <= 59
            && t.minutes <= 59
            && t.hours <= 23
            && (1..=31).contains(&t.days)
            && (1..=12).contains(&t.months)
            && t.years >= YEAR_MIN
    }

    #[test]
    fn sixty_second_ticks_equal_one_minute() {
        for start_second in 0..60u8 {
            let mut by_seconds = ClockTime::boot();
            by_seconds.seconds = start_second;
            let mut by_minutes = by_seconds;

            for _ in 0..60 {
                by_seconds.advance(1, Field::Seconds, false);
            }
            by_minutes.advance(1, Field::Minutes, false);

            assert_eq!(by_seconds.seconds, by_minutes.seconds);
            assert_eq!(by_seconds.minutes, by_minutes.minutes);
            assert_eq!(by_seconds.hours, by_minutes.hours);
        }
    }

    #[test]
    fn fields_stay_in_range_over_mixed_deltas() {
        let mut t = ClockTime::boot();
        let fields = [
            Field::Seconds,
            Field::Minutes,
            Field::Hours,
            Field::Days,
            Field::Months,
            Field::Years,
        ];
        for i in 0..10_000 {
            let field = fields[i % fields.len()];
            let delta = if i % 3 == 0 { -1 } else { 1 };
            t.advance(delta, field, i % 7 == 0);
            assert!(in_range(&t), "out of range after step {i}: {t:?}");
        }
    }

    #[test]
    fn midnight_rollover_carries_into_the_date() {
        let mut t = ClockTime::boot();
        t.seconds = 59;
        t.minutes = 59;
        t.hours = 23;
        t.advance(1, Field::Seconds, false);
        assert_eq!((t.seconds, t.minutes, t.hours), (0, 0, 0));
        assert_eq!((t.days, t.months, t.years), (1, 1, 2018));
    }

    #[test]
    fn time_only_suppresses_the_day_carry() {
        let mut t = ClockTime::boot();
        t.minutes = 59;
        t.hours = 23;
        t.advance(1, Field::Minutes, true);
        assert_eq!((t.minutes, t.hours), (0, 0));
        assert_eq!((t.days, t.months, t.years), (31, 12, 2017));

        let mut t = ClockTime::boot();
        t.minutes = 0;
        t.hours = 0;
        t.advance(-1, Field::Minutes, true);
        assert_eq!((t.minutes, t.hours), (59, 23));
        assert_eq!((t.days, t.months, t.years), (31, 12, 2017));
    }

    #[test]
    fn day_borrow_takes_the_new_months_length() {
        let mut t = ClockTime::boot();
        t.days = 1;
        t.months = 1;
        t.years = 2018;
        t.advance(-1, Field::Days, false);
        assert_eq!((t.days, t.months, t.years), (31, 12, 2017));

        // March 1st steps back onto the quadrennial February 29th.
        let mut t = ClockTime::boot();
        t.days = 1;
        t.months = 3;
        t.years = 2020;
        t.advance(-1, Field::Days, false);
        assert_eq!((t.days, t.months), (29, 2));
    }

    #[test]
    fn year_clamps_at_the_floor() {
        let mut t = ClockTime::boot();
        t.years = 2000;
        t.advance(-1, Field::Years, false);
        assert_eq!(t.years, 2000);

        let mut t = ClockTime::boot();
        t.days = 1;
        t.months = 1;
        t.years = 2000;
        t.advance(-1, Field::Days, false);
        assert_eq!(t.years, 2000);
    }

    #[test]
    fn february_follows_the_divisible_by_four_rule() {
        for year in 2000..2100 {
            let expected = if year % 4 == 0 { 29 } else { 28 };
            assert_eq!(days_in_month(2, year), expected, "year {year}");
        }
        // 2100 is not a leap year in the Gregorian calendar; this clock
        // disagrees on purpose.
        assert_eq!(days_in_month(2, 2100), 29);
    }

    #[test]
    fn month_lengths_match_the_table() {
        let lengths = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (month0, expected) in lengths.iter().enumerate() {
            assert_eq!(days_in_month(month0 as u8 + 1, 2001), *expected);
        }
    }

    #[test]
    fn time_view_rotates_after_its_window() {
        let mut t = ClockTime::boot();
        for _ in 0..SHOW_TIME_SECS {
            t.tick_views();
            assert_eq!(t.view, View::Time);
        }
        t.tick_views();
        assert_eq!(t.view, View::Date);
        assert!(t.locked);
        assert_eq!(t.view_timeout, 0);

        // Locked date view ages but never switches.
        for _ in 0..SHOW_DATE_SECS + 5 {
            t.tick_views();
        }
        assert_eq!(t.view, View::Date);

        t.locked = false;
        t.tick_views();
        assert_eq!(t.view, View::Time);
        assert!(t.locked);
    }

    #[test]
    fn user_view_reverts_to_time() {
        let mut t = ClockTime::boot();
        t.select_view(View::UserData);
        t.locked = false; // as the animation engine does when the roll lands
        for _ in 0..SHOW_USER_SECS {
            t.tick_views();
        }
        assert_eq!(t.view, View::UserData);
        t.tick_views();
        assert_eq!(t.view, View::Time);
    }

    #[test]
    fn toggle_ignores_locked_views() {
        let mut t = ClockTime::boot();
        t.toggle_view();
        assert_eq!(t.view, View::Date);
        assert!(t.locked);

        t.view_timeout = 7;
        t.toggle_view();
        assert_eq!(t.view, View::Date);
        assert_eq!(t.view_timeout, 0);

        t.locked = false;
        t.toggle_view();
        assert_eq!(t.view, View::Time);
    }

    #[test]
    fn timestamp_uses_the_coarse_hour_weight() {
        let mut t = ClockTime::boot();
        t.hours = 2;
        t.minutes = 3;
        t.seconds = 4;
        assert_eq!(t.timestamp(), 4 + 3 * 60 + 2 * 360);
    }
}
