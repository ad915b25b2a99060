use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const TICKS_PER_SECOND: u64 = 60_750_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayTime {
    pub hours: u64,
    pub minutes: u8,
    pub seconds: u8,
}

impl PlayTime {
    /// Whole seconds only; sub-second ticks are dropped.
    pub fn from_ticks(ticks: u64) -> Self {
        let total = ticks / TICKS_PER_SECOND;
        Self {
            hours: total / 3600,
            minutes: (total / 60 % 60) as u8,
            seconds: (total % 60) as u8,
        }
    }

    pub fn to_ticks(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(u64::from(self.minutes) * 60 + u64::from(self.seconds))
            .saturating_mul(TICKS_PER_SECOND)
    }
}

impl fmt::Display for PlayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Save times count from 2000-01-01 00:00:00.
pub fn save_time_from_ticks(ticks: u64) -> Option<NaiveDateTime> {
    let secs = i64::try_from(ticks / TICKS_PER_SECOND).ok()?;
    let nanos = (ticks % TICKS_PER_SECOND) * NANOS_PER_SECOND / TICKS_PER_SECOND;
    let delta = Duration::seconds(secs) + Duration::nanoseconds(nanos as i64);
    epoch()?.checked_add_signed(delta)
}

/// `None` for instants before the console epoch.
pub fn ticks_from_save_time(at: NaiveDateTime) -> Option<u64> {
    let delta = at.signed_duration_since(epoch()?);
    let secs = u64::try_from(delta.num_seconds()).ok()?;
    let rest = delta - Duration::seconds(delta.num_seconds());
    let nanos = u64::try_from(rest.num_nanoseconds()?).ok()?;
    secs.checked_mul(TICKS_PER_SECOND)?
        .checked_add(nanos * TICKS_PER_SECOND / NANOS_PER_SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_time_splits_hours_minutes_seconds() {
        let ticks = (2 * 3600 + 5 * 60 + 9) * TICKS_PER_SECOND + 123;
        let time = PlayTime::from_ticks(ticks);
        assert_eq!(
            time,
            PlayTime {
                hours: 2,
                minutes: 5,
                seconds: 9
            }
        );
        assert_eq!(time.to_string(), "2:05:09");
        assert_eq!(time.to_ticks(), ticks - 123);
    }

    #[test]
    fn huge_play_time_saturates() {
        let time = PlayTime {
            hours: u64::MAX / 1000,
            minutes: 59,
            seconds: 59,
        };
        assert_eq!(time.to_ticks(), u64::MAX);
    }

    #[test]
    fn zero_ticks_is_console_epoch() {
        let at = save_time_from_ticks(0).expect("epoch");
        assert_eq!(at.to_string(), "2000-01-01 00:00:00");
    }

    #[test]
    fn save_time_round_trips_whole_seconds() {
        let at = NaiveDate::from_ymd_opt(2011, 11, 20)
            .and_then(|d| d.and_hms_opt(18, 30, 5))
            .expect("date");
        let ticks = ticks_from_save_time(at).expect("ticks");
        assert_eq!(ticks % TICKS_PER_SECOND, 0);
        assert_eq!(save_time_from_ticks(ticks), Some(at));
    }

    #[test]
    fn instants_before_epoch_have_no_ticks() {
        let at = NaiveDate::from_ymd_opt(1999, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .expect("date");
        assert_eq!(ticks_from_save_time(at), None);
    }
}
