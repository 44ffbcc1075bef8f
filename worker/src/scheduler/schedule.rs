use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::time::Duration as StdDuration;

/// Inclusive range of local hours, e.g. `10..=21`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start <= end && end < 24).then_some(Self { start, end })
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start..=self.end).contains(&hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval between tick starts.
    Every(StdDuration),
    /// Once a day at `hour:00` local time.
    DailyAt { hour: u32 },
    /// At the top of every local hour inside the window.
    HourlyWithin(HourWindow),
}

impl Schedule {
    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        match *self {
            Schedule::Every(interval) => {
                now + Duration::from_std(interval).unwrap_or_else(|_| Duration::seconds(1))
            }
            Schedule::DailyAt { hour } => next_matching_hour(now, tz, |h| h == hour),
            Schedule::HourlyWithin(window) => next_matching_hour(now, tz, |h| window.contains(h)),
        }
    }
}

fn next_matching_hour(now: DateTime<Utc>, tz: Tz, matches: impl Fn(u32) -> bool) -> DateTime<Utc> {
    let local = now.with_timezone(&tz).naive_local();
    let mut candidate = top_of_hour(local);

    // Two days of hours always contain a match unless the predicate never holds.
    for _ in 0..48 {
        candidate += Duration::hours(1);
        if !matches(candidate.hour()) {
            continue;
        }
        // Hours skipped by a DST jump have no local instant.
        if let Some(at) = tz.from_local_datetime(&candidate).earliest() {
            let at = at.with_timezone(&Utc);
            if at > now {
                return at;
            }
        }
    }

    now + Duration::hours(1)
}

fn top_of_hour(local: NaiveDateTime) -> NaiveDateTime {
    local
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Moscow;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn every_adds_interval() {
        let now = utc(2026, 1, 1, 0, 0);
        let next = Schedule::Every(StdDuration::from_secs(30)).next_after(now, Moscow);
        assert_eq!(next, now + Duration::seconds(30));
    }

    #[test]
    fn daily_fires_later_today_when_hour_not_reached() {
        // 06:15 Moscow
        let now = utc(2026, 1, 1, 3, 15);
        let next = Schedule::DailyAt { hour: 10 }.next_after(now, Moscow);
        assert_eq!(next, utc(2026, 1, 1, 7, 0));
    }

    #[test]
    fn daily_fires_tomorrow_once_hour_passed() {
        // exactly 10:00 Moscow; strictly-after means tomorrow
        let now = utc(2026, 1, 1, 7, 0);
        let next = Schedule::DailyAt { hour: 10 }.next_after(now, Moscow);
        assert_eq!(next, utc(2026, 1, 2, 7, 0));
    }

    #[test]
    fn hourly_within_skips_night_hours() {
        let window = HourWindow::new(10, 21).unwrap();
        // 21:30 Moscow: next slot is 10:00 tomorrow
        let now = utc(2026, 1, 1, 18, 30);
        let next = Schedule::HourlyWithin(window).next_after(now, Moscow);
        assert_eq!(next, utc(2026, 1, 2, 7, 0));

        // 12:05 Moscow: next slot is 13:00
        let now = utc(2026, 1, 1, 9, 5);
        let next = Schedule::HourlyWithin(window).next_after(now, Moscow);
        assert_eq!(next, utc(2026, 1, 1, 10, 0));
    }

    #[test]
    fn hour_window_validates_bounds() {
        assert!(HourWindow::new(22, 8).is_none());
        assert!(HourWindow::new(0, 24).is_none());
        assert!(HourWindow::new(0, 23).unwrap().contains(23));
    }
}
