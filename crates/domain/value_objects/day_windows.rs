use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Half-open `[from, to)` range covering one calendar day in the scheduler's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub day_offset: u32,
}

impl DayWindow {
    /// Window for the local day `day_offset` days after the day containing `now`.
    /// Offset 0 is "today" and starts at `now`: whatever lapsed earlier today is overdue,
    /// not expiring.
    pub fn for_offset(now: DateTime<Utc>, tz: Tz, day_offset: u32) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let day = today
            .checked_add_days(Days::new(u64::from(day_offset)))
            .unwrap_or(today);
        let next = day.checked_add_days(Days::new(1)).unwrap_or(day);

        let midnight = local_midnight(tz, day);
        let from = if day_offset == 0 {
            midnight.max(now)
        } else {
            midnight
        };

        Self {
            from,
            to: local_midnight(tz, next),
            day_offset,
        }
    }
}

fn local_midnight(tz: Tz, day: chrono::NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    // Zones with a DST jump at midnight have no 00:00; fall back to the UTC reading.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn today_window_runs_from_now_to_local_midnight() {
        // 2026-03-10 21:30 UTC is already 2026-03-11 00:30 in Moscow (UTC+3).
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 21, 30, 0).unwrap();
        let window = DayWindow::for_offset(now, chrono_tz::Europe::Moscow, 0);

        assert_eq!(window.from, now);
        assert_eq!(window.to, Utc.with_ymd_and_hms(2026, 3, 11, 21, 0, 0).unwrap());
    }

    #[test]
    fn today_window_excludes_what_lapsed_this_morning() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        let lapsed_at_eight = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let window = DayWindow::for_offset(now, chrono_tz::UTC, 0);

        assert!(lapsed_at_eight < window.from);
        assert_eq!(window.to, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn later_offsets_cover_whole_local_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let in_three = DayWindow::for_offset(now, chrono_tz::UTC, 3);

        assert_eq!(in_three.from, Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap());
        assert_eq!(in_three.to, in_three.from + Duration::days(1));
        assert_eq!(in_three.day_offset, 3);
    }
}
