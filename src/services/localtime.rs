use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Facility-local calendar math over a fixed UTC offset. All stored
/// timestamps are UTC; the offset only decides where calendar days and
/// months begin.
#[derive(Debug, Clone, Copy)]
pub struct LocalTime {
    offset: FixedOffset,
}

impl LocalTime {
    pub fn from_offset_hours(hours: i32) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid timezone offset: {hours}h"))?;
        Ok(Self { offset })
    }

    /// The local calendar day containing the given instant.
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// UTC half-open interval [start, end) covering one local day.
    pub fn day_bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let shift = Duration::seconds(self.offset.local_minus_utc() as i64);
        let start = Utc.from_utc_datetime(&(day.and_time(NaiveTime::MIN) - shift));
        (start, start + Duration::days(1))
    }

    /// UTC interval [start, end) covering the local month of `at`, plus
    /// a human label like "March 2026".
    pub fn month_bounds(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>, String) {
        let today = self.local_day(at);
        let first = today
            .with_day(1)
            .expect("day 1 exists in every month");
        let next_first = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .expect("day 1 exists in every month");

        let (start, _) = self.day_bounds(first);
        let (end, _) = self.day_bounds(next_first);
        (start, end, first.format("%B %Y").to_string())
    }

    /// Human-formatted local timestamp for notifications.
    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d.%m.%Y %H:%M")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tashkent() -> LocalTime {
        LocalTime::from_offset_hours(5).unwrap()
    }

    #[test]
    fn local_day_shifts_across_midnight() {
        let lt = tashkent();
        // 22:30 UTC is 03:30 next day in UTC+5
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(lt.local_day(at), NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let lt = tashkent();
        let day = NaiveDate::from_ymd_opt(2026, 3, 11).unwrap();
        let (start, end) = lt.day_bounds(day);
        // local midnight is 19:00 UTC the previous day
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 10, 19, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn instant_falls_within_its_own_day_bounds() {
        let lt = tashkent();
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 22, 30, 0).unwrap();
        let (start, end) = lt.day_bounds(lt.local_day(at));
        assert!(start <= at && at < end);
    }

    #[test]
    fn month_bounds_wrap_december() {
        let lt = tashkent();
        let at = Utc.with_ymd_and_hms(2026, 12, 15, 12, 0, 0).unwrap();
        let (start, end, label) = lt.month_bounds(at);
        assert_eq!(label, "December 2026");
        assert!(start < end);
        assert_eq!(lt.local_day(end), NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
    }

    #[test]
    fn format_is_local() {
        let lt = tashkent();
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(lt.format(at), "11.03.2026 03:30");
    }
}
