use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Stockholm;

/// Decides what "today" is. Every observer shares one zone so they all agree
/// on the day key regardless of where their device is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayClock {
    tz: Tz,
}

impl DayClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA zone name such as `Europe/Stockholm`.
    pub fn from_name(name: &str) -> Option<Self> {
        name.trim().parse::<Tz>().ok().map(Self::new)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// `YYYY-MM-DD` of `now` in the clock's zone.
    pub fn day_key(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz).format("%Y-%m-%d").to_string()
    }

    /// Long form for page headers, e.g. `Sunday 18 October 2026`.
    pub fn pretty_date(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz).format("%A %-d %B %Y").to_string()
    }
}

impl Default for DayClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_key_follows_stockholm_not_utc() {
        let clock = DayClock::default();
        // 23:30 UTC on Jan 1 is already Jan 2 in Stockholm (UTC+1)
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        assert_eq!(clock.day_key(late), "2024-01-02");

        // summer time, UTC+2
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 21, 59, 0).unwrap();
        assert_eq!(clock.day_key(summer), "2024-07-01");
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 22, 0, 0).unwrap();
        assert_eq!(clock.day_key(summer), "2024-07-02");
    }

    #[test]
    fn pretty_date_is_long_form() {
        let clock = DayClock::default();
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        assert_eq!(clock.pretty_date(now), "Sunday 18 October 2026");
    }

    #[test]
    fn zone_names_parse() {
        assert_eq!(DayClock::from_name("Europe/Stockholm"), Some(DayClock::default()));
        assert!(DayClock::from_name("Mars/Olympus").is_none());
    }
}
