use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::cookies::{suppression_key, CookieJar, SUPPRESSED_VALUE};
use crate::models::PopupConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    OutsideDisplayPeriod,
    SuppressedToday,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Self::Eligible
    }
}

/// Parse a calendar date. Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`
/// and RFC 3339 timestamps (date part only).
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Local).date_naive())
        })
}

/// Whether `now` lies in `[start 00:00:00.000, end 23:59:59.999]`, local time.
///
/// The window only applies when both bounds are given. If either bound does
/// not parse, the popup is treated as unrestricted.
pub fn is_within_display_period(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Local>,
) -> bool {
    let (Some(start), Some(end)) = (start, end) else {
        return true;
    };
    let (Some(start), Some(end)) = (parse_calendar_date(start), parse_calendar_date(end)) else {
        tracing::debug!(start, end, "unparseable display period, not restricting");
        return true;
    };
    let Some(end_of_day) = NaiveTime::from_hms_milli_opt(23, 59, 59, 999) else {
        return true;
    };
    let from = start.and_time(NaiveTime::MIN);
    let until = NaiveDateTime::new(end, end_of_day);
    let now = now.naive_local();
    from <= now && now <= until
}

/// Decide whether a popup should be created at all. Runs before any
/// element is built so an ineligible popup never flashes on screen.
pub fn check(config: &PopupConfig, cookies: &CookieJar, now: DateTime<Local>) -> Eligibility {
    if !is_within_display_period(
        config.start_date.as_deref(),
        config.end_date.as_deref(),
        now,
    ) {
        return Eligibility::OutsideDisplayPeriod;
    }

    if let Some(id) = config.popup_id.as_deref().filter(|_| config.can_suppress()) {
        let key = suppression_key(id);
        if cookies.get(&key, now.with_timezone(&Utc)) == Some(SUPPRESSED_VALUE) {
            return Eligibility::SuppressedToday;
        }
    }

    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn inside_outside_and_boundaries() {
        let start = Some("2024-03-01");
        let end = Some("2024-03-31");
        assert!(is_within_display_period(start, end, at(2024, 3, 15, 12, 0, 0)));
        assert!(is_within_display_period(start, end, at(2024, 3, 1, 0, 0, 0)));
        assert!(is_within_display_period(start, end, at(2024, 3, 31, 23, 59, 59)));
        assert!(!is_within_display_period(start, end, at(2024, 2, 29, 23, 59, 59)));
        assert!(!is_within_display_period(start, end, at(2024, 4, 1, 0, 0, 0)));
    }

    #[test]
    fn single_day_window() {
        let day = Some("2024-05-05");
        assert!(is_within_display_period(day, day, at(2024, 5, 5, 18, 30, 0)));
        assert!(!is_within_display_period(day, day, at(2024, 5, 6, 0, 0, 0)));
    }

    #[test]
    fn missing_or_invalid_dates_do_not_restrict() {
        let now = at(2030, 1, 1, 0, 0, 0);
        assert!(is_within_display_period(None, Some("2024-01-01"), now));
        assert!(is_within_display_period(Some("2024-01-01"), None, now));
        assert!(is_within_display_period(Some("not a date"), Some("2024-01-01"), now));
        assert!(is_within_display_period(Some("2024-01-01"), Some("2024-13-40"), now));
    }

    #[test]
    fn alternate_date_formats() {
        assert_eq!(parse_calendar_date("2024/12/31"), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(parse_calendar_date("2024.01.02"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_calendar_date(" 2024-07-04 "), NaiveDate::from_ymd_opt(2024, 7, 4));
        assert!(parse_calendar_date("2024-07-04T10:00:00+00:00").is_some());
        assert_eq!(parse_calendar_date("July 4th"), None);
    }

    #[test]
    fn suppression_requires_id_option_and_cookie() {
        let now = at(2025, 6, 1, 9, 0, 0);
        let mut jar = CookieJar::in_memory();
        jar.set("popup_promo1", SUPPRESSED_VALUE, 1, now).unwrap();

        let mut config = PopupConfig {
            popup_id: Some("promo1".into()),
            show_today_option: true,
            ..Default::default()
        };
        assert_eq!(check(&config, &jar, now), Eligibility::SuppressedToday);

        config.show_today_option = false;
        assert_eq!(check(&config, &jar, now), Eligibility::Eligible);

        config.show_today_option = true;
        config.popup_id = Some("promo2".into());
        assert_eq!(check(&config, &jar, now), Eligibility::Eligible);
    }

    #[test]
    fn date_window_checked_before_suppression() {
        let now = at(2025, 6, 1, 9, 0, 0);
        let config = PopupConfig {
            start_date: Some("2025-07-01".into()),
            end_date: Some("2025-07-31".into()),
            ..Default::default()
        };
        assert_eq!(
            check(&config, &CookieJar::in_memory(), now),
            Eligibility::OutsideDisplayPeriod
        );
    }
}
