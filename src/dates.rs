//! Review windows
//!
//! A review scope (`today`, `yesterday`, `weekly`, `monthly`) and a reference
//! instant resolve to an inclusive range of calendar days. Every scope also has
//! a comparison window: the period of matching length right before it, used for
//! week-over-week and month-over-month deltas.
//!
//! The reference instant is truncated to its local calendar day before any
//! arithmetic, so callers can pass `Utc::now().with_timezone(&tz)` directly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-selectable review period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Today,
    Yesterday,
    Weekly,
    Monthly,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Today, Scope::Yesterday, Scope::Weekly, Scope::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown review scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => Err(UnknownScope(s.to_string())),
        }
    }
}

/// Inclusive range of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    start: NaiveDate,
    end: NaiveDate,
}

impl Window {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Single-day window.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Display form used in the review header, e.g. `2024-03-04 ~ 2024-03-10`.
    pub fn label(&self) -> String {
        format!(
            "{} ~ {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Current window and its comparison window for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodWindows {
    pub current: Window,
    pub previous: Window,
}

/// Truncate an instant to the calendar day of its own zone.
pub fn normalize<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.date_naive()
}

/// ISO day of week: Monday = 1 ... Sunday = 7.
///
/// Both the weekly window and the weekly target multiplier go through here so
/// a Sunday is always the last day of its week, never the first.
pub fn iso_weekday(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Current window for `scope`, with `today` already normalized.
pub fn window_for_day(scope: Scope, today: NaiveDate) -> Window {
    match scope {
        Scope::Today => Window::day(today),
        Scope::Yesterday => Window::day(days_before(today, 1)),
        Scope::Weekly => Window {
            start: days_before(today, u64::from(iso_weekday(today) - 1)),
            end: today,
        },
        Scope::Monthly => Window {
            start: first_of_month(today),
            end: today,
        },
    }
}

/// Comparison window for `scope`, with `today` already normalized.
///
/// - weekly: the full Monday–Sunday week before the current one
/// - monthly: the whole previous calendar month
/// - today / yesterday: the single day before the current window
pub fn comparison_for_day(scope: Scope, today: NaiveDate) -> Window {
    let current = window_for_day(scope, today);
    match scope {
        Scope::Today | Scope::Yesterday => Window::day(days_before(current.start, 1)),
        Scope::Weekly => Window {
            start: days_before(current.start, 7),
            end: days_before(current.start, 1),
        },
        Scope::Monthly => {
            let prev_end = days_before(current.start, 1);
            Window {
                start: first_of_month(prev_end),
                end: prev_end,
            }
        }
    }
}

pub fn period_windows_for_day(scope: Scope, today: NaiveDate) -> PeriodWindows {
    PeriodWindows {
        current: window_for_day(scope, today),
        previous: comparison_for_day(scope, today),
    }
}

/// How many daily targets fit into the period so far.
///
/// 1 for single-day scopes, the ISO weekday for `weekly` (days into the week),
/// the day of month for `monthly`.
pub fn target_multiplier_for_day(scope: Scope, today: NaiveDate) -> u32 {
    match scope {
        Scope::Today | Scope::Yesterday => 1,
        Scope::Weekly => iso_weekday(today),
        Scope::Monthly => today.day(),
    }
}

pub fn resolve_window<Tz: TimeZone>(scope: Scope, now: &DateTime<Tz>) -> Window {
    window_for_day(scope, normalize(now))
}

pub fn resolve_comparison_window<Tz: TimeZone>(scope: Scope, now: &DateTime<Tz>) -> Window {
    comparison_for_day(scope, normalize(now))
}

pub fn target_multiplier<Tz: TimeZone>(scope: Scope, now: &DateTime<Tz>) -> u32 {
    target_multiplier_for_day(scope, normalize(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Utc, Weekday};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("weekly".parse::<Scope>(), Ok(Scope::Weekly));
        assert_eq!(" Monthly ".parse::<Scope>(), Ok(Scope::Monthly));
        assert_eq!("month".parse::<Scope>(), Ok(Scope::Monthly));
        assert!("fortnight".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Scope::Yesterday).unwrap(), "\"yesterday\"");
        let scope: Scope = serde_json::from_str("\"today\"").unwrap();
        assert_eq!(scope, Scope::Today);
    }

    #[test]
    fn test_window_new_rejects_inverted() {
        assert!(Window::new(d(2024, 3, 5), d(2024, 3, 1)).is_none());
        let w = Window::new(d(2024, 3, 1), d(2024, 3, 5)).unwrap();
        assert!(w.contains(d(2024, 3, 1)));
        assert!(w.contains(d(2024, 3, 5)));
        assert!(!w.contains(d(2024, 3, 6)));
        assert_eq!(w.len_days(), 5);
    }

    #[test]
    fn test_window_label() {
        let w = Window::new(d(2024, 3, 4), d(2024, 3, 10)).unwrap();
        assert_eq!(w.label(), "2024-03-04 ~ 2024-03-10");
    }

    #[test]
    fn test_today_window_is_normalized_now() {
        let now = chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2024, 3, 7, 23, 59, 30)
            .unwrap();
        let w = resolve_window(Scope::Today, &now);
        assert_eq!(w.start(), d(2024, 3, 7));
        assert_eq!(w.end(), d(2024, 3, 7));
    }

    #[test]
    fn test_normalize_uses_zone_of_instant() {
        // 20:00 UTC on a Sunday is already Monday in Shanghai.
        let utc = Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap();
        let local = utc.with_timezone(&chrono_tz::Asia::Shanghai);
        assert_eq!(resolve_window(Scope::Weekly, &utc).start(), d(2024, 3, 4));
        assert_eq!(resolve_window(Scope::Weekly, &local).start(), d(2024, 3, 11));
    }

    #[test]
    fn test_yesterday_window() {
        let w = window_for_day(Scope::Yesterday, d(2024, 3, 1));
        assert_eq!(w, Window::day(d(2024, 2, 29)));
    }

    #[test]
    fn test_weekly_on_sunday_starts_same_week_monday() {
        let sunday = d(2024, 3, 10);
        assert_eq!(sunday.weekday(), Weekday::Sun);

        let w = window_for_day(Scope::Weekly, sunday);
        assert_eq!(w.start(), d(2024, 3, 4));
        assert_eq!(w.start().weekday(), Weekday::Mon);
        assert_eq!(w.end(), sunday);
        assert_eq!(w.len_days(), 7);
    }

    #[test]
    fn test_weekly_on_monday_is_single_day() {
        let w = window_for_day(Scope::Weekly, d(2024, 3, 4));
        assert_eq!(w, Window::day(d(2024, 3, 4)));
    }

    #[test]
    fn test_weekly_comparison_is_previous_full_week() {
        let today = d(2024, 3, 7);
        let current = window_for_day(Scope::Weekly, today);
        let prev = comparison_for_day(Scope::Weekly, today);
        assert_eq!(prev.start(), d(2024, 2, 26));
        assert_eq!(prev.end(), d(2024, 3, 3));
        assert_eq!(prev.len_days(), 7);
        assert_eq!(prev.end().succ_opt().unwrap(), current.start());
    }

    #[test]
    fn test_monthly_window_and_comparison() {
        let today = d(2024, 3, 15);
        assert_eq!(
            window_for_day(Scope::Monthly, today),
            Window::new(d(2024, 3, 1), today).unwrap()
        );
        // Leap-year February.
        assert_eq!(
            comparison_for_day(Scope::Monthly, today),
            Window::new(d(2024, 2, 1), d(2024, 2, 29)).unwrap()
        );
    }

    #[test]
    fn test_monthly_comparison_rolls_back_to_december() {
        let prev = comparison_for_day(Scope::Monthly, d(2025, 1, 20));
        assert_eq!(prev.start(), d(2024, 12, 1));
        assert_eq!(prev.end(), d(2024, 12, 31));
        assert!(prev.start().year() == 2024 && prev.start().month() == 12);
        assert!(prev.end().year() == 2024 && prev.end().month() == 12);
    }

    #[test]
    fn test_day_scopes_compare_with_previous_day() {
        let today = d(2024, 3, 1);
        assert_eq!(comparison_for_day(Scope::Today, today), Window::day(d(2024, 2, 29)));
        assert_eq!(comparison_for_day(Scope::Yesterday, today), Window::day(d(2024, 2, 28)));
    }

    #[test]
    fn test_windows_are_ordered_and_comparison_precedes_current() {
        let mut day = d(2023, 11, 1);
        while day <= d(2025, 3, 31) {
            for scope in Scope::ALL {
                let PeriodWindows { current, previous } = period_windows_for_day(scope, day);
                assert!(current.start() <= current.end(), "{scope} {day}");
                assert!(previous.start() <= previous.end(), "{scope} {day}");
                assert!(previous.end() < current.start(), "{scope} {day}");
                assert_eq!(
                    previous.end().succ_opt().unwrap(),
                    current.start(),
                    "{scope} {day}"
                );
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_target_multiplier() {
        let sunday = d(2024, 3, 10);
        assert_eq!(target_multiplier_for_day(Scope::Today, sunday), 1);
        assert_eq!(target_multiplier_for_day(Scope::Yesterday, sunday), 1);
        assert_eq!(target_multiplier_for_day(Scope::Weekly, sunday), 7);
        assert_eq!(target_multiplier_for_day(Scope::Weekly, d(2024, 3, 4)), 1);
        assert_eq!(target_multiplier_for_day(Scope::Monthly, sunday), 10);
    }

    #[test]
    fn test_weekly_multiplier_matches_window_length() {
        let mut day = d(2024, 1, 1);
        for _ in 0..28 {
            let w = window_for_day(Scope::Weekly, day);
            assert_eq!(
                i64::from(target_multiplier_for_day(Scope::Weekly, day)),
                w.len_days()
            );
            let m = window_for_day(Scope::Monthly, day);
            assert_eq!(
                i64::from(target_multiplier_for_day(Scope::Monthly, day)),
                m.len_days()
            );
            day = day.succ_opt().unwrap();
        }
    }
}
