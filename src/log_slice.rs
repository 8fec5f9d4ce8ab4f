//! History log slicing
//!
//! The persisted history is a flat text log, one entry per line, where a line
//! is "dated" when it carries a `YYYY-M-D` … `YYYY-MM-DD` token. Slicing keeps
//! the dated lines that fall inside a window, in their original order and with
//! their original content, and bounds the result so it can be pasted into a
//! prompt.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::dates::{period_windows_for_day, Scope, Window};

/// Upper bound on the characters handed to a prompt.
pub const MAX_CONTEXT_CHARS: usize = 50_000;

fn re_date_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})").unwrap())
}

/// Calendar date named by the first date token in `line`.
///
/// Only the first token counts. A token that does not name a real day
/// (`2024-13-45`, `2023-2-29`) makes the line undated instead of rolling over
/// into a neighbouring month.
pub fn extract_date(line: &str) -> Option<NaiveDate> {
    let caps = re_date_token().captures(line)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Dated lines of `log` inside `window`, in log order.
pub fn slice_lines<'a>(log: &'a str, window: &Window) -> Vec<&'a str> {
    log.split('\n')
        .filter(|line| extract_date(line).is_some_and(|date| window.contains(date)))
        .collect()
}

/// Dated lines inside `window`, newline-joined and cut to [`MAX_CONTEXT_CHARS`].
pub fn slice_by_window(log: &str, window: &Window) -> String {
    slice_with_limit(log, window, MAX_CONTEXT_CHARS)
}

/// Same as [`slice_by_window`] with an explicit character budget.
///
/// The cut happens after joining and may land mid-line. Slicing is only
/// idempotent while the output fits the budget: when the cut splits the last
/// line's date token, slicing the result again drops that partial line.
pub fn slice_with_limit(log: &str, window: &Window, limit: usize) -> String {
    truncate_chars(slice_lines(log, window).join("\n"), limit)
}

fn truncate_chars(mut text: String, limit: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(limit) {
        log::debug!(
            "Truncating sliced history from {} to {} bytes ({} chars)",
            text.len(),
            byte_idx,
            limit
        );
        text.truncate(byte_idx);
    }
    text
}

/// Log slices for a review: the current period and its comparison period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodContext {
    pub scope: Scope,
    pub current_window: Window,
    pub previous_window: Window,
    pub current: String,
    pub previous: String,
}

pub fn period_context(log: &str, scope: Scope, today: NaiveDate, limit: usize) -> PeriodContext {
    let windows = period_windows_for_day(scope, today);
    PeriodContext {
        scope,
        current_window: windows.current,
        previous_window: windows.previous,
        current: slice_with_limit(log, &windows.current, limit),
        previous: slice_with_limit(log, &windows.previous, limit),
    }
}
