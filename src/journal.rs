//! Journal ingestion and archiving
//!
//! Raw pasted notes go through two steps before they reach the history log:
//!
//! 1. [`parse_raw_input`] splits the paste into items, cleans each line into a
//!    description and guesses a category, preferring what the user taught us
//!    earlier (the category map). Descriptions we have never seen are queued
//!    for review.
//! 2. [`archive`] applies the reviewed categories, learns them, drops anything
//!    marked as trash and appends `[TAG] line` entries to the history.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates::Window;
use crate::log_slice::extract_date;

/// Activity category. `Trash` marks a line to be discarded on archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Study,
    Rest,
    Sleep,
    Life,
    Entertainment,
    Trash,
}

impl Category {
    /// Categories that count towards daily allocations.
    pub const TRACKED: [Category; 6] = [
        Category::Work,
        Category::Study,
        Category::Rest,
        Category::Sleep,
        Category::Life,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Study => "study",
            Self::Rest => "rest",
            Self::Sleep => "sleep",
            Self::Life => "life",
            Self::Entertainment => "entertainment",
            Self::Trash => "trash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Work => "工作",
            Self::Study => "学习",
            Self::Rest => "休息",
            Self::Sleep => "睡眠",
            Self::Life => "生活",
            Self::Entertainment => "娱乐",
            Self::Trash => "作废",
        }
    }

    /// Prefix written in front of archived lines, e.g. `[WORK]`.
    pub fn tag(&self) -> String {
        format!("[{}]", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Self::Work),
            "study" => Ok(Self::Study),
            "rest" => Ok(Self::Rest),
            "sleep" => Ok(Self::Sleep),
            "life" => Ok(Self::Life),
            "entertainment" => Ok(Self::Entertainment),
            "trash" => Ok(Self::Trash),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

/// Learned description → category assignments.
pub type CategoryMap = BTreeMap<String, Category>;

// Compile-once regex patterns via OnceLock.
fn re_dates() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([0-9]{4}-[0-9]{2}-[0-9]{2}[T\s][0-9]{2}:[0-9]{2}:[0-9]{2}(?:\+[0-9]{2}:[0-9]{2})?)|([0-9]{4}-[0-9]{1,2}-[0-9]{1,2})",
        )
        .unwrap()
    })
}

fn re_emoji() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{Emoji_Presentation}\p{Extended_Pictographic}]").unwrap())
}

fn re_symbols() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[｜|\[\]()【】]").unwrap())
}

/// Strip dates, timestamps, emoji and bracket/pipe symbols from a line.
///
/// The result is the key used in the category map.
pub fn clean_description(line: &str) -> String {
    let text = re_dates().replace_all(line, "");
    let text = re_emoji().replace_all(&text, "");
    let text = re_symbols().replace_all(&text, "");
    text.trim().to_string()
}

/// Keyword heuristic used when the category map has no entry.
pub fn guess_category(line: &str) -> Category {
    let has = |words: &[&str]| words.iter().any(|w| line.contains(w));
    if has(&["工作", "会议", "work"]) {
        Category::Work
    } else if has(&["学习", "study", "阅读"]) {
        Category::Study
    } else if has(&["睡觉", "sleep"]) {
        Category::Sleep
    } else if has(&["休息", "rest"]) {
        Category::Rest
    } else if has(&["游戏", "娱乐"]) {
        Category::Entertainment
    } else {
        Category::Life
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalItem {
    pub original: String,
    pub date: NaiveDate,
    pub desc: String,
    pub category: Category,
    /// Whether `original` carries its own date token.
    pub dated: bool,
}

/// Output of [`parse_raw_input`]: every item, plus the ones awaiting review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedInput {
    pub items: Vec<JournalItem>,
    /// First item per unique, non-empty description not yet in the map.
    pub review: Vec<JournalItem>,
}

impl ParsedInput {
    /// Change the reviewed category for `desc`. Returns false if not under review.
    pub fn recategorize(&mut self, desc: &str, category: Category) -> bool {
        match self.review.iter_mut().find(|item| item.desc == desc) {
            Some(item) => {
                item.category = category;
                true
            }
            None => false,
        }
    }
}

/// Split a raw paste into journal items.
///
/// Blank lines are skipped. Lines without a usable date token are dated
/// `today`.
pub fn parse_raw_input(text: &str, today: NaiveDate, map: &CategoryMap) -> ParsedInput {
    let mut parsed = ParsedInput::default();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        let token_date = extract_date(line);
        let desc = clean_description(line);
        let known = map.get(&desc).copied();
        let item = JournalItem {
            original: line.to_string(),
            date: token_date.unwrap_or(today),
            category: known.unwrap_or_else(|| guess_category(line)),
            desc,
            dated: token_date.is_some(),
        };

        if !item.desc.is_empty()
            && known.is_none()
            && !parsed.review.iter().any(|r| r.desc == item.desc)
        {
            parsed.review.push(item.clone());
        }
        parsed.items.push(item);
    }

    log::debug!(
        "Parsed {} journal items, {} need review",
        parsed.items.len(),
        parsed.review.len()
    );
    parsed
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOutcome {
    pub history: String,
    pub category_map: CategoryMap,
    pub lines_written: usize,
    /// Date range of the archived items; `None` when nothing was written.
    pub range: Option<Window>,
}

/// Merge parsed items into the history log.
///
/// Final category per item: reviewed choice, then learned map, then the guess
/// made at parse time. Reviewed choices other than trash are learned. Items
/// whose line has no date token are written with their resolved date after the
/// tag so that history slicing can see them.
pub fn archive(history: &str, parsed: &ParsedInput, map: &CategoryMap) -> ArchiveOutcome {
    let mut category_map = map.clone();
    for item in &parsed.review {
        if !item.desc.is_empty() && item.category != Category::Trash {
            category_map.insert(item.desc.clone(), item.category);
        }
    }

    let mut lines = Vec::new();
    let mut min_date: Option<NaiveDate> = None;
    let mut max_date: Option<NaiveDate> = None;

    for item in &parsed.items {
        let category = parsed
            .review
            .iter()
            .find(|r| r.desc == item.desc)
            .map(|r| r.category)
            .or_else(|| category_map.get(&item.desc).copied())
            .unwrap_or(item.category);

        if category == Category::Trash {
            continue;
        }

        min_date = Some(min_date.map_or(item.date, |d| d.min(item.date)));
        max_date = Some(max_date.map_or(item.date, |d| d.max(item.date)));

        if item.dated {
            lines.push(format!("{} {}", category.tag(), item.original));
        } else {
            lines.push(format!(
                "{} {} {}",
                category.tag(),
                item.date.format("%Y-%m-%d"),
                item.original
            ));
        }
    }

    let lines_written = lines.len();
    let history = if lines.is_empty() {
        history.to_string()
    } else if history.is_empty() {
        lines.join("\n")
    } else {
        format!("{}\n{}", history, lines.join("\n"))
    };

    let range = min_date.zip(max_date).and_then(|(s, e)| Window::new(s, e));
    match range {
        Some(r) => log::info!("Archived {} lines ({})", lines_written, r.label()),
        None => log::info!("Archive skipped: every item was trashed or input was empty"),
    }

    ArchiveOutcome {
        history,
        category_map,
        lines_written,
        range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_clean_description_strips_dates_and_symbols() {
        assert_eq!(
            clean_description("2024-03-01 【会议】 项目评审 | 2h"),
            "会议 项目评审  2h"
        );
        assert_eq!(clean_description("2024-03-01T09:30:00+08:00 跑步🏃"), "跑步");
        assert_eq!(clean_description("(reading) [book]"), "reading book");
        assert_eq!(clean_description("2024-3-1"), "");
    }

    #[test]
    fn test_guess_category_keywords() {
        assert_eq!(guess_category("下午开会议"), Category::Work);
        assert_eq!(guess_category("阅读 30 分钟"), Category::Study);
        assert_eq!(guess_category("11点 睡觉"), Category::Sleep);
        assert_eq!(guess_category("rest a bit"), Category::Rest);
        assert_eq!(guess_category("打游戏"), Category::Entertainment);
        assert_eq!(guess_category("买菜做饭"), Category::Life);
    }

    #[test]
    fn test_category_tags_and_parse() {
        assert_eq!(Category::Entertainment.tag(), "[ENTERTAINMENT]");
        assert_eq!(Category::Work.label(), "工作");
        assert_eq!("Study".parse::<Category>(), Ok(Category::Study));
        assert!("chores".parse::<Category>().is_err());
    }

    #[test]
    fn test_parse_raw_input_dates_and_review_queue() {
        let mut map = CategoryMap::new();
        map.insert("遛狗".to_string(), Category::Life);

        let text = "2024-03-01 写周报 work\n\n2024-03-02 遛狗\n2024-03-03 写周报 work\n午睡 rest";
        let parsed = parse_raw_input(text, d(2024, 3, 5), &map);

        assert_eq!(parsed.items.len(), 4);
        assert_eq!(parsed.items[0].date, d(2024, 3, 1));
        assert!(parsed.items[0].dated);
        assert_eq!(parsed.items[0].category, Category::Work);
        assert_eq!(parsed.items[3].date, d(2024, 3, 5));
        assert!(!parsed.items[3].dated);

        // "遛狗" is known; the duplicate "写周报 work" is queued once.
        let queued: Vec<&str> = parsed.review.iter().map(|i| i.desc.as_str()).collect();
        assert_eq!(queued, vec!["写周报 work", "午睡 rest"]);
    }

    #[test]
    fn test_map_overrides_heuristic() {
        let mut map = CategoryMap::new();
        map.insert("work on garden".to_string(), Category::Life);
        let parsed = parse_raw_input("2024-03-01 work on garden", d(2024, 3, 1), &map);
        assert_eq!(parsed.items[0].category, Category::Life);
        assert!(parsed.review.is_empty());
    }

    #[test]
    fn test_archive_applies_review_and_learns() {
        let text = "2024-03-01 写周报\n2024-03-03 写周报\n2024-03-02 刷短视频";
        let mut parsed = parse_raw_input(text, d(2024, 3, 5), &CategoryMap::new());
        assert!(parsed.recategorize("写周报", Category::Work));
        assert!(parsed.recategorize("刷短视频", Category::Trash));
        assert!(!parsed.recategorize("missing", Category::Work));

        let outcome = archive("[LIFE] 2024-02-28 old", &parsed, &CategoryMap::new());

        assert_eq!(outcome.lines_written, 2);
        assert_eq!(
            outcome.history,
            "[LIFE] 2024-02-28 old\n[WORK] 2024-03-01 写周报\n[WORK] 2024-03-03 写周报"
        );
        assert_eq!(outcome.range, Window::new(d(2024, 3, 1), d(2024, 3, 3)));
        assert_eq!(outcome.category_map.get("写周报"), Some(&Category::Work));
        assert!(!outcome.category_map.contains_key("刷短视频"));
    }

    #[test]
    fn test_archive_into_empty_history_stamps_undated_lines() {
        let parsed = parse_raw_input("晚饭后散步", d(2024, 3, 5), &CategoryMap::new());
        let outcome = archive("", &parsed, &CategoryMap::new());
        assert_eq!(outcome.history, "[LIFE] 2024-03-05 晚饭后散步");
        assert_eq!(extract_date(&outcome.history), Some(d(2024, 3, 5)));
    }

    #[test]
    fn test_archive_all_trash_leaves_history_untouched() {
        let mut parsed = parse_raw_input("2024-03-01 noise", d(2024, 3, 1), &CategoryMap::new());
        parsed.recategorize("noise", Category::Trash);
        let outcome = archive("existing", &parsed, &CategoryMap::new());
        assert_eq!(outcome.history, "existing");
        assert_eq!(outcome.lines_written, 0);
        assert_eq!(outcome.range, None);
    }

    #[test]
    fn test_archive_uses_learned_map_for_unreviewed_items() {
        let mut map = CategoryMap::new();
        map.insert("晨跑".to_string(), Category::Rest);
        let parsed = parse_raw_input("2024-03-01 晨跑", d(2024, 3, 1), &map);
        let outcome = archive("", &parsed, &map);
        assert_eq!(outcome.history, "[REST] 2024-03-01 晨跑");
    }
}
