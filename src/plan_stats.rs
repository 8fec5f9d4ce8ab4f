//! Plan statistics against daily allocation targets

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{target_multiplier_for_day, Scope};
use crate::journal::Category;
use crate::sanitize::{ReviewReport, TodayPlan};

/// An actual below target by more than this is flagged as off track.
const ON_TRACK_TOLERANCE_HOURS: f64 = 0.5;

/// Ideal hours per day for each tracked category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Allocations {
    pub work: f64,
    pub study: f64,
    pub rest: f64,
    pub sleep: f64,
    pub life: f64,
    pub entertainment: f64,
}

impl Default for Allocations {
    fn default() -> Self {
        Self {
            work: 8.0,
            study: 2.0,
            rest: 2.0,
            sleep: 7.0,
            life: 2.5,
            entertainment: 2.5,
        }
    }
}

impl Allocations {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Work => self.work,
            Category::Study => self.study,
            Category::Rest => self.rest,
            Category::Sleep => self.sleep,
            Category::Life => self.life,
            Category::Entertainment => self.entertainment,
            Category::Trash => 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        Category::TRACKED.iter().map(|c| self.get(*c)).sum()
    }

    pub fn scaled(&self, factor: u32) -> Self {
        let f = f64::from(factor);
        Self {
            work: self.work * f,
            study: self.study * f,
            rest: self.rest * f,
            sleep: self.sleep * f,
            life: self.life * f,
            entertainment: self.entertainment * f,
        }
    }
}

/// Targets for the part of the review period that has elapsed.
pub fn period_targets(daily: &Allocations, scope: Scope, today: NaiveDate) -> Allocations {
    daily.scaled(target_multiplier_for_day(scope, today))
}

pub type CategoryHours = BTreeMap<Category, f64>;

fn clock_hours(s: &str) -> Option<f64> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    if h > 24 || m > 59 {
        return None;
    }
    Some(f64::from(h) + f64::from(m) / 60.0)
}

/// Duration of a `HH:MM - HH:MM` (or `HH:MM~HH:MM`) block in hours.
///
/// A block that ends before it starts runs past midnight.
pub fn block_hours(time: &str) -> Option<f64> {
    let parts: Vec<&str> = time.split(['-', '~']).collect();
    let [start, end] = parts.as_slice() else {
        return None;
    };
    let mut hours = clock_hours(end)? - clock_hours(start)?;
    if hours < 0.0 {
        hours += 24.0;
    }
    Some(hours)
}

/// Planned hours per tracked category. Blocks of other types or with an
/// unreadable time range are ignored.
pub fn plan_hours(plan: &TodayPlan) -> CategoryHours {
    let mut hours: CategoryHours = Category::TRACKED.iter().map(|c| (*c, 0.0)).collect();
    for block in &plan.blocks {
        let Ok(category) = block.block_type.parse::<Category>() else {
            continue;
        };
        let (Some(slot), Some(dur)) = (hours.get_mut(&category), block_hours(&block.time)) else {
            continue;
        };
        *slot += dur;
    }
    hours
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationGap {
    pub category: Category,
    pub target: f64,
    pub actual: f64,
    pub diff: f64,
    pub on_track: bool,
}

/// Compare actual hours with targets for every tracked category.
pub fn allocation_gaps(actual: &CategoryHours, targets: &Allocations) -> Vec<AllocationGap> {
    Category::TRACKED
        .iter()
        .map(|category| {
            let target = targets.get(*category);
            let actual = actual.get(category).copied().unwrap_or(0.0);
            let diff = actual - target;
            AllocationGap {
                category: *category,
                target,
                actual,
                diff,
                on_track: diff >= -ON_TRACK_TOLERANCE_HOURS,
            }
        })
        .collect()
}

/// Review progress bars: the reported hours against the daily allocations
/// scaled to the elapsed part of the period.
pub fn review_progress(
    report: &ReviewReport,
    daily: &Allocations,
    scope: Scope,
    today: NaiveDate,
) -> Vec<AllocationGap> {
    allocation_gaps(&report.actual_allocation, &period_targets(daily, scope, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::{decode_response, sanitize, sanitize_review_report};
    use serde_json::json;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_block_hours() {
        assert!(approx(block_hours("09:00 - 10:30").unwrap(), 1.5));
        assert!(approx(block_hours("9:00~9:45").unwrap(), 0.75));
        assert!(approx(block_hours("23:00 - 01:00").unwrap(), 2.0));
        assert_eq!(block_hours("9-10"), None);
        assert_eq!(block_hours("09:00"), None);
        assert_eq!(block_hours("09:00 - 10:00 - 11:00"), None);
        assert_eq!(block_hours("ab:cd - 10:00"), None);
    }

    #[test]
    fn test_plan_hours_sums_tracked_categories() {
        let plan = sanitize(&json!({
            "todayPlan": {
                "blocks": [
                    {"time": "09:00 - 11:00", "category": "work"},
                    {"time": "13:00 - 14:30", "type": "work"},
                    {"time": "20:00 - 21:00", "category": "study"},
                    {"time": "12:00 - 13:00"},
                    {"time": "later", "category": "rest"},
                    {"time": "15:00 - 16:00", "category": "trash"}
                ]
            }
        }))
        .today_plan;

        let hours = plan_hours(&plan);
        assert!(approx(hours[&Category::Work], 3.5));
        assert!(approx(hours[&Category::Study], 1.0));
        assert!(approx(hours[&Category::Rest], 0.0));
        assert!(!hours.contains_key(&Category::Trash));
        assert_eq!(hours.len(), 6);
    }

    #[test]
    fn test_plan_hours_from_root_level_reply() {
        let plan = decode_response(
            r#"{"theme_title":"专注","advice":"早睡","blocks":[{"time":"09:00 - 11:00","category":"work","title":"写周报"}]}"#,
        )
        .unwrap()
        .today_plan;
        let hours = plan_hours(&plan);
        assert!(approx(hours[&Category::Work], 2.0));
    }

    #[test]
    fn test_review_progress_weekly() {
        let report = sanitize_review_report(&json!({
            "actual_allocation": {"work": 20, "study": "6", "sleep": 18}
        }));
        // Wednesday: targets cover three days.
        let gaps = review_progress(&report, &Allocations::default(), Scope::Weekly, d(2024, 3, 6));
        assert_eq!(gaps.len(), 6);

        let work = gaps.iter().find(|g| g.category == Category::Work).unwrap();
        assert!(approx(work.target, 24.0));
        assert!(approx(work.actual, 20.0));
        assert!(!work.on_track);

        let study = gaps.iter().find(|g| g.category == Category::Study).unwrap();
        assert!(approx(study.target, 6.0));
        assert!(study.on_track);

        let life = gaps.iter().find(|g| g.category == Category::Life).unwrap();
        assert!(approx(life.actual, 0.0));
        assert!(approx(life.diff, -7.5));
    }

    #[test]
    fn test_review_progress_empty_report() {
        let report = sanitize_review_report(&json!(null));
        let gaps = review_progress(&report, &Allocations::default(), Scope::Today, d(2024, 3, 6));
        assert!(gaps.iter().all(|g| approx(g.actual, 0.0) && !g.on_track));
    }

    #[test]
    fn test_period_targets_scale_with_multiplier() {
        let daily = Allocations::default();
        assert!(approx(daily.total(), 24.0));

        // Wednesday: three days into the week.
        let weekly = period_targets(&daily, Scope::Weekly, d(2024, 3, 6));
        assert!(approx(weekly.work, 24.0));

        let monthly = period_targets(&daily, Scope::Monthly, d(2024, 3, 10));
        assert!(approx(monthly.sleep, 70.0));

        let today = period_targets(&daily, Scope::Today, d(2024, 3, 10));
        assert_eq!(today, daily);
    }

    #[test]
    fn test_allocation_gaps_tolerance() {
        let mut actual = CategoryHours::new();
        actual.insert(Category::Work, 7.6);
        actual.insert(Category::Study, 1.0);

        let gaps = allocation_gaps(&actual, &Allocations::default());
        assert_eq!(gaps.len(), 6);

        let work = gaps.iter().find(|g| g.category == Category::Work).unwrap();
        assert!(work.on_track);
        assert!(approx(work.diff, -0.4));

        let study = gaps.iter().find(|g| g.category == Category::Study).unwrap();
        assert!(!study.on_track);

        let sleep = gaps.iter().find(|g| g.category == Category::Sleep).unwrap();
        assert!(approx(sleep.actual, 0.0));
        assert!(!sleep.on_track);
    }

    #[test]
    fn test_allocations_deserialize_partial() {
        let alloc: Allocations = serde_json::from_value(json!({"work": 6})).unwrap();
        assert!(approx(alloc.work, 6.0));
        assert!(approx(alloc.sleep, 7.0));
    }
}
