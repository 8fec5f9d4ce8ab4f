//! AI response repair and sanitization
//!
//! The review and plan generators ask the model for JSON, but what comes back
//! is only mostly JSON: fenced in Markdown, wrapped in prose, missing fields or
//! with the wrong types. Two layers deal with that:
//!
//! 1. [`parse_ai_json`] turns raw text into a `serde_json::Value` or fails with
//!    the single [`PlannerError::UnparseableResponse`].
//! 2. [`sanitize`] coerces any `Value` into an [`AiResponse`] where every field
//!    exists. It never fails; unrecognized shapes become defaults.
//!    [`sanitize_plan`] and [`sanitize_review_report`] do the same for the
//!    standalone plan and period review replies.
//!
//! Render code relies on the second layer and does no null checks of its own.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PlannerError;
use crate::journal::Category;
use crate::plan_stats::CategoryHours;

const UNKNOWN_TYPE: &str = "unknown";
const UNKNOWN_DATE: &str = "未知日期";
const NO_ANALYSIS: &str = "暂无分析";
const OTHER_CATEGORY: &str = "其他";
const PLAN_DATE: &str = "今日";
const ROUTINE: &str = "routine";
const UNTITLED_ACTIVITY: &str = "未命名活动";

const ADVICE_KEYS: &[&str] = &["advice", "overallAdvice", "overall_advice", "suggestion"];
const THEME_KEYS: &[&str] = &["themeTitle", "theme_title", "theme", "title"];
const BLOCK_LIST_KEYS: &[&str] = &["blocks", "fullBlocks"];
const BLOCK_TYPE_KEYS: &[&str] = &["type", "category"];
const ACTIVITY_KEYS: &[&str] = &["activity", "title"];
const ENERGY_KEYS: &[&str] = &["energy", "energy_required", "energyRequired"];
const SUB_SCHEDULE_KEYS: &[&str] = &["subSchedule", "sub_blocks", "subBlocks"];
const SUB_LABEL_KEYS: &[&str] = &["label", "activity"];
const ALLOCATION_KEYS: &[&str] = &["actual_allocation", "actualAllocation"];
const GROWTH_KEYS: &[&str] = &["growth_metric", "growthMetric"];
const KEY_METRIC_KEYS: &[&str] = &["key_metric", "keyMetric"];
const GROWTH_LABEL: &str = "趋势";
const KEY_METRIC_LABEL: &str = "核心指标";
const NO_VALUE: &str = "--";

// =============================================================================
// Output shape
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub daily_reviews: Vec<ReviewEntry>,
    pub today_plan: TodayPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub date: String,
    pub analysis: String,
    pub stats: Vec<CategoryStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayPlan {
    pub date: String,
    pub theme_title: String,
    pub advice: String,
    pub blocks: Vec<PlanBlock>,
}

impl Default for TodayPlan {
    fn default() -> Self {
        Self {
            date: PLAN_DATE.to_string(),
            theme_title: String::new(),
            advice: String::new(),
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBlock {
    pub time: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub activity: String,
    pub desc: String,
    pub energy: String,
    pub sub_schedule: Vec<SubScheduleItem>,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubScheduleItem {
    pub time: String,
    pub label: String,
    pub detail: String,
}

/// Period review reply: what the scope's history actually looked like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub summary: String,
    /// Hours per tracked category; every tracked category is present.
    pub actual_allocation: CategoryHours,
    pub insights: Vec<String>,
    pub growth_metric: GrowthMetric,
    pub key_metric: KeyMetric,
}

impl Default for ReviewReport {
    fn default() -> Self {
        Self {
            summary: String::new(),
            actual_allocation: Category::TRACKED.iter().map(|c| (*c, 0.0)).collect(),
            insights: Vec::new(),
            growth_metric: GrowthMetric::default(),
            key_metric: KeyMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

impl Trend {
    /// `up` and `down` (any case); everything else is neutral.
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str).map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "up" => Trend::Up,
            Some(s) if s == "down" => Trend::Down,
            _ => Trend::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthMetric {
    pub label: String,
    pub value: String,
    pub trend: Trend,
}

impl Default for GrowthMetric {
    fn default() -> Self {
        Self {
            label: GROWTH_LABEL.to_string(),
            value: NO_VALUE.to_string(),
            trend: Trend::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
}

impl Default for KeyMetric {
    fn default() -> Self {
        Self {
            label: KEY_METRIC_LABEL.to_string(),
            value: NO_VALUE.to_string(),
        }
    }
}

// =============================================================================
// Field coercion
// =============================================================================

/// Scalar rendered as text; empty strings, null, arrays and objects are absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First present key in priority order, else `default`.
fn text(obj: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(scalar_text))
        .unwrap_or_else(|| default.to_string())
}

/// First key whose value is an object.
fn object<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_object))
}

/// First key whose value is an array; empty slice when none is.
fn list<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Numeric cast with 0 for anything that is not a finite number.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

// =============================================================================
// Sanitizer
// =============================================================================

/// Coerce any decoded JSON value into a fully populated [`AiResponse`].
///
/// Non-object list elements are dropped. The plan comes from `todayPlan`, or
/// from the root itself when the root carries the block list directly (the
/// shape the standalone plan generator returns).
pub fn sanitize(value: &Value) -> AiResponse {
    let Some(root) = value.as_object() else {
        return AiResponse::default();
    };

    let daily_reviews = list(root, &["dailyReviews"])
        .iter()
        .filter_map(Value::as_object)
        .map(sanitize_review)
        .collect();

    let today_plan = plan_source(root).map(plan_from_object).unwrap_or_default();

    AiResponse {
        daily_reviews,
        today_plan,
    }
}

fn sanitize_review(obj: &Map<String, Value>) -> ReviewEntry {
    ReviewEntry {
        entry_type: text(obj, &["type"], UNKNOWN_TYPE),
        date: text(obj, &["date"], UNKNOWN_DATE),
        analysis: text(obj, &["analysis"], NO_ANALYSIS),
        stats: list(obj, &["stats"])
            .iter()
            .filter_map(Value::as_object)
            .map(|stat| CategoryStat {
                category: text(stat, &["category"], OTHER_CATEGORY),
                percentage: coerce_number(stat.get("percentage")),
            })
            .collect(),
    }
}

fn plan_source(root: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if let Some(plan) = root.get("todayPlan").and_then(Value::as_object) {
        return Some(plan);
    }
    if BLOCK_LIST_KEYS.iter().any(|key| root.contains_key(*key)) {
        log::debug!("No todayPlan wrapper; reading the plan from the root object");
        return Some(root);
    }
    None
}

/// Coerce a plan reply into a [`TodayPlan`], with or without the `todayPlan`
/// wrapper.
pub fn sanitize_plan(value: &Value) -> TodayPlan {
    value
        .as_object()
        .and_then(plan_source)
        .map(plan_from_object)
        .unwrap_or_default()
}

fn plan_from_object(obj: &Map<String, Value>) -> TodayPlan {
    TodayPlan {
        date: text(obj, &["date"], PLAN_DATE),
        theme_title: text(obj, THEME_KEYS, ""),
        advice: text(obj, ADVICE_KEYS, ""),
        blocks: list(obj, BLOCK_LIST_KEYS)
            .iter()
            .filter_map(Value::as_object)
            .map(sanitize_block)
            .collect(),
    }
}

fn sanitize_block(obj: &Map<String, Value>) -> PlanBlock {
    PlanBlock {
        time: text(obj, &["time"], ""),
        block_type: text(obj, BLOCK_TYPE_KEYS, ROUTINE),
        activity: text(obj, ACTIVITY_KEYS, UNTITLED_ACTIVITY),
        desc: text(obj, &["desc"], ""),
        energy: text(obj, ENERGY_KEYS, ""),
        sub_schedule: list(obj, SUB_SCHEDULE_KEYS)
            .iter()
            .filter_map(Value::as_object)
            .map(|item| SubScheduleItem {
                time: text(item, &["time"], ""),
                label: text(item, SUB_LABEL_KEYS, ""),
                detail: text(item, &["detail"], ""),
            })
            .collect(),
        tips: list(obj, &["tips"]).iter().filter_map(scalar_text).collect(),
    }
}

/// Coerce a period review reply into a fully populated [`ReviewReport`].
///
/// Allocation hours go through [`coerce_number`]; unknown categories are
/// ignored and missing ones stay at 0.
pub fn sanitize_review_report(value: &Value) -> ReviewReport {
    let Some(root) = value.as_object() else {
        return ReviewReport::default();
    };

    let mut actual_allocation = ReviewReport::default().actual_allocation;
    if let Some(alloc) = object(root, ALLOCATION_KEYS) {
        for (category, hours) in actual_allocation.iter_mut() {
            *hours = coerce_number(alloc.get(category.as_str()));
        }
    }

    let growth_metric = object(root, GROWTH_KEYS)
        .map(|m| GrowthMetric {
            label: text(m, &["label"], GROWTH_LABEL),
            value: text(m, &["value"], NO_VALUE),
            trend: Trend::from_value(m.get("trend")),
        })
        .unwrap_or_default();

    let key_metric = object(root, KEY_METRIC_KEYS)
        .map(|m| KeyMetric {
            label: text(m, &["label"], KEY_METRIC_LABEL),
            value: text(m, &["value"], NO_VALUE),
        })
        .unwrap_or_default();

    ReviewReport {
        summary: text(root, &["summary"], ""),
        actual_allocation,
        insights: list(root, &["insights"]).iter().filter_map(scalar_text).collect(),
        growth_metric,
        key_metric,
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Best-effort parse of raw model output.
///
/// Tries, in order: the text as-is, the text with Markdown code-fence markers
/// removed, and the first balanced `{...}` object found in the text.
pub fn parse_ai_json(text: &str) -> Result<Value, PlannerError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(&unfenced) {
        log::debug!("AI response parsed after stripping code fences");
        return Ok(value);
    }

    if let Some(candidate) = extract_json_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            log::debug!("AI response parsed from embedded JSON object");
            return Ok(value);
        }
    }

    log::warn!("AI response could not be parsed ({} chars)", text.len());
    Err(PlannerError::UnparseableResponse)
}

/// Parse and sanitize in one step.
pub fn decode_response(text: &str) -> Result<AiResponse, PlannerError> {
    parse_ai_json(text).map(|value| sanitize(&value))
}

/// Parse and sanitize a plan reply.
pub fn decode_plan(text: &str) -> Result<TodayPlan, PlannerError> {
    parse_ai_json(text).map(|value| sanitize_plan(&value))
}

/// Parse and sanitize a period review reply.
pub fn decode_review_report(text: &str) -> Result<ReviewReport, PlannerError> {
    parse_ai_json(text).map(|value| sanitize_review_report(&value))
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Find the first complete JSON object `{...}` in the text.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in text[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Tests
// =============================================================================
