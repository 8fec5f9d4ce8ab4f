//! Life planner core: date windows, history slicing, AI response handling,
//! journal archiving, and allocation statistics.

pub mod config;
pub mod dates;
pub mod error;
pub mod journal;
pub mod log_slice;
pub mod plan_stats;
pub mod retry;
pub mod sanitize;
pub mod state;

pub use config::{load_config, Config};
pub use dates::{
    resolve_comparison_window, resolve_window, target_multiplier, PeriodWindows, Scope, Window,
};
pub use error::{ErrorReport, ErrorType, PlannerError};
pub use journal::{archive, parse_raw_input, Category, CategoryMap};
pub use log_slice::{period_context, slice_by_window, PeriodContext, MAX_CONTEXT_CHARS};
pub use plan_stats::{allocation_gaps, plan_hours, review_progress, Allocations};
pub use sanitize::{
    decode_plan, decode_response, decode_review_report, sanitize, sanitize_plan,
    sanitize_review_report, AiResponse, ReviewReport, TodayPlan,
};
pub use state::{load_state, save_state, PlannerState};
