use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use serde_json::json;

use lifeos_lib::config::{load_config, load_config_from, Config};
use lifeos_lib::dates::{period_windows_for_day, target_multiplier_for_day, Scope};
use lifeos_lib::error::ErrorReport;
use lifeos_lib::journal::{archive, parse_raw_input};
use lifeos_lib::log_slice::period_context;
use lifeos_lib::error::PlannerError;
use lifeos_lib::plan_stats::{allocation_gaps, period_targets, plan_hours, review_progress};
use lifeos_lib::sanitize::{decode_plan, decode_response, decode_review_report};
use lifeos_lib::state::{load_state, save_state};

#[derive(Parser)]
#[command(name = "lifeos")]
#[command(about = "Life planner: review windows, history slices, plan checks", long_about = None)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default ~/.lifeos/config.json)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Treat this day (YYYY-MM-DD) as today")]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the review and comparison windows for a scope
    Window { scope: Scope },

    /// Print the history lines that fall in a scope's window
    Slice {
        scope: Scope,
        #[arg(long, help = "Read this log instead of the stored history")]
        log: Option<PathBuf>,
        #[arg(long, help = "Slice the comparison window instead")]
        previous: bool,
    },

    /// Decode a raw AI reply into the normalized response shape
    Decode {
        #[arg(help = "File with the AI reply; stdin when omitted")]
        file: Option<PathBuf>,
    },

    /// Categorize a journal paste and append it to the stored history
    Archive {
        file: PathBuf,
        #[arg(long, help = "Show what would be written without saving")]
        dry_run: bool,
    },

    /// Decode a period review reply and compare its hours with the targets
    Review {
        scope: Scope,
        #[arg(help = "File with the AI review reply; stdin when omitted")]
        file: Option<PathBuf>,
    },

    /// Print allocation targets for a scope, or gaps against a plan
    Targets {
        scope: Scope,
        #[arg(long, help = "AI reply whose plan is compared with the targets")]
        plan: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let today = cli.date.unwrap_or_else(|| config.today(Utc::now()));
    log::debug!("Today is {}", today);

    match cli.command {
        Commands::Window { scope } => show_window(scope, today)?,
        Commands::Slice {
            scope,
            log: log_file,
            previous,
        } => slice(&config, scope, today, log_file, previous)?,
        Commands::Decode { file } => decode(file)?,
        Commands::Archive { file, dry_run } => archive_file(&config, today, &file, dry_run)?,
        Commands::Review { scope, file } => review(&config, scope, today, file)?,
        Commands::Targets { scope, plan } => targets(&config, scope, today, plan)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_window(scope: Scope, today: NaiveDate) -> Result<()> {
    let windows = period_windows_for_day(scope, today);
    print_json(&json!({
        "scope": scope,
        "current": windows.current,
        "previous": windows.previous,
        "targetMultiplier": target_multiplier_for_day(scope, today),
    }))
}

fn slice(
    config: &Config,
    scope: Scope,
    today: NaiveDate,
    log_file: Option<PathBuf>,
    previous: bool,
) -> Result<()> {
    let history = match log_file {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => load_state(&config.resolved_state_path()?)?.history,
    };

    let ctx = period_context(&history, scope, today, config.max_context_chars);
    let (window, text) = if previous {
        (ctx.previous_window, ctx.previous)
    } else {
        (ctx.current_window, ctx.current)
    };
    log::info!("{} window {}", scope, window.label());
    println!("{}", text);
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn error_report_json(e: &PlannerError) -> String {
    serde_json::to_string_pretty(&ErrorReport::from(e)).unwrap_or_else(|_| e.to_string())
}

/// Print the error report the UI would show, once, and exit non-zero.
fn fail_with_report(e: &PlannerError) -> ! {
    eprintln!("{}", error_report_json(e));
    std::process::exit(1)
}

fn decode(file: Option<PathBuf>) -> Result<()> {
    let text = read_input(file)?;
    match decode_response(&text) {
        Ok(response) => print_json(&response),
        Err(e) => fail_with_report(&e),
    }
}

fn review(config: &Config, scope: Scope, today: NaiveDate, file: Option<PathBuf>) -> Result<()> {
    let text = read_input(file)?;
    let report = match decode_review_report(&text) {
        Ok(report) => report,
        Err(e) => fail_with_report(&e),
    };
    let state = load_state(&config.resolved_state_path()?)?;
    let progress = review_progress(&report, &state.allocations, scope, today);
    print_json(&json!({
        "report": report,
        "progress": progress,
    }))
}

fn archive_file(config: &Config, today: NaiveDate, file: &Path, dry_run: bool) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let state_path = config.resolved_state_path()?;
    let mut state = load_state(&state_path)?;

    let parsed = parse_raw_input(&raw, today, &state.category_map);
    for item in &parsed.review {
        log::info!("New description '{}' guessed as {}", item.desc, item.category);
    }

    let outcome = archive(&state.history, &parsed, &state.category_map);
    print_json(&json!({
        "linesWritten": outcome.lines_written,
        "range": outcome.range.map(|r| r.label()),
        "learned": parsed.review.len(),
    }))?;

    if dry_run {
        return Ok(());
    }
    state.apply_archive(outcome);
    save_state(&state_path, &state)?;
    Ok(())
}

fn targets(config: &Config, scope: Scope, today: NaiveDate, plan: Option<PathBuf>) -> Result<()> {
    let state = load_state(&config.resolved_state_path()?)?;

    match plan {
        None => print_json(&period_targets(&state.allocations, scope, today)),
        Some(path) => {
            let plan = decode_plan(&read_input(Some(path))?)?;
            let actual = plan_hours(&plan);
            // A plan covers one day, so compare it with the daily allocations.
            print_json(&allocation_gaps(&actual, &state.allocations))
        }
    }
}
