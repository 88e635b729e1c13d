use chrono::Datelike;
use tally_core::{
    budget_warnings, recurrence_warnings, CategoryLookup, LedgerStore, RecurrenceEngine, RunReport,
};

use crate::cli::commands::{parse_date, parse_period};
use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{short_id, ShellContext};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "run",
            "Record every recurring expense due on a date (default today)",
            "run [YYYY-MM-DD]",
            cmd_run,
        ),
        CommandEntry::new(
            "catch-up",
            "Repeat `run` until no recurring expense is due",
            "catch-up [YYYY-MM-DD] [max-passes]",
            cmd_catch_up,
        ),
        CommandEntry::new(
            "entries",
            "List ledger entries, optionally for one month",
            "entries [YYYY-MM]",
            cmd_entries,
        ),
        CommandEntry::new(
            "check",
            "Report anomalies in recurring expenses",
            "check",
            cmd_check,
        ),
    ]
}

fn cmd_run(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_of = match args.first() {
        Some(value) => parse_date(value)?,
        None => context.today(),
    };
    let report = RecurrenceEngine::new(context.store()).run(as_of)?;
    print_report(context, &report);
    Ok(())
}

fn cmd_catch_up(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_of = match args.first() {
        Some(value) => parse_date(value)?,
        None => context.today(),
    };
    let max_passes = match args.get(1) {
        Some(value) => value.parse::<u32>().ok().filter(|passes| *passes > 0).ok_or_else(|| {
            CommandError::InvalidArguments(format!("invalid pass limit `{}`", value))
        })?,
        None => context.config().catch_up_max_passes,
    };
    let report = RecurrenceEngine::new(context.store()).catch_up(as_of, max_passes)?;
    print_report(context, &report);
    Ok(())
}

fn print_report(context: &ShellContext, report: &RunReport) {
    for entry in &report.entries {
        output::info(format!(
            "  {}  {:>14}  {}",
            entry.date,
            context.format_amount(entry.amount),
            entry.description.as_deref().unwrap_or_default()
        ));
    }
    for id in &report.conflicts {
        output::warning(format!(
            "Recurring {} was advanced by another run; skipped.",
            short_id(*id)
        ));
    }
    for failure in &report.failures {
        output::error(format!(
            "Recurring {} failed: {}",
            short_id(failure.recurrence_id),
            failure.error
        ));
    }
    let noun = if report.generated() == 1 { "entry" } else { "entries" };
    let summary = format!(
        "Generated {} {} as of {} in {} pass(es).",
        report.generated(),
        noun,
        report.as_of,
        report.passes
    );
    if report.is_clean() {
        output::success(summary);
    } else {
        output::warning(summary);
    }
}

fn cmd_entries(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let period = if args.is_empty() {
        None
    } else {
        Some(parse_period(args)?)
    };
    let entries: Vec<_> = context
        .store()
        .entries()?
        .into_iter()
        .filter(|entry| {
            period.map_or(true, |(year, month)| {
                entry.date.year() == year && entry.date.month() == month
            })
        })
        .collect();
    if entries.is_empty() {
        output::info("No entries.");
        return Ok(());
    }
    let mut rows = Vec::with_capacity(entries.len());
    for entry in &entries {
        rows.push(vec![
            entry.date.to_string(),
            context.format_amount(entry.amount),
            context
                .store()
                .category_name(entry.category_id)?
                .unwrap_or_else(|| "<missing>".into()),
            entry.description.clone().unwrap_or_default(),
            if entry.is_generated() { "recurring" } else { "manual" }.to_string(),
        ]);
    }
    output::table(&["DATE", "AMOUNT", "CATEGORY", "DESCRIPTION", "SOURCE"], &rows);
    Ok(())
}

fn cmd_check(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let mut warnings = recurrence_warnings(context.store())?;
    warnings.extend(budget_warnings(context.store())?);
    if warnings.is_empty() {
        output::success("No issues found.");
    }
    for warning in warnings {
        output::warning(warning);
    }
    Ok(())
}
