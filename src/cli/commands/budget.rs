use chrono::Datelike;
use tally_core::{
    BudgetAggregator, BudgetChanges, BudgetService, BudgetStore, CategoryLookup, NewBudget,
};

use crate::cli::commands::{parse_amount, parse_period};
use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{short_id, ShellContext};

const ADD_USAGE: &str = "usage: budget add <category> <YYYY-MM> <amount>";
const SET_USAGE: &str = "usage: budget set <id> <category|period|amount> <value>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "budget",
            "Manage monthly category budgets",
            "budget <add|list|set|delete> ...",
            cmd_budget,
        ),
        CommandEntry::new(
            "status",
            "Compare a month's spending with its budgets",
            "status [YYYY MM|YYYY-MM]",
            cmd_status,
        ),
    ]
}

fn cmd_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_lowercase()).as_deref() {
        Some("add") => add_budget(context, &args[1..]),
        Some("list") | None => list_budgets(context),
        Some("set") => set_field(context, &args[1..]),
        Some("delete") => delete_budget(context, &args[1..]),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown budget subcommand `{}`",
            other
        ))),
    }
}

fn add_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.len() != 3 {
        return Err(CommandError::InvalidArguments(ADD_USAGE.into()));
    }
    let category = context.require_category(args[0])?;
    let (year, month) = parse_period(&args[1..2])?;
    let budget = BudgetService::create(
        context.store(),
        NewBudget {
            category_id: category.id,
            year,
            month,
            amount: parse_amount(args[2])?,
        },
    )?;
    output::success(format!(
        "Budget for `{}` in {} set to {} ({}).",
        category.name,
        budget.period(),
        context.format_amount(budget.amount),
        short_id(budget.id)
    ));
    Ok(())
}

fn list_budgets(context: &mut ShellContext) -> CommandResult {
    let budgets = context.store().list_budgets()?;
    if budgets.is_empty() {
        output::info("No budgets defined.");
        return Ok(());
    }
    let mut rows = Vec::with_capacity(budgets.len());
    for budget in &budgets {
        rows.push(vec![
            short_id(budget.id),
            budget.period().to_string(),
            context
                .store()
                .category_name(budget.category_id)?
                .unwrap_or_else(|| "<missing>".into()),
            context.format_amount(budget.amount),
        ]);
    }
    output::table(&["ID", "PERIOD", "CATEGORY", "AMOUNT"], &rows);
    Ok(())
}

fn set_field(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.len() < 3 {
        return Err(CommandError::InvalidArguments(SET_USAGE.into()));
    }
    let budget = context.require_budget(args[0])?;
    let value = args[2..].join(" ");
    let mut changes = BudgetChanges::default();
    match args[1].to_lowercase().as_str() {
        "category" => changes.category_id = Some(context.require_category(&value)?.id),
        "period" => {
            let (year, month) = parse_period(&args[2..])?;
            changes.year = Some(year);
            changes.month = Some(month);
        }
        "amount" => changes.amount = Some(parse_amount(&value)?),
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown field `{}`; {}",
                other, SET_USAGE
            )))
        }
    }
    let updated = BudgetService::update(context.store(), budget.id, changes)?;
    output::success(format!(
        "Budget {} updated: {} for {}.",
        short_id(updated.id),
        context.format_amount(updated.amount),
        updated.period()
    ));
    Ok(())
}

fn delete_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(key) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: budget delete <id>".into(),
        ));
    };
    let budget = context.require_budget(key)?;
    BudgetService::delete(context.store(), budget.id)?;
    output::success(format!("Budget for {} deleted.", budget.period()));
    Ok(())
}

fn cmd_status(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (year, month) = if args.is_empty() {
        let today = context.today();
        (today.year(), today.month())
    } else {
        parse_period(args)?
    };
    let statuses = BudgetAggregator::new(context.store()).status(year, month)?;

    output::section(format!("Budget status {:04}-{:02}", year, month));
    if statuses.is_empty() {
        output::info("No budgets set for this month.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|status| {
            let flag = if status.is_over_budget() { "OVER" } else { "" };
            vec![
                status.category_name.clone(),
                context.format_amount(status.budget_amount),
                context.format_amount(status.total_spent),
                context.format_amount(status.remaining()),
                format!("{:.2}%", status.percent),
                flag.to_string(),
            ]
        })
        .collect();
    output::table(
        &["CATEGORY", "BUDGET", "SPENT", "REMAINING", "USED", ""],
        &rows,
    );
    Ok(())
}
