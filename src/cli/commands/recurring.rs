use tally_core::{
    CategoryLookup, NewRecurrence, RecurrenceChanges, RecurrenceService, RecurrenceStore,
};
use tally_domain::{Interval, RecurrenceStatus};

use crate::cli::commands::{parse_amount, parse_date, parse_optional_date};
use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{short_id, ShellContext};

const ADD_USAGE: &str =
    "usage: recurring add <name> <amount> <category> <interval> <next-date> [end-date]";
const SET_USAGE: &str =
    "usage: recurring set <id> <name|amount|category|interval|next|end> <value>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "recurring",
        "Manage recurring expenses",
        "recurring <add|list|set|delete> ...",
        cmd_recurring,
    )]
}

fn cmd_recurring(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_lowercase()).as_deref() {
        Some("add") => add_recurrence(context, &args[1..]),
        Some("list") | None => list_recurrences(context),
        Some("set") => set_field(context, &args[1..]),
        Some("delete") => delete_recurrence(context, &args[1..]),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown recurring subcommand `{}`",
            other
        ))),
    }
}

fn interval_arg(value: &str) -> Interval {
    let interval = Interval::parse(value);
    if Interval::recognize(value).is_none() {
        output::warning(format!(
            "Interval `{}` not recognized; using {}.",
            value, interval
        ));
    }
    interval
}

fn add_recurrence(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if !(5..=6).contains(&args.len()) {
        return Err(CommandError::InvalidArguments(ADD_USAGE.into()));
    }
    let category = context.require_category(args[2])?;
    let request = NewRecurrence {
        name: args[0].to_string(),
        amount: parse_amount(args[1])?,
        category_id: category.id,
        interval: interval_arg(args[3]),
        next_date: parse_date(args[4])?,
        end_date: match args.get(5) {
            Some(value) => parse_optional_date(value)?,
            None => None,
        },
    };
    let definition = RecurrenceService::create(context.store(), request)?;
    output::success(format!(
        "Recurring `{}` added ({}), first due {}.",
        definition.name,
        short_id(definition.id),
        definition.next_date
    ));
    Ok(())
}

fn list_recurrences(context: &mut ShellContext) -> CommandResult {
    let definitions = context.store().list_recurrences()?;
    if definitions.is_empty() {
        output::info("No recurring expenses defined.");
        return Ok(());
    }
    let mut rows = Vec::with_capacity(definitions.len());
    for definition in &definitions {
        let category = context
            .store()
            .category_name(definition.category_id)?
            .unwrap_or_else(|| "<missing>".into());
        let schedule = match definition.status() {
            RecurrenceStatus::Active => definition.next_date.to_string(),
            RecurrenceStatus::Dormant => "-".into(),
        };
        rows.push(vec![
            short_id(definition.id),
            definition.name.clone(),
            context.format_amount(definition.amount),
            category,
            definition.interval.to_string(),
            schedule,
            definition
                .end_date
                .map(|end| end.to_string())
                .unwrap_or_default(),
            definition.status().to_string(),
        ]);
    }
    output::table(
        &["ID", "NAME", "AMOUNT", "CATEGORY", "INTERVAL", "NEXT", "END", "STATUS"],
        &rows,
    );
    Ok(())
}

fn set_field(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.len() < 3 {
        return Err(CommandError::InvalidArguments(SET_USAGE.into()));
    }
    let definition = context.require_recurrence(args[0])?;
    let value = args[2..].join(" ");
    let mut changes = RecurrenceChanges::default();
    match args[1].to_lowercase().as_str() {
        "name" => changes.name = Some(value),
        "amount" => changes.amount = Some(parse_amount(&value)?),
        "category" => changes.category_id = Some(context.require_category(&value)?.id),
        "interval" => changes.interval = Some(interval_arg(&value)),
        "next" => changes.next_date = Some(parse_date(&value)?),
        "end" => changes.end_date = Some(parse_optional_date(&value)?),
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown field `{}`; {}",
                other, SET_USAGE
            )))
        }
    }
    let updated = RecurrenceService::update(context.store(), definition.id, changes)?;
    output::success(format!(
        "Recurring `{}` updated; next due {} ({}).",
        updated.name,
        updated.next_date,
        updated.status()
    ));
    Ok(())
}

fn delete_recurrence(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(key) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: recurring delete <id>".into(),
        ));
    };
    let definition = context.require_recurrence(key)?;
    RecurrenceService::delete(context.store(), definition.id)?;
    output::success(format!("Recurring `{}` deleted.", definition.name));
    Ok(())
}
