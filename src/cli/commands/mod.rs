pub mod budget;
pub mod category;
pub mod config;
pub mod recurring;
pub mod schedule;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cli::errors::CommandError;
use crate::cli::help;
use crate::cli::registry::CommandRegistry;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    for entry in help::definitions()
        .into_iter()
        .chain(category::definitions())
        .chain(recurring::definitions())
        .chain(budget::definitions())
        .chain(schedule::definitions())
        .chain(config::definitions())
    {
        registry.register(entry);
    }
}

pub(crate) fn parse_date(input: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", input))
    })
}

/// Optional date argument; `none` or `-` clear it.
pub(crate) fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, CommandError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "none" | "-" | "" => Ok(None),
        _ => parse_date(input).map(Some),
    }
}

pub(crate) fn parse_amount(input: &str) -> Result<Decimal, CommandError> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|_| CommandError::InvalidArguments(format!("invalid amount `{}`", input)))
}

/// Accepts `YYYY-MM` or `YYYY MM` split across two arguments.
pub(crate) fn parse_period(args: &[&str]) -> Result<(i32, u32), CommandError> {
    let invalid = || {
        CommandError::InvalidArguments(format!(
            "invalid month `{}` (use YYYY-MM or YYYY MM)",
            args.join(" ")
        ))
    };
    let (year, month) = match args {
        [single] => single.split_once('-').ok_or_else(invalid)?,
        [year, month] => (*year, *month),
        _ => return Err(invalid()),
    };
    let year = year.trim().parse::<i32>().map_err(|_| invalid())?;
    let month = month.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((year, month))
}
