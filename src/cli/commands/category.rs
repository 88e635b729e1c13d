use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{short_id, ShellContext};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "category",
        "Manage expense categories",
        "category <add <name> [description]|list>",
        cmd_category,
    )]
}

fn cmd_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_lowercase()).as_deref() {
        Some("add") => add_category(context, &args[1..]),
        Some("list") | None => list_categories(context),
        Some(other) => Err(CommandError::InvalidArguments(format!(
            "unknown category subcommand `{}`",
            other
        ))),
    }
}

fn add_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: category add <name> [description]".into(),
        ));
    };
    let description = (args.len() > 1).then(|| args[1..].join(" "));
    let category = context.store().add_category(name, description)?;
    output::success(format!(
        "Category `{}` added ({}).",
        category.name,
        short_id(category.id)
    ));
    Ok(())
}

fn list_categories(context: &mut ShellContext) -> CommandResult {
    let categories = context.store().list_categories()?;
    if categories.is_empty() {
        output::info("No categories yet. Use `category add <name>`.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|category| {
            vec![
                short_id(category.id),
                category.name.clone(),
                category.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    output::table(&["ID", "NAME", "DESCRIPTION"], &rows);
    Ok(())
}
