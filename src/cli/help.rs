use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help),
        CommandEntry::new("exit", "Leave the shell", "exit", cmd_exit),
    ]
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        print_overview(context.registry.entries());
        return Ok(());
    };
    match context.command(&name.to_lowercase()) {
        Some(entry) => print_usage(entry),
        None => context.suggest_command(name),
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}

fn print_overview(entries: &[CommandEntry]) {
    output::section("Commands");
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| vec![entry.name.to_string(), entry.summary.to_string()])
        .collect();
    output::table(&["COMMAND", "DESCRIPTION"], &rows);
    output::hint("`help <command>` shows its arguments; dates are YYYY-MM-DD, months YYYY-MM.");
}

fn print_usage(entry: &CommandEntry) {
    output::section(entry.name);
    output::info(entry.summary);
    output::info(format!("usage: {}", entry.usage));
}
