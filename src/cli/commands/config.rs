use crate::cli::errors::{CommandError, CommandResult};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::ShellContext;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change CLI preferences",
        "config [show|set <key> <value>]",
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        output::section("Configuration");
        for (key, value) in context.config().entries() {
            output::info(format!("  {:<20} {}", key, value));
        }
        return Ok(());
    }

    match args[0].to_lowercase().as_str() {
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(
                    "usage: config set <currency|data_file|log_filter|catch_up_max_passes|ui_color_enabled> <value>"
                        .into(),
                ));
            }
            let key = args[1];
            let value = args[2..].join(" ");
            let mut config = context.config().clone();
            config.set(key, &value)?;
            context.update_config(config)?;
            if key == "log_filter" {
                output::info("Log filter applies from the next start.");
            }
            output::success("Configuration updated.");
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config action `{}`",
            other
        ))),
    }
}
