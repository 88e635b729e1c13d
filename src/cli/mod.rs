pub mod commands;
pub mod errors;
mod help;
pub mod output;
pub mod registry;
mod shell;
pub mod shell_context;

pub use errors::{CliError, CommandError, CommandResult};
pub use shell::run_cli;
pub use shell_context::{CliMode, ShellContext};
