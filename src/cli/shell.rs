use std::io::{self, BufRead};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    history::DefaultHistory,
    Context as ReadlineContext, Editor, Helper, Highlighter, Hinter, Validator,
};
use tally_config::ConfigManager;

use crate::cli::errors::{CliError, CommandError};
use crate::cli::output;
use crate::cli::shell_context::{CliMode, LoopControl, ShellContext};

/// When set, commands are read line by line from stdin without a prompt.
pub const SCRIPT_ENV_VAR: &str = "TALLY_CLI_SCRIPT";

/// Second words offered after a command that takes a subcommand.
const SUBCOMMANDS: &[(&str, &[&str])] = &[
    ("category", &["add", "list"]),
    ("recurring", &["add", "list", "set", "delete"]),
    ("budget", &["add", "list", "set", "delete"]),
    ("config", &["show", "set"]),
];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV_VAR).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let manager = ConfigManager::from_env()?;
    let config = manager.load()?;
    crate::init_with_filter(&config.log_filter);

    let mut context = ShellContext::open(mode, manager, config)?;
    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<TallyHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(TallyHelper::new(context.command_names())));
    output::info("Tally. Type `help` to list commands.");

    loop {
        let line = match editor.readline(&context.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                output::info("Bye.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.trim());
        }
        if !feed(context, &line) {
            return Ok(());
        }
    }
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        if !feed(context, &line?) {
            break;
        }
    }
    Ok(())
}

/// Runs one line and reports its error. Returns `false` once the session is over.
fn feed(context: &mut ShellContext, line: &str) -> bool {
    match handle_line(context, line) {
        Ok(LoopControl::Exit) => false,
        Ok(LoopControl::Continue) => context.running,
        Err(err) => {
            context.report_error(err);
            context.running
        }
    }
}

/// Splits a line shell-style and dispatches it. Blank lines and `#` comments are skipped;
/// a line that cannot be split is reported as a warning and skipped.
pub(crate) fn handle_line(
    context: &mut ShellContext,
    line: &str,
) -> Result<LoopControl, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(LoopControl::Continue);
    }
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not parse `{line}`: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();

    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Completes the command word, the subcommand after `category`, `recurring`,
/// `budget` and `config`, and the command name after `help`.
#[derive(Helper, Hinter, Highlighter, Validator)]
struct TallyHelper {
    commands: Vec<&'static str>,
}

impl TallyHelper {
    fn new(mut commands: Vec<&'static str>) -> Self {
        commands.sort_unstable();
        commands.dedup();
        Self { commands }
    }

    /// Start of the word under the cursor and the words that may replace it.
    fn candidates(&self, head: &str) -> (usize, Vec<&'static str>) {
        let start = head.rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
        let word = head[start..].to_ascii_lowercase();
        let before: Vec<String> = head[..start]
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();

        let options: &[&'static str] = match before.as_slice() {
            [] => self.commands.as_slice(),
            [command] if command == "help" => self.commands.as_slice(),
            [command] => SUBCOMMANDS
                .iter()
                .find(|(name, _)| name == command)
                .map(|(_, subcommands)| *subcommands)
                .unwrap_or_default(),
            _ => Default::default(),
        };
        let matching = options
            .iter()
            .copied()
            .filter(|option| option.starts_with(&word))
            .collect();
        (start, matching)
    }
}

impl Completer for TallyHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = self.candidates(&line[..pos]);
        let pairs = words
            .into_iter()
            .map(|word| Pair {
                display: word.to_string(),
                replacement: word.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}
