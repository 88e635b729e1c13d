//! Shell state shared by every command handler.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use strsim::levenshtein;
use uuid::Uuid;

use tally_config::{Config, ConfigManager};
use tally_core::{BudgetStore, Clock, RecurrenceStore};
use tally_domain::{BudgetDefinition, Category, RecurrenceDefinition};
use tally_storage_json::JsonStore;

use crate::cli::commands;
use crate::cli::errors::{CliError, CommandError, CommandResult};
use crate::cli::output::{self, OutputPreferences};
use crate::cli::registry::{CommandEntry, CommandRegistry};
use crate::utils::SystemClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub struct ShellContext {
    mode: CliMode,
    pub(crate) registry: CommandRegistry,
    config_manager: ConfigManager,
    config: Config,
    store: JsonStore,
    clock: Arc<dyn Clock>,
    pub(crate) running: bool,
}

impl ShellContext {
    /// Opens the snapshot named by `config` and wires the wall clock.
    pub fn open(mode: CliMode, manager: ConfigManager, config: Config) -> Result<Self, CliError> {
        let store = JsonStore::open(manager.data_file(&config))?;
        Ok(Self::with_parts(
            mode,
            manager,
            config,
            store,
            Arc::new(SystemClock),
        ))
    }

    pub fn with_parts(
        mode: CliMode,
        config_manager: ConfigManager,
        config: Config,
        store: JsonStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);
        let context = Self {
            mode,
            registry,
            config_manager,
            config,
            store,
            clock,
            running: true,
        };
        context.apply_output_preferences();
        context
    }

    pub fn mode(&self) -> CliMode {
        self.mode
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn prompt(&self) -> String {
        "tally> ".into()
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    /// Persists a config change. A new `data_file` takes effect immediately.
    pub(crate) fn update_config(&mut self, config: Config) -> CommandResult {
        let data_file_changed = config.data_file != self.config.data_file;
        self.config_manager.save(&config)?;
        if data_file_changed {
            let path = self.config_manager.data_file(&config);
            self.store = JsonStore::open(&path)?;
            output::info(format!("Using data file {}", path.display()));
        }
        self.config = config;
        self.apply_output_preferences();
        Ok(())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(entry) = self.registry.get(command).copied() {
            match (entry.run)(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, &needle), name))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            other => output::error(other),
        }
    }

    pub(crate) fn format_amount(&self, amount: Decimal) -> String {
        format!("{:.2} {}", amount, self.config.currency)
    }

    /// Finds a category by name or id.
    pub(crate) fn require_category(&self, key: &str) -> Result<Category, CommandError> {
        self.store
            .resolve_category(key)?
            .ok_or_else(|| CommandError::InvalidArguments(format!("unknown category `{}`", key)))
    }

    /// Finds a recurrence by full id or by a unique prefix of its short id.
    /// Resolves a recurrence by full id or by a unique id prefix of at least 4 characters.
    pub(crate) fn require_recurrence(
        &self,
        key: &str,
    ) -> Result<RecurrenceDefinition, CommandError> {
        let candidates = self.store.list_recurrences()?;
        match_id_prefix(key, "recurrence", candidates, |definition| definition.id)
    }

    pub(crate) fn require_budget(&self, key: &str) -> Result<BudgetDefinition, CommandError> {
        let candidates = self.store.list_budgets()?;
        match_id_prefix(key, "budget", candidates, |budget| budget.id)
    }

    fn apply_output_preferences(&self) {
        output::set_preferences(OutputPreferences {
            color_enabled: self.config.ui_color_enabled && self.mode == CliMode::Interactive,
        });
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        crate::cli::shell::handle_line(self, line)
    }
}

fn match_id_prefix<T>(
    key: &str,
    kind: &str,
    candidates: Vec<T>,
    id_of: impl Fn(&T) -> Uuid,
) -> Result<T, CommandError> {
    let key = key.trim();
    let mut matches: Vec<T> = match Uuid::parse_str(key) {
        Ok(id) => candidates.into_iter().filter(|item| id_of(item) == id).collect(),
        Err(_) => {
            let needle = key.to_ascii_lowercase();
            if needle.len() < 4 {
                return Err(CommandError::InvalidArguments(format!(
                    "{kind} id prefix must have at least 4 characters"
                )));
            }
            candidates
                .into_iter()
                .filter(|item| id_of(item).simple().to_string().starts_with(&needle))
                .collect()
        }
    };
    match matches.len() {
        0 => Err(CommandError::InvalidArguments(format!("unknown {kind} `{key}`"))),
        1 => Ok(matches.remove(0)),
        _ => Err(CommandError::InvalidArguments(format!(
            "{kind} id `{key}` is ambiguous"
        ))),
    }
}

pub(crate) fn short_id(id: Uuid) -> String {
    let mut short = id.simple().to_string();
    short.truncate(8);
    short
}
