use crate::cli::errors::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// One top-level shell command.
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub run: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        summary: &'static str,
        usage: &'static str,
        run: CommandHandler,
    ) -> Self {
        Self {
            name,
            summary,
            usage,
            run,
        }
    }
}

/// Commands in the order they were registered. A later entry with the same
/// name replaces the earlier one in place.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        match self.entries.iter_mut().find(|known| known.name == entry.name) {
            Some(known) => *known = entry,
            None => self.entries.push(entry),
        }
    }

    /// Exact, lowercase lookup.
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }
}
