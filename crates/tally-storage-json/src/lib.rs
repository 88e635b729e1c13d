//! tally-storage-json
//!
//! Single-file JSON persistence implementing every collaborator trait of
//! `tally-core`. The file is the store of record: every read reloads it, and
//! every mutation holds an exclusive advisory lock on a sibling `.lock` file
//! while it reloads, applies the change to a copy, writes it and publishes it.
//! Separate handles and separate processes on the same file therefore see each
//! other's commits, and a failed write leaves neither the file nor the
//! in-memory view changed.

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use advisory_lock::{AdvisoryFileLock, FileLockMode};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use tally_core::{
    BudgetStore, CategoryLookup, CoreError, LedgerStore, OccurrenceCommit, RecurrenceStore,
};
use tally_domain::{
    BudgetDefinition, BudgetWithCategory, Category, LedgerEntry, RecurrenceDefinition,
};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
const TMP_SUFFIX: &str = "tmp";
const LOCK_SUFFIX: &str = "lock";

/// Everything the store persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "Snapshot::schema_version_default")]
    pub schema_version: u32,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub recurrences: Vec<RecurrenceDefinition>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub budgets: Vec<BudgetDefinition>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            categories: Vec::new(),
            recurrences: Vec::new(),
            entries: Vec::new(),
            budgets: Vec::new(),
        }
    }
}

impl Snapshot {
    fn schema_version_default() -> u32 {
        SNAPSHOT_SCHEMA_VERSION
    }

    fn recurrence_mut(&mut self, id: Uuid) -> Result<&mut RecurrenceDefinition, CoreError> {
        self.recurrences
            .iter_mut()
            .find(|definition| definition.id == id)
            .ok_or(CoreError::RecurrenceNotFound(id))
    }

    fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    fn budget_mut(&mut self, id: Uuid) -> Result<&mut BudgetDefinition, CoreError> {
        self.budgets
            .iter_mut()
            .find(|budget| budget.id == id)
            .ok_or(CoreError::BudgetNotFound(id))
    }
}

/// JSON-file backed store. `in_memory` stores never touch the filesystem.
pub struct JsonStore {
    path: Option<PathBuf>,
    snapshot: Mutex<Snapshot>,
}

impl JsonStore {
    /// Opens the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let snapshot = read_if_present(&path)?.unwrap_or_default();
        debug!(
            path = %path.display(),
            recurrences = snapshot.recurrences.len(),
            entries = snapshot.entries.len(),
            "store opened"
        );
        Ok(Self {
            path: Some(path),
            snapshot: Mutex::new(snapshot),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers a category. Names are unique, ignoring case.
    pub fn add_category(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Category, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("category name cannot be empty".into()));
        }
        self.mutate(|snapshot| {
            if snapshot
                .categories
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(name))
            {
                return Err(CoreError::Validation(format!(
                    "category `{name}` already exists"
                )));
            }
            let mut category = Category::new(name);
            category.description = description;
            snapshot.categories.push(category.clone());
            Ok(category)
        })
    }

    /// Categories sorted by name.
    pub fn list_categories(&self) -> Result<Vec<Category>, CoreError> {
        let mut categories = self.read()?.categories.clone();
        categories.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(categories)
    }

    /// Looks a category up by exact id or case-insensitive name.
    pub fn resolve_category(&self, key: &str) -> Result<Option<Category>, CoreError> {
        let snapshot = self.read()?;
        let by_id = Uuid::parse_str(key.trim())
            .ok()
            .and_then(|id| snapshot.category(id).cloned());
        Ok(by_id.or_else(|| {
            snapshot
                .categories
                .iter()
                .find(|category| category.name.eq_ignore_ascii_case(key.trim()))
                .cloned()
        }))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Snapshot>, CoreError> {
        self.snapshot
            .lock()
            .map_err(|_| CoreError::Storage("store lock poisoned".into()))
    }

    /// The snapshot as currently persisted. A file that does not exist yet keeps
    /// the in-memory view.
    fn read(&self) -> Result<MutexGuard<'_, Snapshot>, CoreError> {
        let mut current = self.lock()?;
        self.refresh(&mut current)?;
        Ok(current)
    }

    fn refresh(&self, snapshot: &mut Snapshot) -> Result<(), CoreError> {
        if let Some(on_disk) = self.path.as_deref().map(read_if_present).transpose()?.flatten() {
            *snapshot = on_disk;
        }
        Ok(())
    }

    /// Applies `apply` to a fresh copy of the persisted snapshot under the
    /// write lock, persists it and publishes it.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Snapshot) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut current = self.lock()?;
        let _write_lock = match &self.path {
            Some(path) => Some(WriteLock::acquire(path)?),
            None => None,
        };
        self.refresh(&mut current)?;
        let mut draft = current.clone();
        let outcome = apply(&mut draft)?;
        if let Some(path) = &self.path {
            save_snapshot(&draft, path)?;
        }
        *current = draft;
        Ok(outcome)
    }
}

impl CategoryLookup for JsonStore {
    fn category_exists(&self, id: Uuid) -> Result<bool, CoreError> {
        Ok(self.read()?.category(id).is_some())
    }

    fn category_name(&self, id: Uuid) -> Result<Option<String>, CoreError> {
        Ok(self.read()?.category(id).map(|category| category.name.clone()))
    }
}

impl LedgerStore for JsonStore {
    fn insert_entry(&self, entry: LedgerEntry) -> Result<Uuid, CoreError> {
        let id = entry.id;
        self.mutate(|snapshot| {
            snapshot.entries.push(entry);
            Ok(id)
        })
    }

    fn sum_amount(&self, category_id: Uuid, year: i32, month: u32) -> Result<Decimal, CoreError> {
        let snapshot = self.read()?;
        Ok(snapshot
            .entries
            .iter()
            .filter(|entry| {
                entry.category_id == category_id
                    && entry.date.year() == year
                    && entry.date.month() == month
            })
            .map(|entry| entry.amount)
            .fold(Decimal::ZERO, |total, amount| {
                total.checked_add(amount).unwrap_or(Decimal::MAX)
            }))
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, CoreError> {
        let mut entries = self.read()?.entries.clone();
        entries.sort_by_key(|entry| entry.date);
        Ok(entries)
    }
}

impl RecurrenceStore for JsonStore {
    fn find_due(&self, as_of: NaiveDate) -> Result<Vec<RecurrenceDefinition>, CoreError> {
        let mut due: Vec<_> = self
            .read()?
            .recurrences
            .iter()
            .filter(|definition| definition.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by_key(|definition| definition.id);
        Ok(due)
    }

    fn get_recurrence(&self, id: Uuid) -> Result<Option<RecurrenceDefinition>, CoreError> {
        Ok(self
            .read()?
            .recurrences
            .iter()
            .find(|definition| definition.id == id)
            .cloned())
    }

    fn list_recurrences(&self) -> Result<Vec<RecurrenceDefinition>, CoreError> {
        let mut definitions = self.read()?.recurrences.clone();
        definitions.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(definitions)
    }

    fn insert_recurrence(
        &self,
        definition: RecurrenceDefinition,
    ) -> Result<RecurrenceDefinition, CoreError> {
        self.mutate(|snapshot| {
            if snapshot
                .recurrences
                .iter()
                .any(|existing| existing.id == definition.id)
            {
                return Err(CoreError::Validation(format!(
                    "recurrence {} already exists",
                    definition.id
                )));
            }
            snapshot.recurrences.push(definition.clone());
            Ok(definition)
        })
    }

    fn save_recurrence(
        &self,
        mut definition: RecurrenceDefinition,
        expected_version: u64,
    ) -> Result<RecurrenceDefinition, CoreError> {
        self.mutate(|snapshot| {
            let stored = snapshot.recurrence_mut(definition.id)?;
            if stored.version != expected_version {
                return Err(CoreError::Conflict {
                    id: definition.id,
                    expected_version,
                });
            }
            definition.version = expected_version + 1;
            *stored = definition.clone();
            Ok(definition)
        })
    }

    fn delete_recurrence(&self, id: Uuid) -> Result<(), CoreError> {
        self.mutate(|snapshot| {
            let before = snapshot.recurrences.len();
            snapshot.recurrences.retain(|definition| definition.id != id);
            if snapshot.recurrences.len() == before {
                return Err(CoreError::RecurrenceNotFound(id));
            }
            Ok(())
        })
    }

    fn commit_occurrence(&self, commit: OccurrenceCommit) -> Result<LedgerEntry, CoreError> {
        self.mutate(|snapshot| {
            let definition = snapshot.recurrence_mut(commit.recurrence_id)?;
            if definition.version != commit.expected_version
                || definition.next_date != commit.expected_next_date
            {
                return Err(CoreError::Conflict {
                    id: commit.recurrence_id,
                    expected_version: commit.expected_version,
                });
            }
            definition.next_date = commit.next_date;
            definition.version += 1;
            snapshot.entries.push(commit.entry.clone());
            Ok(commit.entry)
        })
    }
}

impl BudgetStore for JsonStore {
    fn find_by_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<BudgetWithCategory>, CoreError> {
        let snapshot = self.read()?;
        let mut rows: Vec<_> = snapshot
            .budgets
            .iter()
            .filter(|budget| budget.year == year && budget.month == month)
            .filter_map(|budget| match snapshot.category(budget.category_id) {
                Some(category) => Some(BudgetWithCategory {
                    budget: budget.clone(),
                    category_name: category.name.clone(),
                }),
                None => {
                    warn!(
                        budget = %budget.id,
                        category = %budget.category_id,
                        period = %budget.period(),
                        "budget references a missing category; left out of status"
                    );
                    None
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            a.category_name
                .cmp(&b.category_name)
                .then(a.budget.category_id.cmp(&b.budget.category_id))
        });
        Ok(rows)
    }

    fn find_budget(
        &self,
        category_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Option<BudgetDefinition>, CoreError> {
        Ok(self
            .read()?
            .budgets
            .iter()
            .find(|budget| {
                budget.category_id == category_id && budget.year == year && budget.month == month
            })
            .cloned())
    }

    fn get_budget(&self, id: Uuid) -> Result<Option<BudgetDefinition>, CoreError> {
        Ok(self
            .read()?
            .budgets
            .iter()
            .find(|budget| budget.id == id)
            .cloned())
    }

    fn list_budgets(&self) -> Result<Vec<BudgetDefinition>, CoreError> {
        let mut budgets = self.read()?.budgets.clone();
        budgets.sort_by(|a, b| {
            b.period()
                .cmp(&a.period())
                .then(a.category_id.cmp(&b.category_id))
        });
        Ok(budgets)
    }

    fn insert_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError> {
        self.mutate(|snapshot| {
            if snapshot
                .budgets
                .iter()
                .any(|existing| existing.collides_with(&budget))
            {
                return Err(CoreError::DuplicateBudget {
                    category_id: budget.category_id,
                    period: budget.period(),
                });
            }
            snapshot.budgets.push(budget.clone());
            Ok(budget)
        })
    }

    fn save_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError> {
        self.mutate(|snapshot| {
            if snapshot
                .budgets
                .iter()
                .any(|existing| existing.id != budget.id && existing.collides_with(&budget))
            {
                return Err(CoreError::DuplicateBudget {
                    category_id: budget.category_id,
                    period: budget.period(),
                });
            }
            *snapshot.budget_mut(budget.id)? = budget.clone();
            Ok(budget)
        })
    }

    fn delete_budget(&self, id: Uuid) -> Result<(), CoreError> {
        self.mutate(|snapshot| {
            let before = snapshot.budgets.len();
            snapshot.budgets.retain(|budget| budget.id != id);
            if snapshot.budgets.len() == before {
                return Err(CoreError::BudgetNotFound(id));
            }
            Ok(())
        })
    }
}

/// Exclusive advisory lock on `<data file>.lock`, held for one mutation.
///
/// The data file itself is replaced by rename on every write, so the lock
/// lives on a sibling that is never renamed. Closing the file releases it.
struct WriteLock {
    file: File,
}

impl WriteLock {
    fn acquire(data_path: &Path) -> Result<Self, CoreError> {
        let path = sibling_path(data_path, LOCK_SUFFIX);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        AdvisoryFileLock::lock(&file, FileLockMode::Exclusive)
            .map_err(|err| CoreError::Storage(format!("cannot lock {}: {err:?}", path.display())))?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(err) = AdvisoryFileLock::unlock(&self.file) {
            debug!(error = ?err, "advisory unlock failed; released on close");
        }
    }
}

fn read_if_present(path: &Path) -> Result<Option<Snapshot>, CoreError> {
    if path.exists() {
        load_snapshot(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Loads a snapshot from the provided filesystem path.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Writes a snapshot next to `path` and renames it into place.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), CoreError> {
    let json =
        serde_json::to_string_pretty(snapshot).map_err(|err| CoreError::Serde(err.to_string()))?;
    let tmp = sibling_path(path, TMP_SUFFIX);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = json.len(), "snapshot persisted");
    Ok(())
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut sibling = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{suffix}"),
        None => suffix.to_string(),
    };
    sibling.set_extension(ext);
    sibling
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
