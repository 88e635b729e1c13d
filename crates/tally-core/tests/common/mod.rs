#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tally_core::{
    BudgetStore, CategoryLookup, CoreError, LedgerStore, OccurrenceCommit, RecurrenceStore,
};
use tally_domain::{BudgetDefinition, BudgetWithCategory, Category, LedgerEntry, RecurrenceDefinition};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Default)]
struct State {
    categories: BTreeMap<Uuid, Category>,
    recurrences: BTreeMap<Uuid, RecurrenceDefinition>,
    entries: Vec<LedgerEntry>,
    budgets: Vec<BudgetDefinition>,
}

/// In-memory collaborator with hooks for injecting failures and races.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
    failing_commits: Mutex<HashSet<Uuid>>,
    racing_commits: Mutex<HashSet<Uuid>>,
    pub budget_queries: AtomicUsize,
    pub unavailable: Mutex<bool>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, name: &str) -> Uuid {
        let category = Category::new(name);
        let id = category.id;
        self.state.lock().unwrap().categories.insert(id, category);
        id
    }

    pub fn remove_category(&self, id: Uuid) {
        self.state.lock().unwrap().categories.remove(&id);
    }

    pub fn add_recurrence(&self, definition: RecurrenceDefinition) -> RecurrenceDefinition {
        self.insert_recurrence(definition).unwrap()
    }

    pub fn add_entry(&self, entry: LedgerEntry) {
        self.state.lock().unwrap().entries.push(entry);
    }

    pub fn add_budget(&self, budget: BudgetDefinition) {
        self.state.lock().unwrap().budgets.push(budget);
    }

    pub fn recurrence(&self, id: Uuid) -> RecurrenceDefinition {
        self.state.lock().unwrap().recurrences[&id].clone()
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Makes the next commits for `id` fail as if the transaction could not be written.
    pub fn fail_commits_for(&self, id: Uuid) {
        self.failing_commits.lock().unwrap().insert(id);
    }

    /// Simulates another writer advancing `id` between the scan and the commit.
    pub fn race_commit_for(&self, id: Uuid) {
        self.racing_commits.lock().unwrap().insert(id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    fn check_available(&self) -> Result<(), CoreError> {
        if *self.unavailable.lock().unwrap() {
            Err(CoreError::Storage("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl CategoryLookup for FakeStore {
    fn category_exists(&self, id: Uuid) -> Result<bool, CoreError> {
        Ok(self.state.lock().unwrap().categories.contains_key(&id))
    }

    fn category_name(&self, id: Uuid) -> Result<Option<String>, CoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .categories
            .get(&id)
            .map(|category| category.name.clone()))
    }
}

impl LedgerStore for FakeStore {
    fn insert_entry(&self, entry: LedgerEntry) -> Result<Uuid, CoreError> {
        let id = entry.id;
        self.state.lock().unwrap().entries.push(entry);
        Ok(id)
    }

    fn sum_amount(&self, category_id: Uuid, year: i32, month: u32) -> Result<Decimal, CoreError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|entry| {
                entry.category_id == category_id
                    && entry.date.year() == year
                    && entry.date.month() == month
            })
            .map(|entry| entry.amount)
            .sum())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, CoreError> {
        Ok(self.state.lock().unwrap().entries.clone())
    }
}

impl RecurrenceStore for FakeStore {
    fn find_due(&self, as_of: NaiveDate) -> Result<Vec<RecurrenceDefinition>, CoreError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .recurrences
            .values()
            .filter(|definition| definition.is_due(as_of))
            .cloned()
            .collect())
    }

    fn get_recurrence(&self, id: Uuid) -> Result<Option<RecurrenceDefinition>, CoreError> {
        Ok(self.state.lock().unwrap().recurrences.get(&id).cloned())
    }

    fn list_recurrences(&self) -> Result<Vec<RecurrenceDefinition>, CoreError> {
        Ok(self.state.lock().unwrap().recurrences.values().cloned().collect())
    }

    fn insert_recurrence(
        &self,
        definition: RecurrenceDefinition,
    ) -> Result<RecurrenceDefinition, CoreError> {
        self.state
            .lock()
            .unwrap()
            .recurrences
            .insert(definition.id, definition.clone());
        Ok(definition)
    }

    fn save_recurrence(
        &self,
        mut definition: RecurrenceDefinition,
        expected_version: u64,
    ) -> Result<RecurrenceDefinition, CoreError> {
        let mut state = self.state.lock().unwrap();
        let current = state
            .recurrences
            .get(&definition.id)
            .ok_or(CoreError::RecurrenceNotFound(definition.id))?;
        if current.version != expected_version {
            return Err(CoreError::Conflict {
                id: definition.id,
                expected_version,
            });
        }
        definition.version = expected_version + 1;
        state.recurrences.insert(definition.id, definition.clone());
        Ok(definition)
    }

    fn delete_recurrence(&self, id: Uuid) -> Result<(), CoreError> {
        self.state.lock().unwrap().recurrences.remove(&id);
        Ok(())
    }

    fn commit_occurrence(&self, commit: OccurrenceCommit) -> Result<LedgerEntry, CoreError> {
        if self.failing_commits.lock().unwrap().contains(&commit.recurrence_id) {
            return Err(CoreError::Storage("commit rejected".into()));
        }
        let mut state = self.state.lock().unwrap();
        if self.racing_commits.lock().unwrap().remove(&commit.recurrence_id) {
            if let Some(definition) = state.recurrences.get_mut(&commit.recurrence_id) {
                definition.version += 1;
            }
        }
        let definition = state
            .recurrences
            .get_mut(&commit.recurrence_id)
            .ok_or(CoreError::RecurrenceNotFound(commit.recurrence_id))?;
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
        state.entries.push(commit.entry.clone());
        Ok(commit.entry)
    }
}

impl BudgetStore for FakeStore {
    fn find_by_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<BudgetWithCategory>, CoreError> {
        self.budget_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .budgets
            .iter()
            .filter(|budget| budget.year == year && budget.month == month)
            .filter_map(|budget| {
                state.categories.get(&budget.category_id).map(|category| BudgetWithCategory {
                    budget: budget.clone(),
                    category_name: category.name.clone(),
                })
            })
            .collect())
    }

    fn find_budget(
        &self,
        category_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Option<BudgetDefinition>, CoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .budgets
            .iter()
            .find(|budget| {
                budget.category_id == category_id && budget.year == year && budget.month == month
            })
            .cloned())
    }

    fn get_budget(&self, id: Uuid) -> Result<Option<BudgetDefinition>, CoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .budgets
            .iter()
            .find(|budget| budget.id == id)
            .cloned())
    }

    fn list_budgets(&self) -> Result<Vec<BudgetDefinition>, CoreError> {
        Ok(self.state.lock().unwrap().budgets.clone())
    }

    fn save_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .budgets
            .iter()
            .any(|existing| existing.id != budget.id && existing.collides_with(&budget))
        {
            return Err(CoreError::DuplicateBudget {
                category_id: budget.category_id,
                period: budget.period(),
            });
        }
        let slot = state
            .budgets
            .iter_mut()
            .find(|existing| existing.id == budget.id)
            .ok_or(CoreError::BudgetNotFound(budget.id))?;
        *slot = budget.clone();
        Ok(budget)
    }

    fn delete_budget(&self, id: Uuid) -> Result<(), CoreError> {
        self.state.lock().unwrap().budgets.retain(|budget| budget.id != id);
        Ok(())
    }

    fn insert_budget(&self, budget: BudgetDefinition) -> Result<BudgetDefinition, CoreError> {
        let mut state = self.state.lock().unwrap();
        if state.budgets.iter().any(|existing| existing.collides_with(&budget)) {
            return Err(CoreError::DuplicateBudget {
                category_id: budget.category_id,
                period: budget.period(),
            });
        }
        state.budgets.push(budget.clone());
        Ok(budget)
    }
}
