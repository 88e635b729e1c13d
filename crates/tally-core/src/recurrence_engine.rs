//! Materializes due recurrences into ledger entries.
//!
//! A run advances each due definition by exactly one period, no matter how many
//! periods have elapsed. Callers that want to clear a backlog use
//! [`RecurrenceEngine::catch_up`], which repeats single-step runs.

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tally_domain::{calendar, LedgerEntry, RecurrenceDefinition};

use crate::{CategoryLookup, Clock, CoreError, OccurrenceCommit, RecurrenceStore};

/// Outcome of one or more engine passes.
#[derive(Debug)]
pub struct RunReport {
    pub as_of: NaiveDate,
    /// Created entries in processing order.
    pub entries: Vec<LedgerEntry>,
    /// Definitions skipped because another writer advanced them first.
    pub conflicts: Vec<Uuid>,
    pub failures: Vec<RecurrenceFailure>,
    pub passes: u32,
}

impl RunReport {
    fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            entries: Vec::new(),
            conflicts: Vec::new(),
            failures: Vec::new(),
            passes: 0,
        }
    }

    pub fn generated(&self) -> usize {
        self.entries.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, other: RunReport) {
        self.entries.extend(other.entries);
        self.conflicts.extend(other.conflicts);
        self.failures.extend(other.failures);
        self.passes += other.passes;
    }
}

/// A definition whose occurrence could not be committed.
#[derive(Debug)]
pub struct RecurrenceFailure {
    pub recurrence_id: Uuid,
    pub error: CoreError,
}

/// The schedule a definition moves to once its current occurrence is recorded.
///
/// Advances one period. When that passes `end_date`, the schedule is pinned to
/// the day after `end_date` so the definition is never due again.
pub fn next_scheduled(definition: &RecurrenceDefinition) -> NaiveDate {
    let advanced = calendar::advance(definition.next_date, definition.interval);
    match definition.end_date {
        Some(end) if advanced > end => calendar::day_after(end),
        _ => advanced,
    }
}

pub struct RecurrenceEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> RecurrenceEngine<'a, S>
where
    S: RecurrenceStore + CategoryLookup + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Creates one entry per due definition and advances each schedule once.
    ///
    /// Only a failed due-scan is returned as `Err`. Failures scoped to one
    /// definition are collected in the report and the run moves on.
    pub fn run(&self, as_of: NaiveDate) -> Result<RunReport, CoreError> {
        let due = self.store.find_due(as_of)?;
        info!(%as_of, due = due.len(), "recurrence run started");

        let mut report = RunReport::new(as_of);
        report.passes = 1;
        for definition in due {
            match self.materialize(&definition) {
                Ok(entry) => {
                    debug!(
                        recurrence = %definition.id,
                        date = %entry.date,
                        amount = %entry.amount,
                        "occurrence committed"
                    );
                    report.entries.push(entry);
                }
                Err(err) if err.is_conflict() => {
                    warn!(recurrence = %definition.id, "skipping recurrence: {err}");
                    report.conflicts.push(definition.id);
                }
                Err(err) => {
                    error!(recurrence = %definition.id, "recurrence failed: {err}");
                    report.failures.push(RecurrenceFailure {
                        recurrence_id: definition.id,
                        error: err,
                    });
                }
            }
        }

        info!(
            %as_of,
            generated = report.entries.len(),
            conflicts = report.conflicts.len(),
            failures = report.failures.len(),
            "recurrence run finished"
        );
        Ok(report)
    }

    /// Runs against the clock's current date.
    pub fn run_today(&self, clock: &dyn Clock) -> Result<RunReport, CoreError> {
        self.run(clock.today())
    }

    /// Repeats [`run`](Self::run) with the same `as_of` until a pass creates
    /// nothing or `max_passes` passes have been made.
    pub fn catch_up(&self, as_of: NaiveDate, max_passes: u32) -> Result<RunReport, CoreError> {
        let mut combined = RunReport::new(as_of);
        for _ in 0..max_passes.max(1) {
            let pass = self.run(as_of)?;
            let created = pass.generated();
            combined.absorb(pass);
            if created == 0 {
                break;
            }
        }
        if combined.passes >= max_passes.max(1) && !self.store.find_due(as_of)?.is_empty() {
            warn!(%as_of, passes = combined.passes, "catch-up stopped with recurrences still due");
        }
        Ok(combined)
    }

    fn materialize(&self, definition: &RecurrenceDefinition) -> Result<LedgerEntry, CoreError> {
        if !self.store.category_exists(definition.category_id)? {
            return Err(CoreError::CategoryNotFound(definition.category_id));
        }
        self.store.commit_occurrence(OccurrenceCommit {
            recurrence_id: definition.id,
            expected_version: definition.version,
            expected_next_date: definition.next_date,
            entry: definition.occurrence_entry(),
            next_date: next_scheduled(definition),
        })
    }
}
