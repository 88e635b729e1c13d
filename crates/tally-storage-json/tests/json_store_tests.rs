use std::fs;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tally_core::{
    next_scheduled, BudgetAggregator, BudgetChanges, BudgetService, BudgetStore, CoreError,
    LedgerStore, NewBudget, OccurrenceCommit, RecurrenceEngine, RecurrenceStore,
};
use tally_domain::{Interval, LedgerEntry, RecurrenceDefinition};
use tally_storage_json::{load_snapshot, JsonStore, SNAPSHOT_SCHEMA_VERSION};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn opening_missing_file_starts_empty() {
    let dir = tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path().join("tally.json")).expect("open");

    assert!(store.list_categories().unwrap().is_empty());
    assert!(store.list_recurrences().unwrap().is_empty());
    assert!(!dir.path().join("tally.json").exists());
}

#[test]
fn committed_state_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let store = JsonStore::open(&path).expect("open");
    let rent = store.add_category("Housing", None).expect("category");
    let definition = store
        .insert_recurrence(RecurrenceDefinition::new(
            "Rent",
            dec!(1200),
            rent.id,
            Interval::Monthly,
            date(2024, 1, 31),
        ))
        .expect("recurrence");

    let report = RecurrenceEngine::new(&store)
        .run(date(2024, 2, 1))
        .expect("run");
    assert_eq!(report.generated(), 1);
    drop(store);

    let reopened = JsonStore::open(&path).expect("reopen");
    let stored = reopened
        .get_recurrence(definition.id)
        .unwrap()
        .expect("definition persisted");
    assert_eq!(stored.next_date, date(2024, 2, 29));
    assert_eq!(stored.version, definition.version + 1);

    let entries = reopened.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, date(2024, 1, 31));
    assert_eq!(entries[0].amount, dec!(1200));
    assert_eq!(entries[0].source_recurrence, Some(definition.id));
    assert!(!dir.path().join("tally.json.tmp").exists());
}

#[test]
fn failed_write_publishes_nothing() {
    let dir = tempdir().expect("tempdir");
    let data_dir = dir.path().join("data");
    let store = JsonStore::open(data_dir.join("tally.json")).expect("open");
    let gym = store.add_category("Fitness", None).expect("category");
    let definition = store
        .insert_recurrence(RecurrenceDefinition::new(
            "Gym",
            dec!(30),
            gym.id,
            Interval::Weekly,
            date(2024, 3, 4),
        ))
        .expect("recurrence");

    fs::remove_dir_all(&data_dir).expect("remove data dir");
    fs::write(&data_dir, "not a directory").expect("block data dir");

    let report = RecurrenceEngine::new(&store)
        .run(date(2024, 3, 4))
        .expect("scan still succeeds");

    assert_eq!(report.generated(), 0);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0].error, CoreError::Io(_)));
    let stored = store.get_recurrence(definition.id).unwrap().unwrap();
    assert_eq!(stored.next_date, date(2024, 3, 4));
    assert_eq!(stored.version, definition.version);
    assert!(store.entries().unwrap().is_empty());
}

#[test]
fn stale_commit_is_rejected_as_conflict() {
    let store = JsonStore::in_memory();
    let food = store.add_category("Food", None).expect("category");
    let definition = store
        .insert_recurrence(RecurrenceDefinition::new(
            "Box",
            dec!(60),
            food.id,
            Interval::Biweekly,
            date(2024, 5, 1),
        ))
        .expect("recurrence");

    let mut stale = definition.clone();
    stale.amount = dec!(65);
    store
        .save_recurrence(stale.clone(), definition.version)
        .expect("first save");
    let err = store
        .save_recurrence(stale, definition.version)
        .expect_err("second save is stale");

    assert!(err.is_conflict());
}

#[test]
fn budgets_are_unique_per_category_and_month() {
    let store = JsonStore::in_memory();
    let food = store.add_category("Food", None).expect("category");
    let request = NewBudget {
        category_id: food.id,
        year: 2024,
        month: 4,
        amount: dec!(500),
    };

    BudgetService::create(&store, request.clone()).expect("first budget");
    let err = BudgetService::create(&store, request).expect_err("duplicate");
    assert!(matches!(err, CoreError::DuplicateBudget { .. }));
    assert_eq!(store.list_budgets().unwrap().len(), 1);
}

#[test]
fn status_reports_rows_sorted_by_category_name() {
    let store = JsonStore::in_memory();
    let travel = store.add_category("Travel", None).expect("category");
    let food = store.add_category("Food", None).expect("category");
    for category in [travel.id, food.id] {
        BudgetService::create(
            &store,
            NewBudget {
                category_id: category,
                year: 2024,
                month: 2,
                amount: dec!(300),
            },
        )
        .expect("budget");
    }
    store
        .insert_entry(LedgerEntry::new(food.id, date(2024, 2, 29), dec!(75)))
        .expect("entry");
    store
        .insert_entry(LedgerEntry::new(food.id, date(2024, 3, 1), dec!(75)))
        .expect("entry");

    let statuses = BudgetAggregator::new(&store).status(2024, 2).expect("status");

    let names: Vec<_> = statuses.iter().map(|s| s.category_name.as_str()).collect();
    assert_eq!(names, ["Food", "Travel"]);
    assert_eq!(statuses[0].total_spent, dec!(75));
    assert_eq!(statuses[0].percent, dec!(25));
    assert_eq!(statuses[1].total_spent, dec!(0));
    assert_eq!(statuses[1].percent, dec!(0));
}

#[test]
fn category_names_are_unique_and_resolvable() {
    let store = JsonStore::in_memory();
    let food = store.add_category("Food", None).expect("category");

    assert!(matches!(
        store.add_category("food", None),
        Err(CoreError::Validation(_))
    ));
    assert_eq!(store.resolve_category("FOOD").unwrap(), Some(food.clone()));
    assert_eq!(
        store.resolve_category(&food.id.to_string()).unwrap(),
        Some(food)
    );
    assert_eq!(store.resolve_category("Travel").unwrap(), None);
}

#[test]
fn corrupt_snapshot_is_a_serde_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    fs::write(&path, "{ not json").expect("write");

    assert!(matches!(JsonStore::open(&path), Err(CoreError::Serde(_))));
}

#[test]
fn parallel_catch_up_never_duplicates_occurrences() {
    let dir = tempdir().expect("tempdir");
    let store = JsonStore::open(dir.path().join("tally.json")).expect("open");
    let bills = store.add_category("Bills", None).expect("category");
    for day in 1..=4 {
        store
            .insert_recurrence(RecurrenceDefinition::new(
                format!("Bill {day}"),
                dec!(10),
                bills.id,
                Interval::Monthly,
                date(2024, 1, day),
            ))
            .expect("recurrence");
    }

    std::thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                RecurrenceEngine::new(&store)
                    .catch_up(date(2024, 3, 15), 50)
                    .expect("catch up");
            });
        }
    });

    // January, February and March for each of the four bills.
    assert_eq!(store.entries().unwrap().len(), 12);
    for definition in store.list_recurrences().unwrap() {
        assert_eq!(definition.next_date.format("%m").to_string(), "04");
    }
}

fn seeded_rent(path: &std::path::Path) -> RecurrenceDefinition {
    let store = JsonStore::open(path).expect("open");
    let housing = store.add_category("Housing", None).expect("category");
    store
        .insert_recurrence(RecurrenceDefinition::new(
            "Rent",
            dec!(1200),
            housing.id,
            Interval::Monthly,
            date(2024, 1, 31),
        ))
        .expect("recurrence")
}

#[test]
fn separate_handles_generate_each_occurrence_once() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let definition = seeded_rent(&path);
    let first = JsonStore::open(&path).expect("first handle");
    let second = JsonStore::open(&path).expect("second handle");

    let a = RecurrenceEngine::new(&first).run(date(2024, 2, 1)).expect("run a");
    let b = RecurrenceEngine::new(&second).run(date(2024, 2, 1)).expect("run b");

    assert_eq!(a.generated() + b.generated(), 1);
    let on_disk = load_snapshot(&path).expect("load");
    assert_eq!(on_disk.entries.len(), 1);
    assert_eq!(on_disk.entries[0].source_recurrence, Some(definition.id));
    assert_eq!(on_disk.recurrences[0].next_date, date(2024, 2, 29));
    assert_eq!(second.entries().unwrap(), first.entries().unwrap());
}

#[test]
fn commit_from_a_stale_scan_on_another_handle_conflicts() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let definition = seeded_rent(&path);
    let first = JsonStore::open(&path).expect("first handle");
    let second = JsonStore::open(&path).expect("second handle");

    let scanned = second.find_due(date(2024, 2, 1)).expect("scan").remove(0);
    RecurrenceEngine::new(&first).run(date(2024, 2, 1)).expect("run");

    let err = second
        .commit_occurrence(OccurrenceCommit {
            recurrence_id: scanned.id,
            expected_version: scanned.version,
            expected_next_date: scanned.next_date,
            entry: scanned.occurrence_entry(),
            next_date: next_scheduled(&scanned),
        })
        .expect_err("already advanced by the other handle");

    assert!(err.is_conflict());
    let on_disk = load_snapshot(&path).expect("load");
    assert_eq!(on_disk.entries.len(), 1);
    assert_eq!(on_disk.recurrences[0].version, definition.version + 1);
    assert!(dir.path().join("tally.json.lock").exists());
}

#[test]
fn writes_from_one_handle_are_not_lost_by_another() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let first = JsonStore::open(&path).expect("first handle");
    let second = JsonStore::open(&path).expect("second handle");

    first.add_category("Food", None).expect("food");
    second.add_category("Travel", None).expect("travel");

    let names: Vec<_> = first
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, ["Food", "Travel"]);
    assert!(matches!(
        second.add_category("FOOD", None),
        Err(CoreError::Validation(_))
    ));
}

#[test]
fn fresh_file_is_written_with_current_schema_version() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let store = JsonStore::open(&path).expect("open");
    store.add_category("Food", None).expect("category");

    assert_eq!(
        load_snapshot(&path).expect("load").schema_version,
        SNAPSHOT_SCHEMA_VERSION
    );
}

#[test]
fn budget_update_and_delete_persist() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tally.json");
    let store = JsonStore::open(&path).expect("open");
    let food = store.add_category("Food", None).expect("category");
    let request = |month| NewBudget {
        category_id: food.id,
        year: 2024,
        month,
        amount: dec!(400),
    };
    let march = BudgetService::create(&store, request(3)).expect("march");
    let april = BudgetService::create(&store, request(4)).expect("april");

    let err = store
        .save_budget(tally_domain::BudgetDefinition {
            month: 3,
            ..april.clone()
        })
        .expect_err("collides with march");
    assert!(matches!(err, CoreError::DuplicateBudget { .. }));

    BudgetService::update(
        &store,
        april.id,
        BudgetChanges {
            amount: Some(dec!(650)),
            ..BudgetChanges::default()
        },
    )
    .expect("raise april");
    BudgetService::delete(&store, march.id).expect("delete march");

    let reopened = JsonStore::open(&path).expect("reopen");
    let budgets = reopened.list_budgets().unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].id, april.id);
    assert_eq!(budgets[0].amount, dec!(650));
    assert!(matches!(
        reopened.delete_budget(march.id),
        Err(CoreError::BudgetNotFound(_))
    ));
}
