//! Fund creation and reads against the in-memory backend.

use uuid::Uuid;

use captable::ledger::{Ledger, LedgerApi};
use captable::store::MemoryLedgerStore;
use captable::validation::{MAX_NAME_LENGTH, MAX_UNITS};
use captable::{LedgerError, ListParams};

fn ledger() -> Ledger<MemoryLedgerStore> {
    Ledger::new(MemoryLedgerStore::new())
}

#[tokio::test]
async fn test_create_fund_seeds_single_owner() {
    let ledger = ledger();
    let fund = ledger
        .create_fund("  Seed Fund  ", 5000, " Founder ")
        .await
        .unwrap();

    assert_eq!(fund.name, "Seed Fund");
    assert_eq!(fund.total_units, 5000);

    let table = ledger
        .get_cap_table(fund.id, ListParams::default())
        .await
        .unwrap();
    assert_eq!(table.fund_name, "Seed Fund");
    assert_eq!(table.entries.total, 1);
    let (entry, pct) = table.rows().next().unwrap();
    assert_eq!(entry.owner_name, "Founder");
    assert_eq!(entry.units, 5000);
    assert_eq!(pct, 100.0);
    assert!(entry.is_active());
}

#[tokio::test]
async fn test_duplicate_name_rolls_back_everything() {
    let ledger = ledger();
    ledger.create_fund("Alpha", 100, "Alice").await.unwrap();

    let err = ledger.create_fund(" Alpha", 999, "Mallory").await.unwrap_err();
    assert_eq!(err, LedgerError::DuplicateFundName("Alpha".into()));

    let funds = ledger.list_funds(ListParams::default()).await.unwrap();
    assert_eq!(funds.total, 1);
    assert_eq!(funds.items[0].total_units, 100);
}

#[tokio::test]
async fn test_fund_names_are_case_sensitive() {
    let ledger = ledger();
    ledger.create_fund("alpha", 1, "Alice").await.unwrap();
    ledger.create_fund("ALPHA", 1, "Alice").await.unwrap();
    assert_eq!(ledger.list_funds(ListParams::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_writing() {
    let ledger = ledger();
    let too_long = "x".repeat(MAX_NAME_LENGTH + 1);

    let cases = [
        ("", 10, "Alice", "INVALID_FUND"),
        (too_long.as_str(), 10, "Alice", "INVALID_FUND"),
        ("Fund", 0, "Alice", "INVALID_FUND"),
        ("Fund", -1, "Alice", "INVALID_FUND"),
        ("Fund", MAX_UNITS + 1, "Alice", "INVALID_FUND"),
        ("Fund", 10, "  ", "INVALID_OWNER"),
        ("Fund", 10, too_long.as_str(), "INVALID_OWNER"),
    ];
    for (name, units, owner, code) in cases {
        let err = ledger.create_fund(name, units, owner).await.unwrap_err();
        assert_eq!(err.code(), code, "{name:?}/{units}/{owner:?}");
    }
    assert_eq!(ledger.list_funds(ListParams::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_name_at_limit_and_max_units_are_accepted() {
    let ledger = ledger();
    let name = "\u{00e9}".repeat(MAX_NAME_LENGTH);
    let fund = ledger.create_fund(&name, MAX_UNITS, "Alice").await.unwrap();
    assert_eq!(fund.total_units, i32::MAX);
}

#[tokio::test]
async fn test_list_funds_newest_first_with_window() {
    let ledger = ledger();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(ledger.create_fund(&format!("Fund {i}"), 10, "Alice").await.unwrap().id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let page = ledger.list_funds(ListParams::new(2, 1)).await.unwrap();
    assert_eq!(page.total, 5);
    let listed: Vec<_> = page.items.iter().map(|f| f.id).collect();
    assert_eq!(listed, [ids[3], ids[2]]);
}

#[tokio::test]
async fn test_unknown_fund_reads() {
    let ledger = ledger();
    let missing = Uuid::new_v4();

    assert_eq!(
        ledger.get_fund(missing).await.unwrap_err(),
        LedgerError::FundNotFound(missing)
    );
    assert_eq!(
        ledger
            .get_cap_table(missing, ListParams::default())
            .await
            .unwrap_err(),
        LedgerError::FundNotFound(missing)
    );
    assert_eq!(
        ledger.get_ownership(missing, "Alice").await.unwrap_err(),
        LedgerError::FundNotFound(missing)
    );
}
