//! Property-based tests for the pure parts of import and the ledger.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use surat_jalan_api::{
    entities::{cash_transaction, TransactionCategory, TransactionType},
    import::{self, ImportReport},
    services::cash_ledger::signed_total,
};
use uuid::Uuid;

fn transaction(inflow: bool, cents: i64) -> cash_transaction::Model {
    cash_transaction::Model {
        id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        transaction_type: if inflow {
            TransactionType::Inflow
        } else {
            TransactionType::Outflow
        },
        category: TransactionCategory::Manual,
        amount: Decimal::new(cents, 2),
        description: "prop".into(),
        delivery_note_id: None,
        delivery_note_number: None,
        created_at: Utc::now(),
        created_by: "prop".into(),
    }
}

proptest! {
    #[test]
    fn balance_equals_inflows_minus_outflows(
        entries in prop::collection::vec((any::<bool>(), 1i64..1_000_000_000), 0..40)
    ) {
        let log: Vec<_> = entries.iter().map(|(i, c)| transaction(*i, *c)).collect();
        let inflow: Decimal = log
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Inflow)
            .map(|t| t.amount)
            .sum();
        let outflow: Decimal = log
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Outflow)
            .map(|t| t.amount)
            .sum();
        prop_assert_eq!(signed_total(&log), inflow - outflow);
    }

    #[test]
    fn removing_an_entry_reverses_exactly_its_amount(
        entries in prop::collection::vec((any::<bool>(), 1i64..1_000_000_000), 1..20),
        pick in any::<prop::sample::Index>()
    ) {
        let mut log: Vec<_> = entries.iter().map(|(i, c)| transaction(*i, *c)).collect();
        let before = signed_total(&log);
        let removed = log.remove(pick.index(log.len()));
        prop_assert_eq!(signed_total(&log), before - removed.signed_amount());
    }

    #[test]
    fn semicolon_wins_only_with_a_strict_majority(
        semicolons in 0usize..6,
        commas in 0usize..6
    ) {
        let line = format!("a{}b{}c", ";".repeat(semicolons), ",".repeat(commas));
        let expected = if semicolons > commas { ';' } else { ',' };
        prop_assert_eq!(import::sniff_delimiter(&line), expected);
    }

    #[test]
    fn import_report_counts_every_row(
        outcomes in prop::collection::vec(any::<bool>(), 0..50),
        limit in 1usize..10
    ) {
        let mut report = ImportReport::new();
        for (i, ok) in outcomes.iter().enumerate() {
            if *ok {
                report.record_success();
            } else {
                report.record_failure(format!("row {}", i));
            }
        }
        let report = report.finish(limit);
        let failures = outcomes.iter().filter(|ok| !**ok).count();
        prop_assert_eq!(report.succeeded + report.failed, outcomes.len());
        prop_assert_eq!(report.total_errors, failures);
        prop_assert_eq!(report.errors.len(), failures.min(limit));
    }

    #[test]
    fn iso_and_day_first_dates_agree(y in 2000i32..2100, m in 1u32..13, d in 1u32..29) {
        let iso = format!("{:04}-{:02}-{:02}", y, m, d);
        let local = format!("{:02}/{:02}/{:04}", d, m, y);
        prop_assert_eq!(import::parse_date(&iso), import::parse_date(&local));
        prop_assert!(import::parse_date(&iso).is_some());
    }
}
