use std::collections::{BTreeMap, BTreeSet};

use crate::models::{TransactionEvent, TransferEvent};

pub fn category_spending(
    client_code: i64,
    transactions: &[TransactionEvent],
) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for event in transactions.iter().filter(|event| event.client_code == client_code) {
        *totals.entry(event.category.clone()).or_insert(0.0) += event.amount;
    }
    totals
}

pub fn type_spending(client_code: i64, transfers: &[TransferEvent]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for event in transfers.iter().filter(|event| event.client_code == client_code) {
        *totals.entry(event.transfer_type.clone()).or_insert(0.0) += event.amount;
    }
    totals
}

pub fn currencies_used(
    client_code: i64,
    transactions: &[TransactionEvent],
    transfers: &[TransferEvent],
) -> BTreeSet<String> {
    let from_transactions = transactions
        .iter()
        .filter(|event| event.client_code == client_code)
        .map(|event| event.currency.clone());
    let from_transfers = transfers
        .iter()
        .filter(|event| event.client_code == client_code)
        .map(|event| event.currency.clone());
    from_transactions.chain(from_transfers).collect()
}

/// Top `n` entries by value, descending; equal values keep key order.
pub fn top_entries(totals: &BTreeMap<String, f64>, n: usize) -> Vec<(&str, f64)> {
    let mut entries: Vec<(&str, f64)> = totals
        .iter()
        .map(|(key, value)| (key.as_str(), *value))
        .collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    entries.truncate(n);
    entries
}
