use std::collections::BTreeMap;

use crate::aggregate;
use crate::data::Dataset;
use crate::error::{PipelineError, Result};
use crate::models::{
    ClientProfile, SpendingPatterns, TransactionEvent, TransactionFrequency, TransferEvent,
};

const DAYS_PER_MONTH: f64 = 30.0;

pub fn build_profile(dataset: &Dataset, client_code: i64) -> Result<ClientProfile> {
    let client = dataset
        .client(client_code)
        .ok_or(PipelineError::NotFound(client_code))?;

    let transactions: Vec<TransactionEvent> = dataset
        .transactions
        .iter()
        .filter(|event| event.client_code == client_code)
        .cloned()
        .collect();
    let transfers: Vec<TransferEvent> = dataset
        .transfers
        .iter()
        .filter(|event| event.client_code == client_code)
        .cloned()
        .collect();

    let profile = ClientProfile {
        client_info: client.clone(),
        category_spending: aggregate::category_spending(client_code, &transactions),
        type_spending: aggregate::type_spending(client_code, &transfers),
        currencies_used: aggregate::currencies_used(client_code, &transactions, &transfers),
        avg_monthly_balance: client.avg_monthly_balance,
        transaction_frequency: transaction_frequency(&transactions, &transfers),
        spending_patterns: spending_patterns(&transactions),
    };

    tracing::debug!(
        client_code,
        categories = profile.category_spending.len(),
        types = profile.type_spending.len(),
        currencies = profile.currencies_used.len(),
        "profile built"
    );
    Ok(profile)
}

/// Monthly operation rates over the client's observed activity window.
///
/// The window spans both logs and is never shorter than one month.
pub fn transaction_frequency(
    transactions: &[TransactionEvent],
    transfers: &[TransferEvent],
) -> TransactionFrequency {
    let dates = transactions
        .iter()
        .map(|event| event.date)
        .chain(transfers.iter().map(|event| event.date));
    let (Some(first), Some(last)) = (dates.clone().min(), dates.max()) else {
        return TransactionFrequency::default();
    };

    let span_months = ((last - first).num_days() as f64 / DAYS_PER_MONTH).max(1.0);
    TransactionFrequency {
        monthly_avg_transactions: transactions.len() as f64 / span_months,
        monthly_avg_transfers: transfers.len() as f64 / span_months,
        total_operations: transactions.len() + transfers.len(),
    }
}

pub fn spending_patterns(transactions: &[TransactionEvent]) -> Option<SpendingPatterns> {
    if transactions.is_empty() {
        return None;
    }

    let total: f64 = transactions.iter().map(|event| event.amount).sum();
    let max = transactions.iter().map(|event| event.amount).fold(f64::MIN, f64::max);
    let min = transactions.iter().map(|event| event.amount).fold(f64::MAX, f64::min);

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for event in transactions {
        *counts.entry(event.category.as_str()).or_insert(0) += 1;
    }
    // Ties resolve to the lexicographically smallest category.
    let mut most_frequent = "";
    let mut best = 0usize;
    for (category, count) in counts.iter() {
        if *count > best {
            best = *count;
            most_frequent = category;
        }
    }

    Some(SpendingPatterns {
        total_spending: total,
        avg_transaction_amount: total / transactions.len() as f64,
        max_transaction: max,
        min_transaction: min,
        most_frequent_category: most_frequent.to_string(),
        category_diversity: counts.len(),
    })
}
