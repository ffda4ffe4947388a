use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientRecord {
    pub client_code: i64,
    pub name: String,
    pub status: String,
    pub age: u32,
    pub city: String,
    #[serde(
        alias = "avg_monthly_balance_KZT",
        default,
        deserialize_with = "deserialize_balance"
    )]
    pub avg_monthly_balance: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransactionEvent {
    pub client_code: i64,
    #[serde(deserialize_with = "deserialize_event_date")]
    pub date: NaiveDateTime,
    pub category: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransferEvent {
    pub client_code: i64,
    #[serde(deserialize_with = "deserialize_event_date")]
    pub date: NaiveDateTime,
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TransactionFrequency {
    pub monthly_avg_transactions: f64,
    pub monthly_avg_transfers: f64,
    pub total_operations: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpendingPatterns {
    pub total_spending: f64,
    pub avg_transaction_amount: f64,
    pub max_transaction: f64,
    pub min_transaction: f64,
    pub most_frequent_category: String,
    pub category_diversity: usize,
}

/// Point-in-time behavioral summary of one client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientProfile {
    pub client_info: ClientRecord,
    pub category_spending: BTreeMap<String, f64>,
    pub type_spending: BTreeMap<String, f64>,
    pub currencies_used: BTreeSet<String>,
    pub avg_monthly_balance: f64,
    pub transaction_frequency: TransactionFrequency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_patterns: Option<SpendingPatterns>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputRecord {
    pub client_code: i64,
    pub product: String,
    pub push_notification: String,
}

/// Top-N spending entries, kept in descending order when serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopSpending(pub Vec<(String, i64)>);

impl TopSpending {
    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.iter().find(|(name, _)| name == key).map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TopSpending {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, value)| (name, value)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRecord {
    pub client_code: i64,
    pub name: String,
    pub status: String,
    pub age: u32,
    pub city: String,
    pub product_type: String,
    pub top_5_category_spending: TopSpending,
    pub top_5_type_spending: TopSpending,
    pub avg_monthly_balance: i64,
    pub currencies: Vec<String>,
    pub scored_by: String,
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn deserialize_event_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_event_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date `{raw}`")))
}

/// Absent, empty or unreadable balances count as zero.
fn deserialize_balance<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let balance = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => Some(0.0),
        Some(serde_json::Value::String(raw)) => {
            let parsed = raw.trim().parse::<f64>().ok();
            if parsed.is_none() {
                tracing::warn!(value = %raw, "unreadable balance, using 0");
            }
            parsed
        }
        _ => None,
    };
    Ok(balance.filter(|value| value.is_finite()).unwrap_or(0.0))
}
