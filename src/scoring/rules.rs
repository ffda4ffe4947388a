//! Deterministic threshold rules over the client profile.
//!
//! Rules run in a fixed order and a later rule overwrites an earlier score for
//! the same product.

use crate::catalog::Product;
use crate::models::ClientProfile;

use super::Recommendations;

pub const LOW_BALANCE: f64 = 500_000.0;
pub const HIGH_BALANCE: f64 = 1_000_000.0;
pub const INVESTABLE_BALANCE: f64 = 2_000_000.0;
pub const PREMIUM_BALANCE: f64 = 6_000_000.0;
pub const MULTI_CURRENCY_MIN: usize = 2;
pub const DIVERSE_CATEGORIES_MIN: usize = 5;
pub const SPEND_TO_BALANCE_RATIO: f64 = 2.0;
const TRAVEL_MARKERS: [&str; 2] = ["travel", "transport"];

pub fn score(profile: &ClientProfile) -> Recommendations {
    let mut recommendations = Recommendations::new();
    let balance = profile.avg_monthly_balance;
    let total_spending = profile
        .spending_patterns
        .as_ref()
        .map(|patterns| patterns.total_spending)
        .unwrap_or(0.0);
    let diversity = profile
        .spending_patterns
        .as_ref()
        .map(|patterns| patterns.category_diversity)
        .unwrap_or(0);

    for (product, score) in balance_tier(balance) {
        recommendations.set(*product, *score);
    }

    if profile.currencies_used.len() > MULTI_CURRENCY_MIN {
        recommendations.set(Product::CurrencyExchange, 0.85);
        recommendations.set(Product::MultiCurrencyDeposit, 0.8);
    }

    if has_travel_spending(profile) {
        recommendations.set(Product::TravelCard, 0.85);
    }

    if diversity > DIVERSE_CATEGORIES_MIN {
        recommendations.set(Product::CreditCard, 0.7);
    }

    if balance < LOW_BALANCE && total_spending > balance * SPEND_TO_BALANCE_RATIO {
        recommendations.set(Product::CashLoan, 0.6);
        recommendations.set(Product::CreditCard, 0.75);
    }

    if balance > INVESTABLE_BALANCE {
        recommendations.set(Product::Investments, 0.7);
        recommendations.set(Product::GoldBars, 0.6);
    }

    recommendations
}

pub fn balance_tier(balance: f64) -> &'static [(Product, f64)] {
    if balance > PREMIUM_BALANCE {
        &[(Product::PremiumCard, 0.9), (Product::SavingsDeposit, 0.8)]
    } else if balance > HIGH_BALANCE {
        &[(Product::PremiumCard, 0.7), (Product::AccumulativeDeposit, 0.75)]
    } else {
        &[]
    }
}

fn has_travel_spending(profile: &ClientProfile) -> bool {
    profile.category_spending.keys().any(|category| {
        let category = category.to_lowercase();
        TRAVEL_MARKERS.iter().any(|marker| category.contains(marker))
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::models::{ClientProfile, ClientRecord, SpendingPatterns, TransactionFrequency};

    pub fn profile(balance: f64) -> ClientProfile {
        ClientProfile {
            client_info: ClientRecord {
                client_code: 1,
                name: "Aliya".to_string(),
                status: "Salary client".to_string(),
                age: 28,
                city: "Almaty".to_string(),
                avg_monthly_balance: balance,
            },
            category_spending: BTreeMap::new(),
            type_spending: BTreeMap::new(),
            currencies_used: BTreeSet::new(),
            avg_monthly_balance: balance,
            transaction_frequency: TransactionFrequency::default(),
            spending_patterns: None,
        }
    }

    pub fn with_categories(
        mut profile: ClientProfile,
        categories: &[(&str, f64)],
    ) -> ClientProfile {
        for (name, amount) in categories {
            profile.category_spending.insert(name.to_string(), *amount);
        }
        let total: f64 = categories.iter().map(|(_, amount)| amount).sum();
        profile.spending_patterns = Some(SpendingPatterns {
            total_spending: total,
            avg_transaction_amount: total / categories.len().max(1) as f64,
            max_transaction: categories.iter().map(|(_, a)| *a).fold(0.0, f64::max),
            min_transaction: categories.iter().map(|(_, a)| *a).fold(f64::MAX, f64::min),
            most_frequent_category: categories
                .first()
                .map(|(n, _)| n.to_string())
                .unwrap_or_default(),
            category_diversity: categories.len(),
        });
        profile
    }

    pub fn with_types(mut profile: ClientProfile, types: &[(&str, f64)]) -> ClientProfile {
        for (name, amount) in types {
            profile.type_spending.insert(name.to_string(), *amount);
        }
        profile
    }

    pub fn with_currencies(mut profile: ClientProfile, currencies: &[&str]) -> ClientProfile {
        profile.currencies_used = currencies.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>();
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{profile, with_categories, with_currencies};
    use super::*;

    #[test]
    fn tiers_follow_balance_bands() {
        assert_eq!(balance_tier(7_000_000.0)[0], (Product::PremiumCard, 0.9));
        assert_eq!(balance_tier(1_500_000.0)[1], (Product::AccumulativeDeposit, 0.75));
        assert!(balance_tier(1_000_000.0).is_empty());
        assert!(balance_tier(0.0).is_empty());
    }

    #[test]
    fn very_high_balance_without_events() {
        let recommendations = score(&profile(7_000_000.0));
        let scored: Vec<(Product, f64)> = recommendations.iter().collect();
        assert_eq!(
            scored,
            vec![
                (Product::PremiumCard, 0.9),
                (Product::SavingsDeposit, 0.8),
                (Product::Investments, 0.7),
                (Product::GoldBars, 0.6),
            ]
        );
    }

    #[test]
    fn zero_balance_without_events_recommends_nothing() {
        assert!(score(&profile(0.0)).is_empty());
    }

    #[test]
    fn travel_category_is_matched_by_substring() {
        let client = with_categories(profile(600_000.0), &[("Taxi", 150_000.0), ("Travel", 0.0)]);
        let recommendations = score(&client);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations.get(Product::TravelCard), Some(0.85));

        let transport = with_categories(profile(600_000.0), &[("Public Transport", 1.0)]);
        assert_eq!(score(&transport).get(Product::TravelCard), Some(0.85));
    }

    #[test]
    fn many_currencies_trigger_fx_products() {
        let client = with_currencies(profile(100_000.0), &["KZT", "USD", "EUR"]);
        let recommendations = score(&client);
        assert_eq!(recommendations.get(Product::CurrencyExchange), Some(0.85));
        assert_eq!(recommendations.get(Product::MultiCurrencyDeposit), Some(0.8));

        let two = with_currencies(profile(100_000.0), &["KZT", "USD"]);
        assert!(score(&two).is_empty());
    }

    #[test]
    fn overspending_low_balance_overrides_credit_card_score() {
        let categories: Vec<(&str, f64)> = vec![
            ("Groceries", 100_000.0),
            ("Restaurants", 100_000.0),
            ("Cinema", 50_000.0),
            ("Clothing", 50_000.0),
            ("Pharmacy", 50_000.0),
            ("Bakery", 50_000.0),
        ];
        let client = with_categories(profile(100_000.0), &categories);
        let recommendations = score(&client);
        // Diversity sets 0.7 first; the overspending rule overwrites it in place.
        let scored: Vec<(Product, f64)> = recommendations.iter().collect();
        assert_eq!(scored, vec![(Product::CreditCard, 0.75), (Product::CashLoan, 0.6)]);
    }

    #[test]
    fn scoring_is_repeatable() {
        let client = with_currencies(
            with_categories(profile(3_000_000.0), &[("Travel", 10.0), ("Hotels", 5.0)]),
            &["KZT", "USD", "EUR"],
        );
        let first = score(&client);
        for _ in 0..5 {
            assert_eq!(score(&client), first);
        }
    }
}
