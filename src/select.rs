use crate::aggregate::top_entries;
use crate::catalog::Product;
use crate::models::{ClientProfile, TopSpending};
use crate::scoring::Recommendations;

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub product: Option<Product>,
    pub top5_category_spending: TopSpending,
    pub top5_type_spending: TopSpending,
    pub avg_balance: i64,
}

impl Selection {
    pub fn product_name(&self) -> &'static str {
        self.product.map(Product::name).unwrap_or("")
    }
}

pub fn select(
    profile: &ClientProfile,
    recommendations: &Recommendations,
    threshold: f64,
) -> Selection {
    let product = best_above(recommendations, threshold)
        .or_else(|| best_above(recommendations, f64::NEG_INFINITY));
    tracing::debug!(
        client_code = profile.client_info.client_code,
        product = product.map(Product::name).unwrap_or(""),
        threshold,
        "selected product"
    );

    Selection {
        product,
        top5_category_spending: rounded_top(&profile.category_spending),
        top5_type_spending: rounded_top(&profile.type_spending),
        avg_balance: round_amount(profile.avg_monthly_balance),
    }
}

/// Highest score at or above `threshold`; ties go to the earliest entry.
fn best_above(recommendations: &Recommendations, threshold: f64) -> Option<Product> {
    let mut best: Option<(Product, f64)> = None;
    for (product, score) in recommendations.iter().filter(|(_, score)| *score >= threshold) {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((product, score)),
        }
    }
    best.map(|(product, _)| product)
}

fn rounded_top(totals: &std::collections::BTreeMap<String, f64>) -> TopSpending {
    TopSpending(
        top_entries(totals, TOP_N)
            .into_iter()
            .map(|(name, amount)| (name.to_string(), round_amount(amount)))
            .collect(),
    )
}

fn round_amount(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::rules;
    use crate::scoring::rules::fixtures::{profile, with_categories, with_types};

    fn recs(entries: &[(Product, f64)]) -> Recommendations {
        entries.iter().copied().collect()
    }

    #[test]
    fn picks_highest_score_above_threshold() {
        let recommendations = recs(&[
            (Product::CashLoan, 0.45),
            (Product::PremiumCard, 0.9),
            (Product::GoldBars, 0.6),
        ]);
        let selection = select(&profile(0.0), &recommendations, 0.5);
        assert_eq!(selection.product, Some(Product::PremiumCard));
    }

    #[test]
    fn ties_go_to_first_seen() {
        let recommendations = recs(&[(Product::Investments, 0.7), (Product::CreditCard, 0.7)]);
        let selection = select(&profile(0.0), &recommendations, 0.5);
        assert_eq!(selection.product, Some(Product::Investments));
    }

    #[test]
    fn falls_back_to_global_best_below_threshold() {
        let recommendations = recs(&[(Product::CashLoan, 0.2), (Product::CreditCard, 0.3)]);
        let selection = select(&profile(0.0), &recommendations, 0.5);
        assert_eq!(selection.product, Some(Product::CreditCard));
    }

    #[test]
    fn empty_recommendations_choose_nothing() {
        let selection = select(&profile(0.0), &Recommendations::new(), 0.4);
        assert_eq!(selection.product, None);
        assert_eq!(selection.product_name(), "");
    }

    #[test]
    fn chosen_product_has_max_score_among_passing_entries() {
        let recommendations = recs(&[
            (Product::TravelCard, 0.55),
            (Product::CashLoan, 0.41),
            (Product::GoldBars, 0.93),
            (Product::Investments, 0.93),
            (Product::CreditCard, 0.1),
        ]);
        for threshold in [0.0, 0.4, 0.5, 0.9] {
            let chosen = select(&profile(0.0), &recommendations, threshold).product.unwrap();
            let chosen_score = recommendations.get(chosen).unwrap();
            assert!(recommendations
                .iter()
                .filter(|(_, score)| *score >= threshold)
                .all(|(_, score)| score <= chosen_score));
        }
    }

    #[test]
    fn top_spending_is_rounded_and_capped_at_five() {
        let client = with_types(
            with_categories(
                profile(1_234_567.5),
                &[
                    ("A", 10.4),
                    ("B", 60.5),
                    ("C", 30.0),
                    ("D", 40.0),
                    ("E", 50.0),
                    ("F", 20.0),
                ],
            ),
            &[("salary_in", 100.2), ("fx_buy", 300.0)],
        );
        let selection = select(&client, &Recommendations::new(), 0.4);
        assert_eq!(
            selection.top5_category_spending.0,
            vec![
                ("B".to_string(), 61),
                ("E".to_string(), 50),
                ("D".to_string(), 40),
                ("C".to_string(), 30),
                ("F".to_string(), 20),
            ]
        );
        assert_eq!(
            selection.top5_type_spending.0,
            vec![("fx_buy".to_string(), 300), ("salary_in".to_string(), 100)]
        );
        assert_eq!(selection.avg_balance, 1_234_568);
    }

    #[test]
    fn very_high_balance_client_gets_premium_card() {
        let client = profile(7_000_000.0);
        let selection = select(&client, &rules::score(&client), 0.5);
        assert_eq!(selection.product, Some(Product::PremiumCard));
        assert!(selection.top5_category_spending.is_empty());
    }
}
