use std::fmt::Write;
use std::time::Duration;

use serde_json::Value;

use crate::aggregate::top_entries;
use crate::catalog::Product;
use crate::error::{PipelineError, Result};
use crate::llm::{generate_with_timeout, SharedGenerator};
use crate::models::ClientProfile;
use crate::text::{first_json_object, group_thousands, strip_code_fence};

use super::Recommendations;

const SCORING_TEMPERATURE: f32 = 0.3;

pub const SYSTEM_PROMPT: &str = "You are a banking product recommendation expert. Based on \
    client financial behavior, recommend suitable banking products. Return recommendations as \
    JSON with product names as keys and confidence scores (0-1) as values. Consider the client's \
    spending patterns, balance, currencies used and transaction behavior. Be precise and base \
    recommendations on actual client data.";

pub struct LlmScorer {
    generator: SharedGenerator,
    timeout: Duration,
}

impl LlmScorer {
    pub fn new(generator: SharedGenerator, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn score(&self, profile: &ClientProfile) -> Result<Recommendations> {
        let prompt = classification_prompt(&profile_context(profile));
        let reply = generate_with_timeout(
            self.generator.as_ref(),
            SYSTEM_PROMPT,
            &prompt,
            SCORING_TEMPERATURE,
            self.timeout,
        )
        .await?;
        let recommendations = parse_recommendations(&reply)?;
        tracing::info!(
            client_code = profile.client_info.client_code,
            count = recommendations.len(),
            "received recommendations from text generation"
        );
        Ok(recommendations)
    }
}

/// Compact, bounded description of a profile for the scoring prompt.
pub fn profile_context(profile: &ClientProfile) -> String {
    let mut context = String::new();
    let info = &profile.client_info;

    let _ = writeln!(context, "Age: {}", info.age);
    let _ = writeln!(context, "Status: {}", info.status);
    let _ = writeln!(context, "City: {}", info.city);
    let _ = writeln!(
        context,
        "Average monthly balance: {} KZT",
        group_thousands(profile.avg_monthly_balance, ',')
    );

    if !profile.category_spending.is_empty() {
        let top = top_entries(&profile.category_spending, 3)
            .into_iter()
            .map(|(name, amount)| format!("{name} ({})", group_thousands(amount, ',')))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(context, "Top spending categories: {top}");
    }

    if !profile.type_spending.is_empty() {
        let top = top_entries(&profile.type_spending, 3)
            .into_iter()
            .map(|(name, amount)| format!("{name} ({})", group_thousands(amount, ',')))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(context, "Top transfer types: {top}");
    }

    if !profile.currencies_used.is_empty() {
        let currencies: Vec<&str> = profile.currencies_used.iter().map(String::as_str).collect();
        let _ = writeln!(context, "Currencies used: {}", currencies.join(", "));
    }

    if let Some(patterns) = &profile.spending_patterns {
        let _ = writeln!(
            context,
            "Total spending: {}",
            group_thousands(patterns.total_spending, ',')
        );
        let _ = writeln!(
            context,
            "Average transaction: {}",
            group_thousands(patterns.avg_transaction_amount, ',')
        );
        let _ = writeln!(context, "Category diversity: {}", patterns.category_diversity);
    }

    let frequency = &profile.transaction_frequency;
    let _ = writeln!(context, "Monthly transactions: {:.1}", frequency.monthly_avg_transactions);
    let _ = write!(context, "Monthly transfers: {:.1}", frequency.monthly_avg_transfers);

    context
}

pub fn classification_prompt(context: &str) -> String {
    let products = Product::ALL
        .iter()
        .map(|product| {
            format!(
                "{}: {} (features: {}; audience: {})",
                product.name(),
                product.description(),
                product.key_features().join(", "),
                product.target_audience().join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    let names = Product::ALL
        .iter()
        .map(|product| format!("\"{}\"", product.name()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Based on the following client profile, recommend suitable banking products.\n\n\
         Client Profile:\n{context}\n\n\
         Available Products:\n{products}\n\n\
         Use only these product names as keys: {names}.\n\
         Return a JSON object with product names as keys and recommendation confidence \
         scores (0-1) as values.\n\
         Consider only products that match the client's actual behavior and needs.\n\
         Example format: {{\"Travel card\": 0.85, \"Accumulative deposit\": 0.65}}\n\n\
         Recommendations:"
    )
}

/// Reads product scores out of a free-form reply.
///
/// A reply with no parseable JSON object yields no recommendations. An object
/// whose catalog entries are not numbers is rejected as malformed. Keys outside
/// the catalog are dropped and scores are clamped into [0, 1].
pub fn parse_recommendations(reply: &str) -> Result<Recommendations> {
    let body = strip_code_fence(reply);
    let Some(object) = first_json_object(body) else {
        tracing::debug!("no JSON object in scoring reply");
        return Ok(Recommendations::new());
    };
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(object) else {
        tracing::debug!("scoring reply is not valid JSON");
        return Ok(Recommendations::new());
    };

    let mut recommendations = Recommendations::new();
    for (key, value) in map {
        let Some(product) = Product::from_name(&key) else {
            tracing::debug!(key = %key, "ignoring product outside catalog");
            continue;
        };
        let score = match &value {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => raw.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            PipelineError::MalformedResponse(format!("score for `{key}` is not a number: {value}"))
        })?;
        recommendations.set(product, score);
    }
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::testing::CannedGenerator;
    use crate::scoring::rules::fixtures::{profile, with_categories, with_currencies, with_types};
    use crate::scoring::{ScoredBy, ScoringChain};

    #[test]
    fn parses_reply_wrapped_in_prose_and_fences() {
        let reply =
            "Here you go:\n```json\n{\"Travel card\": 0.85, \"savings deposit\": \"0.4\"}\n```";
        let recommendations = parse_recommendations(reply).unwrap();
        assert_eq!(recommendations.get(Product::TravelCard), Some(0.85));
        assert_eq!(recommendations.get(Product::SavingsDeposit), Some(0.4));
    }

    #[test]
    fn drops_unknown_products_and_clamps_scores() {
        let reply = r#"{"Mortgage": 0.99, "Gold bars": 1.4, "Cash loan": -1}"#;
        let recommendations = parse_recommendations(reply).unwrap();
        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations.get(Product::GoldBars), Some(1.0));
        assert_eq!(recommendations.get(Product::CashLoan), Some(0.0));
    }

    #[test]
    fn unparseable_reply_gives_empty_recommendations() {
        assert!(parse_recommendations("I cannot help with that.").unwrap().is_empty());
        assert!(parse_recommendations("{not json}").unwrap().is_empty());
    }

    #[test]
    fn non_numeric_catalog_score_is_malformed() {
        let err = parse_recommendations(r#"{"Credit card": "high"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[test]
    fn context_lists_top_three_by_spend() {
        let client = with_currencies(
            with_types(
                with_categories(
                    profile(1_250_000.0),
                    &[
                        ("Taxi", 50_000.0),
                        ("Groceries", 120_000.0),
                        ("Cinema", 5_000.0),
                        ("Hotels", 80_000.0),
                    ],
                ),
                &[("salary_in", 900_000.0)],
            ),
            &["KZT", "USD"],
        );
        let context = profile_context(&client);
        assert!(context.contains("Average monthly balance: 1,250,000 KZT"));
        assert!(context.contains(
            "Top spending categories: Groceries (120,000), Hotels (80,000), Taxi (50,000)"
        ));
        assert!(!context.contains("Cinema"));
        assert!(context.contains("Top transfer types: salary_in (900,000)"));
        assert!(context.contains("Currencies used: KZT, USD"));
        assert!(context.contains("Category diversity: 4"));
    }

    #[test]
    fn prompt_lists_every_product() {
        let prompt = classification_prompt("Age: 30");
        for product in Product::ALL {
            assert!(prompt.contains(product.description()));
        }
        assert!(prompt.contains("Age: 30"));
    }

    #[tokio::test]
    async fn chain_prefers_llm_reply() {
        let generator = Arc::new(CannedGenerator::replying(r#"{"Investments": 0.9}"#));
        let scorer = LlmScorer::new(generator.clone(), Duration::from_secs(1));
        let chain = ScoringChain::new(Some(scorer));
        let (recommendations, scored_by) = chain.score(&profile(7_000_000.0)).await;
        assert_eq!(scored_by, ScoredBy::Llm);
        assert_eq!(recommendations.get(Product::Investments), Some(0.9));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn chain_falls_back_to_rules_on_upstream_error() {
        let generator = Arc::new(CannedGenerator::failing("429 rate limited"));
        let chain = ScoringChain::new(Some(LlmScorer::new(generator, Duration::from_secs(1))));
        let (recommendations, scored_by) = chain.score(&profile(7_000_000.0)).await;
        assert_eq!(scored_by, ScoredBy::Rules);
        assert_eq!(recommendations.get(Product::PremiumCard), Some(0.9));
    }

    #[tokio::test]
    async fn chain_falls_back_to_rules_on_timeout() {
        let generator = Arc::new(CannedGenerator::slow(
            r#"{"Investments": 0.9}"#,
            Duration::from_millis(500),
        ));
        let chain = ScoringChain::new(Some(LlmScorer::new(generator, Duration::from_millis(20))));
        let (recommendations, scored_by) = chain.score(&profile(7_000_000.0)).await;
        assert_eq!(scored_by, ScoredBy::Rules);
        assert_eq!(recommendations.len(), 4);
    }

    #[tokio::test]
    async fn chain_falls_back_to_rules_on_malformed_reply() {
        let generator = Arc::new(CannedGenerator::replying(r#"{"Premium card": [1, 2]}"#));
        let chain = ScoringChain::new(Some(LlmScorer::new(generator, Duration::from_secs(1))));
        let (_, scored_by) = chain.score(&profile(7_000_000.0)).await;
        assert_eq!(scored_by, ScoredBy::Rules);
    }
}
