use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::batch::{BatchSummary, ClientOutcome, ClientResult};
use crate::scoring::ScoredBy;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub product: String,
    pub count: usize,
    pub llm_scored: usize,
}

/// Product mix over successful clients, most frequent first.
pub fn summarize_by_product(results: &[ClientResult]) -> Vec<ProductSummary> {
    let mut map: HashMap<String, (usize, usize)> = HashMap::new();

    for result in results {
        if let ClientOutcome::Scored { scored_by } = &result.outcome {
            let entry = map.entry(result.record.product.clone()).or_insert((0, 0));
            entry.0 += 1;
            if *scored_by == ScoredBy::Llm {
                entry.1 += 1;
            }
        }
    }

    let mut summaries: Vec<ProductSummary> = map
        .into_iter()
        .map(|(product, (count, llm_scored))| ProductSummary {
            product,
            count,
            llm_scored,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.product.cmp(&b.product)));
    summaries
}

pub fn build_report(
    generated_at: NaiveDateTime,
    summary: &BatchSummary,
    results: &[ClientResult],
) -> String {
    let products = summarize_by_product(results);

    let mut output = String::new();

    let _ = writeln!(output, "# Push Notification Run Report");
    let _ = writeln!(output, "Generated at {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Clients processed: {}", summary.total);
    let _ = writeln!(output, "- Notifications written: {}", summary.succeeded);
    let _ = writeln!(output, "- Scored by rules: {}", summary.fallbacks);
    let _ = writeln!(output, "- Failed: {}", summary.failed);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Product Mix");

    if products.is_empty() {
        let _ = writeln!(output, "No notifications produced in this run.");
    } else {
        for product in products.iter() {
            let _ = writeln!(
                output,
                "- {}: {} clients ({} scored by text generation)",
                product.product, product.count, product.llm_scored
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Failures");

    let failures: Vec<(i64, &str)> = results
        .iter()
        .filter_map(|result| match &result.outcome {
            ClientOutcome::Failed { reason } => Some((result.record.client_code, reason.as_str())),
            ClientOutcome::Scored { .. } => None,
        })
        .collect();

    if failures.is_empty() {
        let _ = writeln!(output, "No failures.");
    } else {
        for (client_code, reason) in failures {
            let _ = writeln!(output, "- client {client_code}: {reason}");
        }
    }

    output
}
