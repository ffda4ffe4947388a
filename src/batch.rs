use futures::stream::{self, StreamExt};

use crate::data::Dataset;
use crate::error::{PipelineError, Result};
use crate::extract::{self, base_fields};
use crate::models::{ClassificationRecord, ClientProfile, OutputRecord};
use crate::notify::{failure_placeholder, NotificationFormatter};
use crate::profile::build_profile;
use crate::scoring::{ScoredBy, ScoringChain};
use crate::select::{select, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutcome {
    Scored { scored_by: ScoredBy },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct ClientResult {
    pub record: OutputRecord,
    pub outcome: ClientOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Successful clients whose product came from the rule-based scorer.
    pub fallbacks: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ClientResult]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            match &result.outcome {
                ClientOutcome::Scored { scored_by } => {
                    summary.succeeded += 1;
                    if *scored_by == ScoredBy::Rules {
                        summary.fallbacks += 1;
                    }
                }
                ClientOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

pub struct BatchRunner<'a> {
    dataset: &'a Dataset,
    scoring: ScoringChain,
    formatter: NotificationFormatter,
    threshold: f64,
    workers: usize,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        dataset: &'a Dataset,
        scoring: ScoringChain,
        formatter: NotificationFormatter,
        threshold: f64,
        workers: usize,
    ) -> Self {
        Self {
            dataset,
            scoring,
            formatter,
            threshold,
            workers: workers.max(1),
        }
    }

    /// Profile, score and select for one client.
    pub async fn classify_client(
        &self,
        client_code: i64,
    ) -> Result<(ClientProfile, Selection, ScoredBy)> {
        let profile = build_profile(self.dataset, client_code)?;
        let (recommendations, scored_by) = self.scoring.score(&profile).await;
        let selection = select(&profile, &recommendations, self.threshold);
        tracing::info!(
            client_code,
            product = selection.product_name(),
            scored_by = %scored_by,
            "client classified"
        );
        Ok((profile, selection, scored_by))
    }

    pub async fn classification_record(&self, client_code: i64) -> Result<ClassificationRecord> {
        let (profile, selection, scored_by) = self.classify_client(client_code).await?;
        let base = base_fields(&profile);
        Ok(ClassificationRecord {
            client_code,
            name: base.name,
            status: base.status,
            age: base.age,
            city: base.city,
            product_type: selection.product_name().to_string(),
            top_5_category_spending: selection.top5_category_spending,
            top_5_type_spending: selection.top5_type_spending,
            avg_monthly_balance: selection.avg_balance,
            currencies: base.currencies,
            scored_by: scored_by.to_string(),
        })
    }

    /// Runs the whole pipeline for one client. Never fails: problems become a
    /// placeholder record with a `Failed` outcome.
    pub async fn process_client(&self, client_code: i64) -> ClientResult {
        let (profile, selection, scored_by) = match self.classify_client(client_code).await {
            Ok(classified) => classified,
            Err(err) => return failed(client_code, "", &err),
        };

        let Some(product) = selection.product else {
            tracing::warn!(client_code, "no product recommended");
            return ClientResult {
                record: OutputRecord {
                    client_code,
                    product: String::new(),
                    push_notification: failure_placeholder(""),
                },
                outcome: ClientOutcome::Failed {
                    reason: "no product recommended".to_string(),
                },
            };
        };

        let data = extract::extract(&profile, product.name());
        match self.formatter.format(&data).await {
            Ok(push_notification) => ClientResult {
                record: OutputRecord {
                    client_code,
                    product: product.name().to_string(),
                    push_notification,
                },
                outcome: ClientOutcome::Scored { scored_by },
            },
            Err(err) => failed(client_code, product.name(), &err),
        }
    }

    /// Processes clients with at most `workers` in flight; results keep input order.
    pub async fn run(&self, client_codes: &[i64]) -> (Vec<ClientResult>, BatchSummary) {
        tracing::info!(clients = client_codes.len(), workers = self.workers, "batch started");
        let results: Vec<ClientResult> = stream::iter(client_codes.iter().copied())
            .map(|client_code| self.process_client(client_code))
            .buffered(self.workers)
            .collect()
            .await;
        let summary = BatchSummary::from_results(&results);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            fallbacks = summary.fallbacks,
            failed = summary.failed,
            "batch finished"
        );
        (results, summary)
    }

    /// Classification snapshot for each client; unknown clients are skipped.
    pub async fn classify_all(&self, client_codes: &[i64]) -> Vec<ClassificationRecord> {
        let outcomes: Vec<(i64, Result<ClassificationRecord>)> =
            stream::iter(client_codes.iter().copied())
                .map(|client_code| async move {
                    (client_code, self.classification_record(client_code).await)
                })
                .buffered(self.workers)
                .collect()
                .await;

        outcomes
            .into_iter()
            .filter_map(|(client_code, outcome)| match outcome {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(client_code, error = %err, "skipping client");
                    None
                }
            })
            .collect()
    }
}

fn failed(client_code: i64, product: &str, err: &PipelineError) -> ClientResult {
    tracing::warn!(client_code, product, error = %err, "client failed, writing placeholder");
    ClientResult {
        record: OutputRecord {
            client_code,
            product: product.to_string(),
            push_notification: failure_placeholder(product),
        },
        outcome: ClientOutcome::Failed {
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::aggregate::fixtures::{transaction, transfer};
    use crate::llm::testing::CannedGenerator;
    use crate::models::ClientRecord;
    use crate::scoring::LlmScorer;

    fn client(client_code: i64, balance: f64) -> ClientRecord {
        ClientRecord {
            client_code,
            name: format!("Client {client_code}"),
            status: "Standard client".to_string(),
            age: 40,
            city: "Almaty".to_string(),
            avg_monthly_balance: balance,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            clients: vec![client(1, 7_000_000.0), client(2, 0.0), client(3, 600_000.0)],
            transactions: vec![
                transaction(3, "2025-06-01", "Taxi", "KZT", 150_000.0),
                transaction(3, "2025-06-02", "Travel", "KZT", 0.0),
            ],
            transfers: vec![transfer(3, "2025-06-03", "salary_in", "KZT", 500_000.0)],
        }
    }

    #[tokio::test]
    async fn every_client_gets_exactly_one_record_in_order() {
        let data = dataset();
        let runner = BatchRunner::new(
            &data,
            ScoringChain::rules_only(),
            NotificationFormatter::Template,
            0.4,
            2,
        );
        let (results, summary) = runner.run(&[3, 2, 99, 1]).await;

        let codes: Vec<i64> = results.iter().map(|result| result.record.client_code).collect();
        assert_eq!(codes, vec![3, 2, 99, 1]);

        assert_eq!(results[0].record.product, "Travel card");
        assert_eq!(results[3].record.product, "Premium card");
        assert_eq!(results[1].record.push_notification, failure_placeholder(""));
        assert!(matches!(results[2].outcome, ClientOutcome::Failed { .. }));

        assert_eq!(
            summary,
            BatchSummary {
                total: 4,
                succeeded: 2,
                fallbacks: 2,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn formatting_failure_yields_placeholder_and_batch_continues() {
        let data = dataset();
        let generator = Arc::new(CannedGenerator::failing("boom"));
        let formatter = NotificationFormatter::llm(generator, Duration::from_secs(1));
        let runner = BatchRunner::new(&data, ScoringChain::rules_only(), formatter, 0.4, 4);
        let (results, summary) = runner.run(&[1, 3]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.product, "Premium card");
        assert_eq!(
            results[0].record.push_notification,
            "Notification generation failed for Premium card"
        );
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn llm_scored_clients_are_not_fallbacks() {
        let data = dataset();
        let generator = Arc::new(CannedGenerator::replying(r#"{"Gold bars": 0.8}"#));
        let scorer = LlmScorer::new(generator.clone(), Duration::from_secs(1));
        let scoring = ScoringChain::new(Some(scorer));
        let runner = BatchRunner::new(&data, scoring, NotificationFormatter::Template, 0.5, 1);
        let (results, summary) = runner.run(&[1]).await;
        assert_eq!(results[0].record.product, "Gold bars");
        assert_eq!(summary.fallbacks, 0);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn classification_skips_unknown_clients() {
        let data = dataset();
        let runner = BatchRunner::new(
            &data,
            ScoringChain::rules_only(),
            NotificationFormatter::Template,
            0.4,
            2,
        );
        let records = runner.classify_all(&[1, 42, 3]).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_type, "Premium card");
        assert_eq!(records[0].avg_monthly_balance, 7_000_000);
        assert_eq!(records[0].scored_by, "rules");
        assert_eq!(records[1].top_5_category_spending.get("Taxi"), Some(150_000));
        assert_eq!(records[1].top_5_type_spending.len(), 1);
    }
}
