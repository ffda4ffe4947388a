//! Product scoring: profile in, product confidence scores out.
//!
//! Two strategies share one contract. [`ScoringChain`] tries them in order and
//! always ends on the rule-based one, which cannot fail.

pub mod llm;
pub mod rules;

use std::fmt;

use crate::catalog::Product;
use crate::error::Result;
use crate::models::ClientProfile;

pub use llm::LlmScorer;

/// Product → confidence in [0, 1], in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    entries: Vec<(Product, f64)>,
}

impl Recommendations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a score, clamped into [0, 1]. An existing key keeps its position.
    pub fn set(&mut self, product: Product, score: f64) {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        match self.entries.iter_mut().find(|(existing, _)| *existing == product) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((product, score)),
        }
    }

    pub fn get(&self, product: Product) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == product)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Product, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Product, f64)> for Recommendations {
    fn from_iter<I: IntoIterator<Item = (Product, f64)>>(iter: I) -> Self {
        let mut recommendations = Recommendations::new();
        for (product, score) in iter {
            recommendations.set(product, score);
        }
        recommendations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoredBy {
    Llm,
    Rules,
}

impl fmt::Display for ScoredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoredBy::Llm => f.write_str("llm"),
            ScoredBy::Rules => f.write_str("rules"),
        }
    }
}

pub enum Scorer {
    Llm(LlmScorer),
    Rules,
}

impl Scorer {
    pub fn kind(&self) -> ScoredBy {
        match self {
            Scorer::Llm(_) => ScoredBy::Llm,
            Scorer::Rules => ScoredBy::Rules,
        }
    }

    pub async fn score(&self, profile: &ClientProfile) -> Result<Recommendations> {
        match self {
            Scorer::Llm(scorer) => scorer.score(profile).await,
            Scorer::Rules => Ok(rules::score(profile)),
        }
    }
}

pub struct ScoringChain {
    strategies: Vec<Scorer>,
}

impl ScoringChain {
    /// LLM first when available, rule-based always last.
    pub fn new(llm: Option<LlmScorer>) -> Self {
        let mut strategies = Vec::with_capacity(2);
        if let Some(scorer) = llm {
            strategies.push(Scorer::Llm(scorer));
        }
        strategies.push(Scorer::Rules);
        Self { strategies }
    }

    pub fn rules_only() -> Self {
        Self::new(None)
    }

    pub fn uses_llm(&self) -> bool {
        self.strategies.iter().any(|scorer| scorer.kind() == ScoredBy::Llm)
    }

    pub async fn score(&self, profile: &ClientProfile) -> (Recommendations, ScoredBy) {
        let client_code = profile.client_info.client_code;
        for scorer in &self.strategies {
            match scorer.score(profile).await {
                Ok(recommendations) => {
                    tracing::debug!(
                        client_code,
                        scored_by = %scorer.kind(),
                        count = recommendations.len(),
                        "scored client"
                    );
                    return (recommendations, scorer.kind());
                }
                Err(err) => {
                    tracing::warn!(
                        client_code,
                        scored_by = %scorer.kind(),
                        error = %err,
                        "scoring failed, trying next strategy"
                    );
                }
            }
        }
        (rules::score(profile), ScoredBy::Rules)
    }
}
