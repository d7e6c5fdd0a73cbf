//! Model-versus-bookmaker comparison.
//!
//! Implied probability is the raw `1 / odds`. The bookmaker's overround
//! stays in, so a fair price reads as slightly negative value.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::elo::{EloConfig, outcome_probabilities};
use crate::error::{EngineError, EngineResult, ensure_finite};
use crate::market::{HdaOdds, MatchOdds, Outcome, OutcomeProbabilities};
use crate::ratings::RatingStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueConfig {
    pub threshold_pct: f64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self { threshold_pct: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueAnnotation {
    pub outcome: Outcome,
    pub odds: f64,
    pub implied_probability: f64,
    pub model_probability: f64,
    pub value_pct: f64,
    pub is_value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    pub home: ValueAnnotation,
    pub draw: ValueAnnotation,
    pub away: ValueAnnotation,
}

impl MatchValue {
    pub fn get(&self, outcome: Outcome) -> &ValueAnnotation {
        match outcome {
            Outcome::Home => &self.home,
            Outcome::Draw => &self.draw,
            Outcome::Away => &self.away,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueAnnotation> {
        [&self.home, &self.draw, &self.away].into_iter()
    }

    pub fn value_bets(&self) -> impl Iterator<Item = &ValueAnnotation> {
        self.iter().filter(|a| a.is_value)
    }

    pub fn best(&self) -> &ValueAnnotation {
        let mut best = &self.home;
        for a in [&self.draw, &self.away] {
            if a.value_pct > best.value_pct {
                best = a;
            }
        }
        best
    }
}

pub fn implied_probability(odds: f64) -> EngineResult<f64> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(EngineError::InvalidOdds { odds });
    }
    Ok(1.0 / odds)
}

/// `(p - implied) / implied * 100`, rounded to one decimal.
pub fn value_percent(model_probability: f64, odds: f64) -> EngineResult<f64> {
    let implied = implied_probability(odds)?;
    let p = ensure_finite("model probability", model_probability)?;
    if !(0.0..=1.0).contains(&p) {
        return Err(EngineError::input(format!(
            "model probability {p} outside [0, 1]"
        )));
    }
    Ok(round1((p - implied) / implied * 100.0))
}

pub fn annotate_outcome(
    outcome: Outcome,
    model_probability: f64,
    odds: f64,
    cfg: &ValueConfig,
) -> EngineResult<ValueAnnotation> {
    let value_pct = value_percent(model_probability, odds)?;
    Ok(ValueAnnotation {
        outcome,
        odds,
        implied_probability: 1.0 / odds,
        model_probability,
        value_pct,
        is_value: value_pct > cfg.threshold_pct,
    })
}

pub fn evaluate(
    probabilities: &OutcomeProbabilities,
    odds: &HdaOdds,
    cfg: &ValueConfig,
) -> EngineResult<MatchValue> {
    probabilities.validate()?;
    let annotate = |o: Outcome| annotate_outcome(o, probabilities.get(o), odds.get(o), cfg);
    Ok(MatchValue {
        home: annotate(Outcome::Home)?,
        draw: annotate(Outcome::Draw)?,
        away: annotate(Outcome::Away)?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedMatch {
    #[serde(rename = "match")]
    pub fixture: MatchOdds,
    pub home_rating: f64,
    pub away_rating: f64,
    pub probabilities: OutcomeProbabilities,
    pub value: MatchValue,
}

impl ValuedMatch {
    pub fn has_value(&self) -> bool {
        self.value.value_bets().next().is_some()
    }
}

pub fn annotate_match<S: RatingStore + ?Sized>(
    fixture: &MatchOdds,
    store: &S,
    elo_cfg: &EloConfig,
    value_cfg: &ValueConfig,
) -> EngineResult<ValuedMatch> {
    let home_rating = store.get(&fixture.home_team);
    let away_rating = store.get(&fixture.away_team);
    let probabilities = outcome_probabilities(home_rating, away_rating, elo_cfg)?;
    let value = evaluate(&probabilities, &fixture.odds, value_cfg)?;
    Ok(ValuedMatch {
        fixture: fixture.clone(),
        home_rating,
        away_rating,
        probabilities,
        value,
    })
}

/// Annotate a whole board in parallel. Lines that fail validation are
/// logged and dropped; input order is preserved.
pub fn annotate_pool<S: RatingStore + Sync + ?Sized>(
    matches: &[MatchOdds],
    store: &S,
    elo_cfg: &EloConfig,
    value_cfg: &ValueConfig,
) -> Vec<ValuedMatch> {
    let annotated: Vec<Option<ValuedMatch>> = matches
        .par_iter()
        .map(|m| match annotate_match(m, store, elo_cfg, value_cfg) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(
                    fixture = %m.label(),
                    bookmaker = %m.bookmaker,
                    error = %err,
                    "skipping line"
                );
                None
            }
        })
        .collect();
    let pool: Vec<ValuedMatch> = annotated.into_iter().flatten().collect();
    tracing::debug!(lines = matches.len(), annotated = pool.len(), "annotated pool");
    pool
}

/// Lines for display, best edge first. Without `include_all` only lines
/// with at least one value bet are kept. Ties keep feed order.
pub fn value_board(pool: &[ValuedMatch], include_all: bool) -> Vec<&ValuedMatch> {
    let mut board: Vec<&ValuedMatch> = pool
        .iter()
        .filter(|vm| include_all || vm.has_value())
        .collect();
    board.sort_by(|a, b| b.value.best().value_pct.total_cmp(&a.value.best().value_pct));
    board
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_handles_negatives() {
        assert_eq!(round1(-3.349), -3.3);
        assert_eq!(round1(12.36), 12.4);
    }

    #[test]
    fn best_prefers_highest_value() {
        let probs = OutcomeProbabilities::new(0.5, 0.3, 0.2).unwrap();
        let odds = HdaOdds::new(1.9, 4.0, 4.0);
        let mv = evaluate(&probs, &odds, &ValueConfig::default()).unwrap();
        assert_eq!(mv.best().outcome, Outcome::Draw);
    }
}
