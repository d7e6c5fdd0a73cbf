//! Accumulator search over a value-annotated pool.
//!
//! Candidate legs are filtered by preferred outcome, value and the risk
//! tolerance's probability floor, grouped per fixture, then enumerated as
//! 1..=N fixture combinations with one leg each. Survivors must land inside
//! an acceptance band around the target price and are ranked by distance to
//! it, then by combined model confidence.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::market::{FixtureKey, Outcome};
use crate::value::ValuedMatch;

pub const MIN_TARGET_ODDS: f64 = 1.1;
pub const MAX_TARGET_ODDS: f64 = 50.0;
pub const MAX_LEGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTolerance {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "conservative" | "low" => Ok(RiskTolerance::Conservative),
            "moderate" | "medium" => Ok(RiskTolerance::Moderate),
            "aggressive" | "high" => Ok(RiskTolerance::Aggressive),
            other => Err(EngineError::request(format!(
                "unknown risk tolerance {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationKind {
    Single,
    Double,
    Triple,
    Fourfold,
    Fivefold,
}

impl CombinationKind {
    pub fn for_legs(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Fourfold),
            5 => Some(Self::Fivefold),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Triple => "Triple",
            Self::Fourfold => "Fourfold",
            Self::Fivefold => "Fivefold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationRequest {
    pub target_odds: f64,
    pub max_matches: usize,
    pub risk_tolerance: RiskTolerance,
    /// Empty means every outcome is acceptable.
    #[serde(default)]
    pub preferred_outcomes: Vec<Outcome>,
}

impl CombinationRequest {
    pub fn new(
        target_odds: f64,
        max_matches: usize,
        risk_tolerance: RiskTolerance,
        preferred_outcomes: impl IntoIterator<Item = Outcome>,
    ) -> Self {
        Self {
            target_odds,
            max_matches,
            risk_tolerance,
            preferred_outcomes: preferred_outcomes.into_iter().collect(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.target_odds.is_finite()
            || !(MIN_TARGET_ODDS..=MAX_TARGET_ODDS).contains(&self.target_odds)
        {
            return Err(EngineError::request(format!(
                "target odds {} outside [{MIN_TARGET_ODDS}, {MAX_TARGET_ODDS}]",
                self.target_odds
            )));
        }
        if !(1..=MAX_LEGS).contains(&self.max_matches) {
            return Err(EngineError::request(format!(
                "max matches {} outside [1, {MAX_LEGS}]",
                self.max_matches
            )));
        }
        Ok(())
    }

    pub fn accepts(&self, outcome: Outcome) -> bool {
        self.preferred_outcomes.is_empty() || self.preferred_outcomes.contains(&outcome)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub conservative: f64,
    pub moderate: f64,
    pub aggressive: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            conservative: 0.55,
            moderate: 0.40,
            aggressive: 0.0,
        }
    }
}

impl RiskThresholds {
    pub fn min_probability(&self, tolerance: RiskTolerance) -> f64 {
        match tolerance {
            RiskTolerance::Conservative => self.conservative,
            RiskTolerance::Moderate => self.moderate,
            RiskTolerance::Aggressive => self.aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub risk_thresholds: RiskThresholds,
    /// Drop legs whose value% is negative before enumerating.
    pub require_non_negative_value: bool,
    pub acceptance_band: f64,
    pub max_results: usize,
    /// Cap on evaluated candidates. `None` walks the whole space.
    pub iteration_budget: Option<usize>,
    pub low_risk_confidence: f64,
    pub medium_risk_confidence: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            risk_thresholds: RiskThresholds::default(),
            require_non_negative_value: true,
            acceptance_band: 0.20,
            max_results: 10,
            iteration_budget: None,
            low_risk_confidence: 0.45,
            medium_risk_confidence: 0.20,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !self.acceptance_band.is_finite() || self.acceptance_band < 0.0 {
            return Err(EngineError::input(format!(
                "acceptance band {} must be a non-negative number",
                self.acceptance_band
            )));
        }
        if self.medium_risk_confidence > self.low_risk_confidence {
            return Err(EngineError::input(
                "medium risk confidence must not exceed low risk confidence",
            ));
        }
        Ok(())
    }

    pub fn risk_level(&self, combined_confidence: f64) -> RiskLevel {
        if combined_confidence >= self.low_risk_confidence {
            RiskLevel::Low
        } else if combined_confidence >= self.medium_risk_confidence {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub bookmaker: String,
    pub outcome: Outcome,
    pub odds: f64,
    pub probability: f64,
    pub value_pct: f64,
}

impl Leg {
    pub fn fixture_key(&self) -> FixtureKey {
        FixtureKey {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            start_time: self.start_time,
        }
    }

    pub fn selection(&self) -> String {
        match self.outcome {
            Outcome::Home => format!("{} to win", self.home_team),
            Outcome::Away => format!("{} to win", self.away_team),
            Outcome::Draw => "Draw".to_string(),
        }
    }

    fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    pub kind: CombinationKind,
    pub legs: Vec<Leg>,
    pub combined_odds: f64,
    pub combined_confidence: f64,
    pub risk_level: RiskLevel,
    pub description: String,
    pub reasoning: String,
}

impl Combination {
    pub fn distance_to(&self, target_odds: f64) -> f64 {
        (self.combined_odds - target_odds).abs()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.legs.iter().map(|l| l.outcome).collect()
    }
}

pub fn search(
    pool: &[ValuedMatch],
    request: &CombinationRequest,
    cfg: &SearchConfig,
) -> EngineResult<Vec<Combination>> {
    request.validate()?;
    cfg.validate()?;

    let groups = candidate_groups(pool, request, cfg);
    if groups.is_empty() {
        tracing::debug!(pool = pool.len(), "no candidate legs");
        return Ok(Vec::new());
    }

    let mut walker = Walker {
        groups: &groups,
        request,
        cfg,
        upper: request.target_odds * (1.0 + cfg.acceptance_band),
        lower: request.target_odds * (1.0 - cfg.acceptance_band),
        budget_left: cfg.iteration_budget,
        evaluated: 0,
        hits: Vec::new(),
    };
    let max_legs = request.max_matches.min(groups.len());
    let mut chosen = Vec::with_capacity(max_legs);
    for size in 1..=max_legs {
        walker.walk(0, size, 1.0, &mut chosen);
        if walker.budget_left == Some(0) {
            tracing::warn!(
                evaluated = walker.evaluated,
                "combination budget exhausted, results may be partial"
            );
            break;
        }
    }

    let Walker {
        evaluated,
        mut hits,
        ..
    } = walker;
    hits.sort_by(|a, b| {
        a.distance_to(request.target_odds)
            .total_cmp(&b.distance_to(request.target_odds))
            .then_with(|| b.combined_confidence.total_cmp(&a.combined_confidence))
            .then_with(|| a.description.cmp(&b.description))
    });
    let matched = hits.len();
    hits.truncate(cfg.max_results);
    tracing::debug!(
        fixtures = groups.len(),
        evaluated,
        matched,
        returned = hits.len(),
        "combination search"
    );
    Ok(hits)
}

/// Legs that survive outcome, value and risk filtering, one group per
/// fixture in order of first appearance.
fn candidate_groups(
    pool: &[ValuedMatch],
    request: &CombinationRequest,
    cfg: &SearchConfig,
) -> Vec<Vec<Leg>> {
    let min_prob = cfg.risk_thresholds.min_probability(request.risk_tolerance);
    let mut index: HashMap<FixtureKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<Leg>> = Vec::new();

    for vm in pool {
        for annotation in vm.value.iter() {
            if !request.accepts(annotation.outcome) {
                continue;
            }
            if cfg.require_non_negative_value && annotation.value_pct < 0.0 {
                continue;
            }
            if annotation.model_probability < min_prob {
                continue;
            }
            let m = &vm.fixture;
            let leg = Leg {
                home_team: m.home_team.clone(),
                away_team: m.away_team.clone(),
                start_time: m.start_time,
                bookmaker: m.bookmaker.clone(),
                outcome: annotation.outcome,
                odds: annotation.odds,
                probability: annotation.model_probability,
                value_pct: annotation.value_pct,
            };
            let slot = *index.entry(m.fixture_key()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(leg);
        }
    }
    groups
}

struct Walker<'a> {
    groups: &'a [Vec<Leg>],
    request: &'a CombinationRequest,
    cfg: &'a SearchConfig,
    upper: f64,
    lower: f64,
    budget_left: Option<usize>,
    evaluated: usize,
    hits: Vec<Combination>,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, start: usize, remaining: usize, odds: f64, chosen: &mut Vec<&'a Leg>) {
        if remaining == 0 {
            self.evaluate(chosen);
            return;
        }
        let groups = self.groups;
        // Leave enough fixtures after `idx` to fill the remaining slots.
        let last = groups.len() + 1 - remaining;
        for idx in start..last {
            for leg in &groups[idx] {
                if self.budget_left == Some(0) {
                    return;
                }
                let next = odds * leg.odds;
                // Every price is above 1.0, so more legs only lengthen it.
                if next > self.upper {
                    continue;
                }
                chosen.push(leg);
                self.walk(idx + 1, remaining - 1, next, chosen);
                chosen.pop();
            }
        }
    }

    fn evaluate(&mut self, legs: &[&Leg]) {
        if let Some(left) = self.budget_left.as_mut() {
            *left = left.saturating_sub(1);
        }
        self.evaluated += 1;

        let combined_odds: f64 = legs.iter().map(|l| l.odds).product();
        if combined_odds < self.lower || combined_odds > self.upper {
            return;
        }
        let Some(kind) = CombinationKind::for_legs(legs.len()) else {
            return;
        };
        let combined_confidence: f64 = legs.iter().map(|l| l.probability).product();
        let risk_level = self.cfg.risk_level(combined_confidence);
        let legs: Vec<Leg> = legs.iter().map(|l| (*l).clone()).collect();

        let description = describe(kind, &legs);
        let reasoning = reason(
            kind,
            &legs,
            combined_odds,
            combined_confidence,
            risk_level,
            self.request,
        );
        self.hits.push(Combination {
            kind,
            legs,
            combined_odds,
            combined_confidence,
            risk_level,
            description,
            reasoning,
        });
    }
}

fn describe(kind: CombinationKind, legs: &[Leg]) -> String {
    if let [leg] = legs {
        return format!("{} - {}", leg.fixture_label(), leg.selection());
    }
    let parts: Vec<String> = legs
        .iter()
        .map(|l| format!("{} ({})", l.fixture_label(), l.outcome))
        .collect();
    format!("{}: {}", kind.title(), parts.join(" + "))
}

fn reason(
    kind: CombinationKind,
    legs: &[Leg],
    combined_odds: f64,
    combined_confidence: f64,
    risk_level: RiskLevel,
    request: &CombinationRequest,
) -> String {
    let parts: Vec<String> = legs
        .iter()
        .map(|l| {
            format!(
                "{} in {} at {:.2} (model {:.1}%, value {:+.1}%)",
                l.selection(),
                l.fixture_label(),
                l.odds,
                l.probability * 100.0,
                l.value_pct
            )
        })
        .collect();
    format!(
        "{} at {:.2} against a {:.2} target under {} tolerance. {}. \
         Combined model confidence {:.1}%, {} risk.",
        kind.title(),
        combined_odds,
        request.target_odds,
        request.risk_tolerance,
        parts.join("; "),
        combined_confidence * 100.0,
        risk_level
    )
}
