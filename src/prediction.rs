use serde::{Deserialize, Serialize};

use crate::combination::RiskLevel;
use crate::elo::{EloConfig, outcome_probabilities};
use crate::error::{EngineError, EngineResult, ensure_finite};
use crate::market::{Outcome, OutcomeProbabilities};
use crate::ratings::RatingStore;

const UNIFORM_PROBABILITY: f64 = 0.33;

/// Optional pre-match context on a 0-10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchFactors {
    pub home_form: Option<f64>,
    pub away_form: Option<f64>,
    pub injuries: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub home_rating: f64,
    pub away_rating: f64,
    pub predicted_outcome: Outcome,
    /// 0..=1
    pub confidence: f64,
    pub probabilities: OutcomeProbabilities,
    pub risk_level: RiskLevel,
    /// Edge of the favourite over a uniform pick, in percentage points.
    pub expected_value: f64,
    pub reasoning: String,
}

pub fn predict_match<S: RatingStore + ?Sized>(
    home_team: &str,
    away_team: &str,
    store: &S,
    cfg: &EloConfig,
    factors: Option<&MatchFactors>,
) -> EngineResult<Prediction> {
    let home_rating = store.get(home_team);
    let away_rating = store.get(away_team);
    let base = outcome_probabilities(home_rating, away_rating, cfg)?;
    let probabilities = match factors {
        Some(f) => adjust(&base, f)?,
        None => base,
    };

    let confidence = confidence(&probabilities);
    let predicted_outcome = probabilities.most_likely();

    Ok(Prediction {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        home_rating,
        away_rating,
        predicted_outcome,
        confidence,
        probabilities,
        risk_level: risk_level(confidence, &probabilities),
        expected_value: (probabilities.max() - UNIFORM_PROBABILITY) * 100.0,
        reasoning: reasoning(home_team, away_team, home_rating, away_rating, &probabilities),
    })
}

fn adjust(base: &OutcomeProbabilities, f: &MatchFactors) -> EngineResult<OutcomeProbabilities> {
    let mut home = base.home;
    let mut draw = base.draw;
    let mut away = base.away;

    if let Some(form) = f.home_form {
        home *= 1.0 + scale("home_form", form)? * 0.1;
    }
    if let Some(form) = f.away_form {
        away *= 1.0 + scale("away_form", form)? * 0.1;
    }
    if let Some(injuries) = f.injuries {
        let impact = scale("injuries", injuries)?;
        home *= 1.0 - impact * 0.05;
        away *= 1.0 - impact * 0.05;
        draw *= 1.0 + impact * 0.1;
    }
    OutcomeProbabilities::normalized(home, draw, away)
}

fn scale(label: &str, raw: f64) -> EngineResult<f64> {
    let v = ensure_finite(label, raw)?;
    if !(0.0..=10.0).contains(&v) {
        return Err(EngineError::input(format!("{label} {v} outside [0, 10]")));
    }
    Ok(v / 10.0)
}

/// Clear favourites score higher: max plus half the spread, capped at 1.
fn confidence(p: &OutcomeProbabilities) -> f64 {
    let max = p.max();
    (max + (max - p.min()) * 0.5).min(1.0)
}

fn risk_level(confidence: f64, p: &OutcomeProbabilities) -> RiskLevel {
    let max = p.max();
    if confidence > 0.8 && max > 0.6 {
        RiskLevel::Low
    } else if confidence > 0.6 && max > 0.45 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn reasoning(
    home_team: &str,
    away_team: &str,
    home_rating: f64,
    away_rating: f64,
    p: &OutcomeProbabilities,
) -> String {
    let diff = home_rating - away_rating;
    let mut parts = Vec::with_capacity(3);

    if diff > 100.0 {
        parts.push(format!(
            "{home_team} has a significant rating advantage ({home_rating:.0} vs {away_rating:.0})"
        ));
    } else if diff > 50.0 {
        parts.push(format!("{home_team} has a moderate rating advantage"));
    } else if diff < -100.0 {
        parts.push(format!(
            "{away_team} has a significant rating advantage ({away_rating:.0} vs {home_rating:.0})"
        ));
    } else if diff < -50.0 {
        parts.push(format!("{away_team} has a moderate rating advantage"));
    } else {
        parts.push("Teams are closely matched in terms of rating".to_string());
    }

    parts.push("Home advantage provides additional edge".to_string());

    let likely = match p.most_likely() {
        Outcome::Home => "home win",
        Outcome::Draw => "draw",
        Outcome::Away => "away win",
    };
    let max_pct = p.max() * 100.0;
    if max_pct > 60.0 {
        parts.push(format!("Strong likelihood of {likely} ({max_pct:.1}%)"));
    } else if max_pct > 45.0 {
        parts.push(format!("Moderate likelihood of {likely} ({max_pct:.1}%)"));
    } else {
        parts.push("Match outcome is highly uncertain".to_string());
    }

    format!("{}.", parts.join(". "))
}
