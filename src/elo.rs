use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, ensure_finite};
use crate::market::{MatchOdds, Outcome, OutcomeProbabilities};
use crate::ratings::{BASELINE_RATING, RatingStore};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    pub k_factor: f64,
    pub home_advantage: f64,
    pub draw_factor: f64,
    pub draw_spread: f64,
    pub initial_rating: f64,
    /// Apply `home_advantage` when computing the expectation used for updates.
    pub home_advantage_in_updates: bool,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            home_advantage: 100.0,
            draw_factor: 0.25,
            draw_spread: 0.2,
            initial_rating: BASELINE_RATING,
            home_advantage_in_updates: false,
        }
    }
}

impl EloConfig {
    pub fn validate(&self) -> EngineResult<()> {
        ensure_finite("k_factor", self.k_factor)?;
        ensure_finite("home_advantage", self.home_advantage)?;
        ensure_finite("initial_rating", self.initial_rating)?;
        if !(0.0..1.0).contains(&self.draw_factor) {
            return Err(EngineError::input(format!(
                "draw_factor {} outside [0, 1)",
                self.draw_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.draw_spread) {
            return Err(EngineError::input(format!(
                "draw_spread {} outside [0, 1]",
                self.draw_spread
            )));
        }
        Ok(())
    }
}

pub fn expected_score(rating_a: f64, rating_b: f64, home_advantage: f64) -> EngineResult<f64> {
    let a = ensure_finite("rating_a", rating_a)?;
    let b = ensure_finite("rating_b", rating_b)?;
    let h = ensure_finite("home_advantage", home_advantage)?;
    Ok(1.0 / (1.0 + 10.0_f64.powf((b - a - h) / 400.0)))
}

// The draw band is `draw_factor` plus a bonus that peaks when the sides are
// level; the win shares are the expectations scaled by `1 - draw_factor`.
pub fn outcome_probabilities(
    home_rating: f64,
    away_rating: f64,
    cfg: &EloConfig,
) -> EngineResult<OutcomeProbabilities> {
    cfg.validate()?;
    let e_home = expected_score(home_rating, away_rating, cfg.home_advantage)?;
    let e_away = 1.0 - e_home;

    let home_raw = e_home * (1.0 - cfg.draw_factor);
    let away_raw = e_away * (1.0 - cfg.draw_factor);
    let draw_raw = cfg.draw_factor + (0.5 - (e_home - 0.5).abs()) * cfg.draw_spread;

    OutcomeProbabilities::normalized(home_raw, draw_raw, away_raw)
}

pub fn update_rating(
    rating: f64,
    expected: f64,
    actual: f64,
    k_factor: f64,
) -> EngineResult<f64> {
    let rating = ensure_finite("rating", rating)?;
    let expected = ensure_finite("expected score", expected)?;
    let k = ensure_finite("k_factor", k_factor)?;
    if ![0.0, 0.5, 1.0].contains(&actual) {
        return Err(EngineError::input(format!(
            "actual score must be 0, 0.5 or 1, got {actual}"
        )));
    }
    Ok(rating + k * (actual - expected))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub home_team: String,
    pub away_team: String,
    pub result: Outcome,
    pub home_before: f64,
    pub home_after: f64,
    pub away_before: f64,
    pub away_after: f64,
}

impl RatingChange {
    pub fn home_delta(&self) -> f64 {
        self.home_after - self.home_before
    }

    pub fn away_delta(&self) -> f64 {
        self.away_after - self.away_before
    }
}

pub fn apply_result<S: RatingStore + ?Sized>(
    store: &mut S,
    home_team: &str,
    away_team: &str,
    result: Outcome,
    cfg: &EloConfig,
) -> EngineResult<RatingChange> {
    if home_team == away_team {
        return Err(EngineError::input(format!(
            "{home_team} cannot play itself"
        )));
    }
    let home_before = store.get(home_team);
    let away_before = store.get(away_team);

    let adv = if cfg.home_advantage_in_updates {
        cfg.home_advantage
    } else {
        0.0
    };
    let e_home = expected_score(home_before, away_before, adv)?;
    let s_home = result.home_score();

    let home_after = update_rating(home_before, e_home, s_home, cfg.k_factor)?;
    let away_after = update_rating(away_before, 1.0 - e_home, 1.0 - s_home, cfg.k_factor)?;

    store.set(home_team, home_after);
    store.set(away_team, away_after);
    tracing::debug!(
        home = home_team,
        away = away_team,
        result = %result,
        home_after,
        away_after,
        "rating update"
    );

    Ok(RatingChange {
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        result,
        home_before,
        home_after,
        away_before,
        away_after,
    })
}

/// Apply every completed match in kickoff order. Matches without a result
/// are skipped, as are repeat lines for a fixture already applied.
pub fn replay_results<S: RatingStore + ?Sized>(
    store: &mut S,
    matches: &[MatchOdds],
    cfg: &EloConfig,
) -> EngineResult<Vec<RatingChange>> {
    let mut finished: Vec<&MatchOdds> = matches.iter().filter(|m| m.result.is_some()).collect();
    finished.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.home_team.cmp(&b.home_team))
    });
    finished.dedup_by(|a, b| a.fixture_key() == b.fixture_key());

    let mut changes = Vec::with_capacity(finished.len());
    for m in finished {
        let Some(result) = m.result else { continue };
        changes.push(apply_result(store, &m.home_team, &m.away_team, result, cfg)?);
    }
    Ok(changes)
}
