use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::combination::{RiskThresholds, SearchConfig};
use crate::elo::EloConfig;
use crate::odds_fetch::OddsFetchConfig;
use crate::rating_db;
use crate::value::ValueConfig;

/// Every tunable, read from the process environment.
///
/// Unparseable values fall back to the default; parsed values are clamped.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub elo: EloConfig,
    pub value: ValueConfig,
    pub search: SearchConfig,
    pub odds: OddsFetchConfig,
    pub ratings_db: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elo: EloConfig::default(),
            value: ValueConfig::default(),
            search: SearchConfig::default(),
            odds: OddsFetchConfig::default(),
            ratings_db: rating_db::default_db_path(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d_elo = EloConfig::default();
        let elo = EloConfig {
            k_factor: env_f64("ELO_K_FACTOR", d_elo.k_factor).clamp(1.0, 100.0),
            home_advantage: env_f64("ELO_HOME_ADVANTAGE", d_elo.home_advantage)
                .clamp(-400.0, 400.0),
            draw_factor: env_f64("ELO_DRAW_FACTOR", d_elo.draw_factor).clamp(0.0, 0.6),
            draw_spread: env_f64("ELO_DRAW_SPREAD", d_elo.draw_spread).clamp(0.0, 1.0),
            initial_rating: env_f64("ELO_INITIAL_RATING", d_elo.initial_rating),
            home_advantage_in_updates: env_flag(
                "ELO_HOME_ADVANTAGE_IN_UPDATES",
                d_elo.home_advantage_in_updates,
            ),
        };

        let value = ValueConfig {
            threshold_pct: env_f64("VALUE_BET_THRESHOLD", 0.0).clamp(-100.0, 1000.0),
        };

        let d_search = SearchConfig::default();
        let d_risk = RiskThresholds::default();
        let search = SearchConfig {
            risk_thresholds: RiskThresholds {
                conservative: env_f64("COMBO_CONSERVATIVE_MIN_PROB", d_risk.conservative)
                    .clamp(0.0, 1.0),
                moderate: env_f64("COMBO_MODERATE_MIN_PROB", d_risk.moderate).clamp(0.0, 1.0),
                aggressive: env_f64("COMBO_AGGRESSIVE_MIN_PROB", d_risk.aggressive)
                    .clamp(0.0, 1.0),
            },
            require_non_negative_value: env_flag(
                "COMBO_REQUIRE_VALUE",
                d_search.require_non_negative_value,
            ),
            acceptance_band: env_f64("COMBO_ACCEPTANCE_BAND", d_search.acceptance_band)
                .clamp(0.0, 1.0),
            max_results: env_parse("COMBO_MAX_RESULTS")
                .unwrap_or(d_search.max_results)
                .clamp(1, 100),
            iteration_budget: env_parse("COMBO_ITERATION_BUDGET").filter(|v: &usize| *v > 0),
            ..d_search
        };

        let ratings_db = env_string("RATINGS_DB")
            .map(PathBuf::from)
            .or_else(rating_db::default_db_path);

        Self {
            elo,
            value,
            search,
            odds: OddsFetchConfig::from_env(),
            ratings_db,
        }
    }
}

/// Trimmed value of `key`; unset and blank read as absent.
pub(crate) fn env_string(key: &str) -> Option<String> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key)?.parse().ok()
}

/// Unrecognised spellings keep the default rather than guessing.
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    env_string(key)
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_parse::<f64>(key)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}
