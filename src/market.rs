use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, ensure_finite};

pub const PROBABILITY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }

    pub fn home_score(self) -> f64 {
        match self {
            Outcome::Home => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Away => 0.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "h" | "1" | "home_win" => Ok(Outcome::Home),
            "draw" | "d" | "x" => Ok(Outcome::Draw),
            "away" | "a" | "2" | "away_win" => Ok(Outcome::Away),
            other => Err(EngineError::input(format!(
                "unknown outcome {other:?}, expected home, draw or away"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HdaOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl HdaOdds {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn is_valid(&self) -> bool {
        Outcome::ALL.iter().all(|o| {
            let v = self.get(*o);
            v.is_finite() && v > 1.0
        })
    }

    // Display only; value maths ignores the margin.
    pub fn overround(&self) -> Option<f64> {
        if !self.is_valid() {
            return None;
        }
        Some(1.0 / self.home + 1.0 / self.draw + 1.0 / self.away)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbabilities {
    pub fn new(home: f64, draw: f64, away: f64) -> EngineResult<Self> {
        let probs = Self { home, draw, away };
        probs.validate()?;
        Ok(probs)
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn validate(&self) -> EngineResult<()> {
        for outcome in Outcome::ALL {
            let p = ensure_finite(outcome.as_str(), self.get(outcome))?;
            if !(0.0..=1.0).contains(&p) {
                return Err(EngineError::input(format!(
                    "{outcome} probability {p} outside [0, 1]"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(EngineError::input(format!(
                "probabilities sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }

    /// Most likely outcome. Ties resolve home, then draw, then away.
    pub fn most_likely(&self) -> Outcome {
        let mut best = Outcome::Home;
        for outcome in [Outcome::Draw, Outcome::Away] {
            if self.get(outcome) > self.get(best) {
                best = outcome;
            }
        }
        best
    }

    pub fn max(&self) -> f64 {
        self.home.max(self.draw).max(self.away)
    }

    pub fn min(&self) -> f64 {
        self.home.min(self.draw).min(self.away)
    }

    pub(crate) fn normalized(home: f64, draw: f64, away: f64) -> EngineResult<Self> {
        let home = ensure_finite("home probability", home)?.clamp(0.0, 1.0);
        let draw = ensure_finite("draw probability", draw)?.clamp(0.0, 1.0);
        let away = ensure_finite("away probability", away)?.clamp(0.0, 1.0);
        let sum = home + draw + away;
        if sum <= 0.0 {
            return Err(EngineError::input("probabilities sum to zero"));
        }
        Ok(Self {
            home: home / sum,
            draw: draw / sum,
            away: away / sum,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureKey {
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub bookmaker: String,
    pub fixture: FixtureKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub bookmaker: String,
    pub odds: HdaOdds,
    #[serde(default)]
    pub result: Option<Outcome>,
}

impl MatchOdds {
    pub fn fixture_key(&self) -> FixtureKey {
        FixtureKey {
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            start_time: self.start_time,
        }
    }

    pub fn key(&self) -> MatchKey {
        MatchKey {
            bookmaker: self.bookmaker.clone(),
            fixture: self.fixture_key(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Replace earlier lines with later ones for the same bookmaker and fixture.
pub fn merge_refresh(current: &mut Vec<MatchOdds>, fresh: Vec<MatchOdds>) {
    for m in fresh {
        let key = m.key();
        match current.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = m,
            None => current.push(m),
        }
    }
}
