use std::cmp::Ordering;
use std::collections::HashMap;

pub const BASELINE_RATING: f64 = 1500.0;

/// Current Elo rating per team.
///
/// Reads of an unseen team return the store's baseline. Writes are
/// last-writer-wins; callers serialise them.
pub trait RatingStore {
    fn get(&self, team: &str) -> f64;
    fn set(&mut self, team: &str, rating: f64);
}

#[derive(Debug, Clone)]
pub struct InMemoryRatingStore {
    baseline: f64,
    ratings: HashMap<String, f64>,
}

impl Default for InMemoryRatingStore {
    fn default() -> Self {
        Self::new(BASELINE_RATING)
    }
}

impl InMemoryRatingStore {
    pub fn new(baseline: f64) -> Self {
        Self {
            baseline,
            ratings: HashMap::new(),
        }
    }

    pub fn with_ratings<I, S>(baseline: f64, ratings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut store = Self::new(baseline);
        for (team, rating) in ratings {
            store.ratings.insert(team.into(), rating);
        }
        store
    }

    pub fn epl_seeded() -> Self {
        Self::with_ratings(BASELINE_RATING, EPL_SEED_RATINGS.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn standings(&self) -> Vec<(String, f64)> {
        let mut rows: Vec<(String, f64)> = self
            .ratings
            .iter()
            .map(|(team, rating)| (team.clone(), *rating))
            .collect();
        rows.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        rows
    }
}

impl RatingStore for InMemoryRatingStore {
    fn get(&self, team: &str) -> f64 {
        self.ratings.get(team).copied().unwrap_or(self.baseline)
    }

    fn set(&mut self, team: &str, rating: f64) {
        self.ratings.insert(team.to_string(), rating);
    }
}

pub const EPL_SEED_RATINGS: &[(&str, f64)] = &[
    ("Manchester City", 2100.0),
    ("Arsenal", 2050.0),
    ("Liverpool", 2040.0),
    ("Newcastle United", 1950.0),
    ("Manchester United", 1920.0),
    ("Tottenham Hotspur", 1900.0),
    ("Brighton & Hove Albion", 1850.0),
    ("Aston Villa", 1840.0),
    ("West Ham United", 1800.0),
    ("Chelsea", 1790.0),
    ("Crystal Palace", 1750.0),
    ("Brentford", 1740.0),
    ("Fulham", 1730.0),
    ("Wolverhampton Wanderers", 1720.0),
    ("Everton", 1700.0),
    ("Nottingham Forest", 1690.0),
    ("Bournemouth", 1680.0),
    ("Sheffield United", 1650.0),
    ("Burnley", 1640.0),
    ("Luton Town", 1600.0),
];
