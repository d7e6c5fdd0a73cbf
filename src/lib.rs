//! Premier League value bets from Elo ratings.
//!
//! Ratings produce home/draw/away probabilities ([`elo`]), those are
//! compared with bookmaker prices ([`value`]), and the annotated board feeds
//! an accumulator search for a requested price ([`combination`]).

pub mod combination;
pub mod config;
pub mod elo;
pub mod error;
pub mod fake_odds;
pub mod http_client;
pub mod logging;
pub mod market;
pub mod odds_fetch;
pub mod prediction;
pub mod rating_db;
pub mod ratings;
pub mod value;

pub use combination::{
    Combination, CombinationKind, CombinationRequest, Leg, RiskLevel, RiskThresholds,
    RiskTolerance, SearchConfig, search,
};
pub use elo::{
    EloConfig, RatingChange, apply_result, expected_score, outcome_probabilities, update_rating,
};
pub use error::{EngineError, EngineResult};
pub use market::{FixtureKey, HdaOdds, MatchKey, MatchOdds, Outcome, OutcomeProbabilities};
pub use ratings::{InMemoryRatingStore, RatingStore};
pub use value::{
    MatchValue, ValueAnnotation, ValueConfig, ValuedMatch, annotate_pool, evaluate, value_board,
};
