use epl_valuebets::prediction::{MatchFactors, predict_match};
use epl_valuebets::{EloConfig, EngineError, InMemoryRatingStore, Outcome, RiskLevel};

#[test]
fn strong_home_favourite() {
    let store = InMemoryRatingStore::epl_seeded();
    let p = predict_match("Manchester City", "Luton Town", &store, &EloConfig::default(), None)
        .unwrap();

    assert_eq!(p.predicted_outcome, Outcome::Home);
    assert_eq!(p.home_rating, 2100.0);
    assert_eq!(p.away_rating, 1600.0);
    assert!(p.probabilities.home > 0.6);
    assert!(p.confidence > 0.8 && p.confidence <= 1.0);
    assert_eq!(p.risk_level, RiskLevel::Low);
    assert!(p.expected_value > 0.0);
    assert!(
        p.reasoning
            .starts_with("Manchester City has a significant rating advantage (2100 vs 1600)."),
        "{}",
        p.reasoning
    );
}

#[test]
fn even_match_is_uncertain() {
    let store = InMemoryRatingStore::epl_seeded();
    let p = predict_match("Everton", "Fulham", &store, &EloConfig::default(), None).unwrap();

    assert_eq!(p.risk_level, RiskLevel::High);
    assert!(p.reasoning.starts_with("Teams are closely matched"));
    assert!(p.reasoning.ends_with("Match outcome is highly uncertain."));
}

#[test]
fn unknown_teams_use_baseline() {
    let store = InMemoryRatingStore::default();
    let p = predict_match("Leeds United", "Sunderland", &store, &EloConfig::default(), None)
        .unwrap();
    assert_eq!(p.home_rating, 1500.0);
    assert_eq!(p.away_rating, 1500.0);
    assert_eq!(p.predicted_outcome, Outcome::Home);
}

#[test]
fn away_form_shifts_probability_to_away_side() {
    let store = InMemoryRatingStore::epl_seeded();
    let cfg = EloConfig::default();
    let base = predict_match("Chelsea", "Aston Villa", &store, &cfg, None).unwrap();
    let factors = MatchFactors {
        away_form: Some(10.0),
        ..MatchFactors::default()
    };
    let adjusted = predict_match("Chelsea", "Aston Villa", &store, &cfg, Some(&factors)).unwrap();

    assert!(adjusted.probabilities.away > base.probabilities.away);
    assert!((adjusted.probabilities.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn factors_outside_scale_are_invalid_input() {
    let store = InMemoryRatingStore::epl_seeded();
    let factors = MatchFactors {
        injuries: Some(-1.0),
        ..MatchFactors::default()
    };
    let err = predict_match("Arsenal", "Brentford", &store, &EloConfig::default(), Some(&factors))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
