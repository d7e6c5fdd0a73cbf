use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use epl_valuebets::elo::replay_results;
use epl_valuebets::{
    EloConfig, EngineError, HdaOdds, InMemoryRatingStore, MatchOdds, Outcome, RatingStore,
    apply_result, expected_score, outcome_probabilities, update_rating,
};

#[test]
fn expected_score_is_symmetric_under_flipped_advantage() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..500 {
        let a = rng.gen_range(1000.0..2400.0);
        let b = rng.gen_range(1000.0..2400.0);
        let h = rng.gen_range(-200.0..200.0);
        let forward = expected_score(a, b, h).unwrap();
        let reverse = expected_score(b, a, -h).unwrap();
        assert!((forward + reverse - 1.0).abs() < 1e-12, "a={a} b={b} h={h}");
        assert!(forward > 0.0 && forward < 1.0);
    }
}

#[test]
fn outcome_probabilities_sum_to_one_and_stay_in_range() {
    let cfg = EloConfig::default();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let home = rng.gen_range(800.0..2600.0);
        let away = rng.gen_range(800.0..2600.0);
        let p = outcome_probabilities(home, away, &cfg).unwrap();
        assert!((p.sum() - 1.0).abs() < 1e-6);
        for outcome in Outcome::ALL {
            let v = p.get(outcome);
            assert!((0.0..=1.0).contains(&v), "{outcome} = {v}");
        }
    }
}

#[test]
fn stronger_home_side_is_favourite_and_draw_peaks_when_level() {
    let cfg = EloConfig::default();
    let city_luton = outcome_probabilities(2100.0, 1600.0, &cfg).unwrap();
    assert!(city_luton.home > city_luton.away);
    assert_eq!(city_luton.most_likely(), Outcome::Home);

    // With the home advantage cancelled the sides are level.
    let level = outcome_probabilities(1500.0, 1600.0, &cfg).unwrap();
    assert!((level.home - level.away).abs() < 1e-9);
    assert!(level.draw > city_luton.draw);
}

#[test]
fn level_teams_split_matches_hand_calculation() {
    let cfg = EloConfig {
        home_advantage: 0.0,
        ..EloConfig::default()
    };
    // e = 0.5: home = away = 0.375, draw = 0.25 + 0.1 = 0.35, total 1.1.
    let p = outcome_probabilities(1700.0, 1700.0, &cfg).unwrap();
    assert!((p.home - 0.375 / 1.1).abs() < 1e-12);
    assert!((p.draw - 0.35 / 1.1).abs() < 1e-12);
    assert!((p.away - 0.375 / 1.1).abs() < 1e-12);
}

#[test]
fn non_finite_rating_is_invalid_input() {
    let cfg = EloConfig::default();
    assert!(matches!(
        expected_score(f64::NAN, 1500.0, 0.0),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        outcome_probabilities(1500.0, f64::INFINITY, &cfg),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        update_rating(f64::NEG_INFINITY, 0.5, 1.0, 32.0),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn update_is_monotonic_in_result() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let rating = rng.gen_range(1000.0..2400.0);
        let expected = rng.gen_range(0.0..1.0);
        let k = rng.gen_range(1.0..64.0);
        let win = update_rating(rating, expected, 1.0, k).unwrap();
        let loss = update_rating(rating, expected, 0.0, k).unwrap();
        assert!(win >= rating);
        assert!(loss <= rating);
    }
}

#[test]
fn apply_result_is_zero_sum_and_writes_store() {
    let mut store = InMemoryRatingStore::epl_seeded();
    let cfg = EloConfig::default();
    let city_before = store.get("Manchester City");
    let arsenal_before = store.get("Arsenal");

    let change =
        apply_result(&mut store, "Manchester City", "Arsenal", Outcome::Away, &cfg).unwrap();

    assert!(change.home_delta() < 0.0);
    assert!(change.away_delta() > 0.0);
    assert!((change.home_delta() + change.away_delta()).abs() < 1e-9);
    assert_eq!(store.get("Manchester City"), city_before + change.home_delta());
    assert_eq!(store.get("Arsenal"), arsenal_before + change.away_delta());
}

#[test]
fn upset_moves_ratings_more_than_expected_result() {
    let cfg = EloConfig::default();

    let mut upset = InMemoryRatingStore::epl_seeded();
    let u =
        apply_result(&mut upset, "Manchester City", "Luton Town", Outcome::Away, &cfg).unwrap();

    let mut routine = InMemoryRatingStore::epl_seeded();
    let r =
        apply_result(&mut routine, "Manchester City", "Luton Town", Outcome::Home, &cfg).unwrap();

    assert!(u.away_delta().abs() > r.home_delta().abs());
}

#[test]
fn home_advantage_only_enters_updates_when_enabled() {
    let mut plain = InMemoryRatingStore::default();
    let off = apply_result(&mut plain, "Everton", "Fulham", Outcome::Home, &EloConfig::default())
        .unwrap();
    // Level sides expect 0.5 each, so a home win moves k/2.
    assert!((off.home_delta() - 16.0).abs() < 1e-9);

    let cfg = EloConfig {
        home_advantage_in_updates: true,
        ..EloConfig::default()
    };
    let mut adjusted = InMemoryRatingStore::default();
    let on = apply_result(&mut adjusted, "Everton", "Fulham", Outcome::Home, &cfg).unwrap();
    let expected_home = 1.0 / (1.0 + 10f64.powf(-cfg.home_advantage / 400.0));
    assert!((on.home_delta() - cfg.k_factor * (1.0 - expected_home)).abs() < 1e-9);
    assert!((on.home_delta() - 11.518).abs() < 1e-3);
    assert!(on.home_delta() < off.home_delta());
    assert!((on.home_delta() + on.away_delta()).abs() < 1e-9);
}

#[test]
fn team_cannot_play_itself() {
    let mut store = InMemoryRatingStore::default();
    let err = apply_result(&mut store, "Everton", "Everton", Outcome::Draw, &EloConfig::default())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn replay_applies_results_in_kickoff_order_and_skips_unplayed() {
    let base = chrono::DateTime::parse_from_rfc3339("2024-08-17T14:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let line = |home: &str, away: &str, days: i64, result: Option<Outcome>| MatchOdds {
        home_team: home.to_string(),
        away_team: away.to_string(),
        start_time: base + chrono::Duration::days(days),
        bookmaker: "Bet365".to_string(),
        odds: HdaOdds::new(2.0, 3.4, 3.6),
        result,
    };
    let matches = vec![
        line("Fulham", "Everton", 7, Some(Outcome::Draw)),
        line("Everton", "Fulham", 0, Some(Outcome::Home)),
        line("Everton", "Chelsea", 14, None),
    ];

    let mut store = InMemoryRatingStore::default();
    let changes = replay_results(&mut store, &matches, &EloConfig::default()).unwrap();

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].home_team, "Everton");
    assert_eq!(changes[0].result, Outcome::Home);
    assert_eq!(changes[1].home_team, "Fulham");
    assert_eq!(store.get("Chelsea"), 1500.0);
    assert!(store.get("Everton") > 1500.0);
}
