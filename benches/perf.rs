use criterion::{Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use std::hint::black_box;

use chrono::{DateTime, Utc};
use epl_valuebets::fake_odds::fake_fixtures;
use epl_valuebets::odds_fetch::parse_odds_events_json;
use epl_valuebets::{
    CombinationRequest, EloConfig, InMemoryRatingStore, MatchOdds, Outcome, RiskTolerance,
    SearchConfig, ValueConfig, annotate_pool, outcome_probabilities, search,
};

fn fixed_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-09-13T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Ten fixtures, each priced by five bookmakers.
fn sample_board() -> Vec<MatchOdds> {
    let mut board = Vec::new();
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(11);
        let mut round = fake_fixtures(&mut rng, 10, fixed_now());
        let mut prices = StdRng::seed_from_u64(100 + seed);
        for line in &mut round {
            let nudge = 1.0 + prices.gen_range(-0.05..0.05);
            line.odds.home = (line.odds.home * nudge).max(1.01);
            line.bookmaker = format!("Book {seed}");
        }
        board.extend(round);
    }
    board
}

fn bench_outcome_probabilities(c: &mut Criterion) {
    let cfg = EloConfig::default();
    c.bench_function("outcome_probabilities", |b| {
        b.iter(|| {
            let p = outcome_probabilities(black_box(1840.0), black_box(1790.0), &cfg).unwrap();
            black_box(p.home);
        })
    });
}

fn bench_annotate_pool(c: &mut Criterion) {
    let board = sample_board();
    let store = InMemoryRatingStore::epl_seeded();
    let elo = EloConfig::default();
    let value = ValueConfig::default();
    c.bench_function("annotate_pool_50_lines", |b| {
        b.iter(|| {
            let pool = annotate_pool(black_box(&board), &store, &elo, &value);
            black_box(pool.len());
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let board = sample_board();
    let store = InMemoryRatingStore::epl_seeded();
    let pool = annotate_pool(&board, &store, &EloConfig::default(), &ValueConfig::default());
    let cfg = SearchConfig {
        require_non_negative_value: false,
        iteration_budget: Some(200_000),
        ..SearchConfig::default()
    };
    let request = CombinationRequest::new(6.0, 4, RiskTolerance::Aggressive, []);
    c.bench_function("search_fourfold_aggressive", |b| {
        b.iter(|| {
            let combos = search(black_box(&pool), &request, &cfg).unwrap();
            black_box(combos.len());
        })
    });

    let homes = CombinationRequest::new(3.5, 3, RiskTolerance::Moderate, [Outcome::Home]);
    c.bench_function("search_home_treble_moderate", |b| {
        b.iter(|| {
            let combos = search(black_box(&pool), &homes, &cfg).unwrap();
            black_box(combos.len());
        })
    });
}

fn bench_odds_parse(c: &mut Criterion) {
    c.bench_function("theoddsapi_parse", |b| {
        b.iter(|| {
            let lines = parse_odds_events_json(black_box(ODDS_JSON)).unwrap();
            black_box(lines.len());
        })
    });
}

criterion_group!(
    perf,
    bench_outcome_probabilities,
    bench_annotate_pool,
    bench_search,
    bench_odds_parse
);
criterion_main!(perf);

static ODDS_JSON: &str = include_str!("../tests/fixtures/theoddsapi_epl.json");
