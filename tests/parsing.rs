use std::fs;
use std::path::PathBuf;

use epl_valuebets::market::merge_refresh;
use epl_valuebets::odds_fetch::{normalize_team_name, parse_odds_events_json};
use epl_valuebets::{
    EloConfig, HdaOdds, InMemoryRatingStore, MatchOdds, ValueConfig, annotate_pool,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_theoddsapi_fixture() {
    let raw = read_fixture("theoddsapi_epl.json");
    let lines = parse_odds_events_json(&raw).expect("fixture should parse");

    // Totals-only and two-way markets are dropped, as is the event with no kickoff.
    assert_eq!(lines.len(), 3);

    assert_eq!(lines[0].bookmaker, "William Hill");
    assert_eq!(lines[0].home_team, "Manchester City");
    assert_eq!(lines[0].away_team, "Wolverhampton Wanderers");
    assert_eq!(lines[0].odds, HdaOdds::new(1.25, 6.5, 11.0));
    assert_eq!(
        lines[0].start_time.to_rfc3339(),
        "2024-09-14T16:30:00+00:00"
    );
    assert!(lines[0].result.is_none());

    assert_eq!(lines[1].bookmaker, "betfair_ex_uk");
    assert_eq!(lines[1].odds, HdaOdds::new(1.27, 7.0, 12.5));
    assert_eq!(lines[0].fixture_key(), lines[1].fixture_key());
    assert_ne!(lines[0].key(), lines[1].key());
}

#[test]
fn feed_spellings_map_onto_rating_names() {
    let raw = read_fixture("theoddsapi_epl.json");
    let lines = parse_odds_events_json(&raw).expect("fixture should parse");

    let united = &lines[2];
    assert_eq!(united.home_team, "Manchester United");
    assert_eq!(united.away_team, "Luton Town");
    assert_eq!(united.odds, HdaOdds::new(1.4, 5.0, 8.0));

    let store = InMemoryRatingStore::epl_seeded();
    let pool = annotate_pool(&lines, &store, &EloConfig::default(), &ValueConfig::default());
    assert_eq!(pool.len(), 3);
    assert_eq!(pool[2].home_rating, 1920.0);
    assert_eq!(pool[2].away_rating, 1600.0);
}

#[test]
fn normalize_leaves_canonical_names_alone() {
    assert_eq!(normalize_team_name(" Spurs "), "Tottenham Hotspur");
    assert_eq!(normalize_team_name("Brighton"), "Brighton & Hove Albion");
    assert_eq!(normalize_team_name("Crystal Palace"), "Crystal Palace");
}

#[test]
fn empty_and_malformed_bodies() {
    assert!(parse_odds_events_json("[]").expect("empty list").is_empty());
    assert!(parse_odds_events_json("{\"message\":\"quota\"}").is_err());
}

#[test]
fn refresh_overwrites_same_bookmaker_line() {
    let raw = read_fixture("theoddsapi_epl.json");
    let mut board = parse_odds_events_json(&raw).expect("fixture should parse");

    let mut moved: MatchOdds = board[0].clone();
    moved.odds = HdaOdds::new(1.3, 6.0, 10.0);
    let mut extra = board[2].clone();
    extra.bookmaker = "Bet365".to_string();

    merge_refresh(&mut board, vec![moved, extra]);

    assert_eq!(board.len(), 4);
    assert_eq!(board[0].bookmaker, "William Hill");
    assert_eq!(board[0].odds, HdaOdds::new(1.3, 6.0, 10.0));
    assert_eq!(board[3].bookmaker, "Bet365");
}
