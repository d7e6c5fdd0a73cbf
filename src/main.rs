use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use epl_valuebets::config::EngineConfig;
use epl_valuebets::prediction::{MatchFactors, predict_match};
use epl_valuebets::ratings::InMemoryRatingStore;
use epl_valuebets::{
    CombinationRequest, MatchOdds, Outcome, RiskTolerance, ValuedMatch, annotate_pool, apply_result,
    fake_odds, logging, odds_fetch, rating_db, search, value_board,
};

#[derive(Debug, Parser)]
#[command(name = "epl_valuebets", version, about = "Premier League value bets from Elo ratings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price the current board and list value bets.
    Board {
        #[command(flatten)]
        source: SourceArgs,
        /// Show every line, not only those with value.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Search accumulators near a target price.
    Combos {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        target: f64,
        #[arg(long, default_value_t = 3)]
        max_matches: usize,
        #[arg(long, default_value = "moderate")]
        risk: RiskTolerance,
        /// Comma separated subset of home,draw,away. Empty means all.
        #[arg(long, value_delimiter = ',')]
        outcomes: Vec<Outcome>,
        #[arg(long)]
        json: bool,
    },
    /// Model view of a single fixture.
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long)]
        home_form: Option<f64>,
        #[arg(long)]
        away_form: Option<f64>,
        #[arg(long)]
        injuries: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Apply a finished result to the stored ratings.
    RecordResult {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long)]
        result: Outcome,
    },
    /// Print the current ratings table.
    Ratings {
        /// Write the seed ratings to the database first.
        #[arg(long)]
        seed: bool,
        /// Show the last N recorded results instead of the table.
        #[arg(long, value_name = "N")]
        history: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Read odds from a file: an Odds API response or a list of lines.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Generate a synthetic round with this many fixtures.
    #[arg(long, conflicts_with = "input")]
    fake: Option<usize>,
}

fn main() {
    dotenvy::dotenv().ok();
    logging::init();
    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = EngineConfig::from_env();
    match cli.command {
        Command::Board { source, all, json } => {
            let store = load_store(&cfg)?;
            let lines = load_lines(&source, &cfg)?;
            let pool = annotate_pool(&lines, &store, &cfg.elo, &cfg.value);
            let shown = value_board(&pool, all);
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_board(&shown);
            }
        }
        Command::Combos {
            source,
            target,
            max_matches,
            risk,
            outcomes,
            json,
        } => {
            let store = load_store(&cfg)?;
            let lines = load_lines(&source, &cfg)?;
            let pool = annotate_pool(&lines, &store, &cfg.elo, &cfg.value);
            let request = CombinationRequest::new(target, max_matches, risk, outcomes);
            let combos = search(&pool, &request, &cfg.search)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&combos)?);
            } else if combos.is_empty() {
                println!("No combinations within range of {target:.2}.");
            } else {
                for (rank, combo) in combos.iter().enumerate() {
                    println!(
                        "{:>2}. {:>6.2}  conf {:>5.1}%  {:<6}  {}",
                        rank + 1,
                        combo.combined_odds,
                        combo.combined_confidence * 100.0,
                        combo.risk_level,
                        combo.description
                    );
                    println!("    {}", combo.reasoning);
                }
            }
        }
        Command::Predict {
            home,
            away,
            home_form,
            away_form,
            injuries,
            json,
        } => {
            let store = load_store(&cfg)?;
            let factors = MatchFactors {
                home_form,
                away_form,
                injuries,
            };
            let has_factors = home_form.is_some() || away_form.is_some() || injuries.is_some();
            let prediction = predict_match(
                &home,
                &away,
                &store,
                &cfg.elo,
                has_factors.then_some(&factors),
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                let p = &prediction.probabilities;
                println!(
                    "{} ({:.0}) vs {} ({:.0})",
                    home, prediction.home_rating, away, prediction.away_rating
                );
                println!("Home: {:.1}%", p.home * 100.0);
                println!("Draw: {:.1}%", p.draw * 100.0);
                println!("Away: {:.1}%", p.away * 100.0);
                println!(
                    "Pick: {}  confidence {:.1}%  risk {}",
                    prediction.predicted_outcome,
                    prediction.confidence * 100.0,
                    prediction.risk_level
                );
                println!("{}", prediction.reasoning);
            }
        }
        Command::RecordResult { home, away, result } => {
            let path = db_path(&cfg)?;
            let mut conn = rating_db::open_db(&path)?;
            let mut store = load_store(&cfg)?;
            let change = apply_result(&mut store, &home, &away, result, &cfg.elo)?;
            rating_db::store_result(&mut conn, &store, &change)?;
            println!(
                "{home}: {:.1} -> {:.1} ({:+.1})",
                change.home_before,
                change.home_after,
                change.home_delta()
            );
            println!(
                "{away}: {:.1} -> {:.1} ({:+.1})",
                change.away_before,
                change.away_after,
                change.away_delta()
            );
        }
        Command::Ratings { seed, history } => {
            if seed {
                let path = db_path(&cfg)?;
                let mut conn = rating_db::open_db(&path)?;
                let seeded = InMemoryRatingStore::epl_seeded();
                let written = rating_db::save_ratings(&mut conn, &seeded)?;
                tracing::info!(written, db = %path.display(), "seed ratings stored");
            }
            if let Some(limit) = history {
                let path = db_path(&cfg)?;
                let conn = rating_db::open_db(&path)?;
                for change in rating_db::recent_changes(&conn, limit)? {
                    println!(
                        "{} vs {} ({}): {:+.1} / {:+.1}",
                        change.home_team,
                        change.away_team,
                        change.result,
                        change.home_delta(),
                        change.away_delta()
                    );
                }
                return Ok(());
            }
            let store = load_store(&cfg)?;
            for (rank, (team, rating)) in store.standings().iter().enumerate() {
                println!("{:>2}. {:<26} {:>7.1}", rank + 1, team, rating);
            }
        }
    }
    Ok(())
}

fn db_path(cfg: &EngineConfig) -> Result<PathBuf> {
    cfg.ratings_db
        .clone()
        .context("no ratings database path; set RATINGS_DB")
}

fn load_store(cfg: &EngineConfig) -> Result<InMemoryRatingStore> {
    if let Some(path) = cfg.ratings_db.as_deref() {
        if path.exists() {
            let conn = rating_db::open_db(path)?;
            let store = rating_db::load_ratings(&conn, cfg.elo.initial_rating)?;
            if !store.is_empty() {
                tracing::debug!(teams = store.len(), db = %path.display(), "ratings loaded");
                return Ok(store);
            }
        }
    }
    let seeded = InMemoryRatingStore::epl_seeded();
    Ok(InMemoryRatingStore::with_ratings(
        cfg.elo.initial_rating,
        seeded.standings(),
    ))
}

fn load_lines(source: &SourceArgs, cfg: &EngineConfig) -> Result<Vec<MatchOdds>> {
    if let Some(path) = source.input.as_deref() {
        return read_lines_file(path);
    }
    if let Some(count) = source.fake {
        let mut rng = rand::thread_rng();
        return Ok(fake_odds::fake_fixtures(&mut rng, count, Utc::now()));
    }
    if !cfg.odds.is_configured() {
        anyhow::bail!("no odds source: set ODDS_API_KEY, or pass --input or --fake");
    }
    odds_fetch::fetch_upcoming_odds(&cfg.odds)
}

fn read_lines_file(path: &Path) -> Result<Vec<MatchOdds>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if let Ok(lines) = serde_json::from_str::<Vec<MatchOdds>>(&raw) {
        return Ok(lines);
    }
    odds_fetch::parse_odds_events_json(&raw)
}

fn print_board(rows: &[&ValuedMatch]) {
    if rows.is_empty() {
        println!("No value bets on the board.");
        return;
    }
    println!(
        "{:<16} {:<48} {:<14} {:>16} {:>7} {:>20}",
        "Kickoff", "Fixture", "Bookmaker", "Odds H/D/A", "Margin", "Value% H/D/A"
    );
    for vm in rows {
        let m = &vm.fixture;
        let v = &vm.value;
        let mark = |o: Outcome| if v.get(o).is_value { "*" } else { " " };
        let margin = m
            .odds
            .overround()
            .map(|o| format!("{:.1}%", (o - 1.0) * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<48} {:<14} {:>5.2}/{:>4.2}/{:>5.2} {:>7} {:>6.1}{}/{:>5.1}{}/{:>5.1}{}",
            m.start_time.format("%Y-%m-%d %H:%M"),
            m.label(),
            m.bookmaker,
            m.odds.home,
            m.odds.draw,
            m.odds.away,
            margin,
            v.home.value_pct,
            mark(Outcome::Home),
            v.draw.value_pct,
            mark(Outcome::Draw),
            v.away.value_pct,
            mark(Outcome::Away),
        );
    }
}
