use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::config::env_string;
use crate::http_client::http_client;
use crate::market::{HdaOdds, MatchOdds, Outcome};

const ODDS_API_BASE: &str = "https://api.the-odds-api.com/v4";

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub api_key: Option<String>,
    pub sport: String,
    pub regions: String,
}

impl Default for OddsFetchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sport: "soccer_epl".to_string(),
            regions: "uk".to_string(),
        }
    }
}

impl OddsFetchConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let lower = |key: &str| env_string(key).map(|v| v.to_ascii_lowercase());
        Self {
            api_key: env_string("ODDS_API_KEY"),
            sport: lower("ODDS_SPORT").unwrap_or(d.sport),
            regions: lower("ODDS_REGIONS").unwrap_or(d.regions),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    commence_time: Option<String>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    price: f64,
}

pub fn fetch_upcoming_odds(cfg: &OddsFetchConfig) -> Result<Vec<MatchOdds>> {
    let Some(api_key) = cfg.api_key.as_ref() else {
        return Err(anyhow::anyhow!("ODDS_API_KEY missing"));
    };

    let url = format!("{ODDS_API_BASE}/sports/{}/odds", cfg.sport);
    let client = http_client()?;
    let resp = client
        .get(&url)
        .query(&[
            ("apiKey", api_key.as_str()),
            ("regions", cfg.regions.as_str()),
            ("markets", "h2h"),
            ("oddsFormat", "decimal"),
            ("dateFormat", "iso"),
        ])
        .header(USER_AGENT, "epl-valuebets/0.1")
        .send()
        .context("odds request failed")?;
    let status = resp.status();
    if let Some(remaining) = resp
        .headers()
        .get("x-requests-remaining")
        .and_then(|v| v.to_str().ok())
    {
        tracing::debug!(remaining, "odds api quota");
    }
    let body = resp.text().context("failed reading odds body")?;
    anyhow::ensure!(
        status.is_success(),
        "odds api returned {status}: {}",
        excerpt(&body, 200)
    );

    let lines = parse_odds_events_json(&body)?;
    tracing::info!(sport = %cfg.sport, lines = lines.len(), "fetched odds");
    Ok(lines)
}

/// First `max` characters of `body` on one line, for error messages.
fn excerpt(body: &str, max: usize) -> String {
    let flat: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

/// Events without a kickoff time and bookmakers without a complete h2h
/// market are skipped.
pub fn parse_odds_events_json(raw: &str) -> Result<Vec<MatchOdds>> {
    let events: Vec<OddsEvent> = serde_json::from_str(raw).context("invalid odds json")?;
    let mut out = Vec::new();

    for event in &events {
        let Some(start_time) = event.commence_time.as_deref().and_then(parse_timestamp) else {
            tracing::debug!(
                home = %event.home_team,
                away = %event.away_team,
                "event without kickoff"
            );
            continue;
        };
        let home_team = normalize_team_name(&event.home_team);
        let away_team = normalize_team_name(&event.away_team);

        for bookmaker in &event.bookmakers {
            let Some(market) = bookmaker
                .markets
                .iter()
                .find(|m| m.key.eq_ignore_ascii_case("h2h"))
            else {
                continue;
            };
            let Some(odds) =
                extract_hda_prices(&market.outcomes, &event.home_team, &event.away_team)
            else {
                continue;
            };
            let name = bookmaker
                .title
                .clone()
                .or_else(|| bookmaker.key.clone())
                .unwrap_or_else(|| "unknown".to_string());
            out.push(MatchOdds {
                home_team: home_team.clone(),
                away_team: away_team.clone(),
                start_time,
                bookmaker: name,
                odds,
                result: None,
            });
        }
    }

    Ok(out)
}

pub fn normalize_team_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let canonical = match trimmed {
        "Newcastle" => "Newcastle United",
        "Man United" | "Man Utd" | "Manchester Utd" => "Manchester United",
        "Man City" => "Manchester City",
        "Tottenham" | "Spurs" => "Tottenham Hotspur",
        "Brighton" | "Brighton and Hove Albion" => "Brighton & Hove Albion",
        "West Ham" => "West Ham United",
        "Wolves" | "Wolverhampton" => "Wolverhampton Wanderers",
        "Nottingham" | "Nott'm Forest" => "Nottingham Forest",
        "AFC Bournemouth" => "Bournemouth",
        "Sheffield Utd" => "Sheffield United",
        "Luton" => "Luton Town",
        other => other,
    };
    canonical.to_string()
}

fn extract_hda_prices(
    outcomes: &[OddsOutcome],
    home_team: &str,
    away_team: &str,
) -> Option<HdaOdds> {
    let home_key = TeamKey::new(home_team);
    let away_key = TeamKey::new(away_team);

    let mut prices: [Option<f64>; 3] = [None; 3];
    for outcome in outcomes {
        let Some(slot) = classify_outcome(&outcome.name, &home_key, &away_key) else {
            tracing::debug!(name = %outcome.name, "unmatched h2h outcome");
            continue;
        };
        prices[slot as usize] = Some(outcome.price);
    }

    let [Some(home), Some(draw), Some(away)] = prices else {
        return None;
    };
    Some(HdaOdds::new(home, draw, away))
}

/// Exact club first; a shared distinctive word only when it picks one side.
fn classify_outcome(name: &str, home: &TeamKey, away: &TeamKey) -> Option<Outcome> {
    if is_draw_label(name) {
        return Some(Outcome::Draw);
    }
    let key = TeamKey::new(name);
    if key.same_name(home) {
        return Some(Outcome::Home);
    }
    if key.same_name(away) {
        return Some(Outcome::Away);
    }
    match (key.shares_word(home), key.shares_word(away)) {
        (true, false) => Some(Outcome::Home),
        (false, true) => Some(Outcome::Away),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
}

fn is_draw_label(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "draw" | "tie" | "x"
    )
}

struct TeamKey {
    canonical: String,
    words: Vec<String>,
}

impl TeamKey {
    fn new(raw: &str) -> Self {
        let canonical = normalize_team_name(raw);
        let words = canonical
            .split(|c: char| !c.is_ascii_alphanumeric())
            .map(|w| w.to_ascii_lowercase())
            .filter(|w| w.len() >= 4 && !is_filler_word(w))
            .collect();
        Self { canonical, words }
    }

    fn same_name(&self, other: &TeamKey) -> bool {
        self.canonical.eq_ignore_ascii_case(&other.canonical)
    }

    fn shares_word(&self, other: &TeamKey) -> bool {
        self.words.iter().any(|w| other.words.contains(w))
    }
}

// Suffixes shared by several clubs never identify one on their own.
fn is_filler_word(w: &str) -> bool {
    matches!(
        w,
        "united" | "city" | "town" | "athletic" | "albion" | "rovers" | "wanderers" | "hotspur"
            | "club"
    )
}
