use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::elo::RatingChange;
use crate::market::Outcome;
use crate::ratings::{InMemoryRatingStore, RatingStore};

const CACHE_DIR: &str = "epl_valuebets";
const DB_FILE: &str = "ratings.sqlite";

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS team_ratings (
            team TEXT PRIMARY KEY,
            rating REAL NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rating_changes (
            change_id INTEGER PRIMARY KEY AUTOINCREMENT,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            result TEXT NOT NULL,
            home_before REAL NOT NULL,
            home_after REAL NOT NULL,
            away_before REAL NOT NULL,
            away_after REAL NOT NULL,
            recorded_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rating_changes_home ON rating_changes(home_team);
        CREATE INDEX IF NOT EXISTS idx_rating_changes_away ON rating_changes(away_team);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Load every stored rating. An empty table yields an empty store.
pub fn load_ratings(conn: &Connection, baseline: f64) -> Result<InMemoryRatingStore> {
    let mut stmt = conn
        .prepare("SELECT team, rating FROM team_ratings")
        .context("prepare ratings query")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
        .context("query ratings")?;

    let mut store = InMemoryRatingStore::new(baseline);
    for row in rows {
        let (team, rating) = row.context("read rating row")?;
        store.set(&team, rating);
    }
    Ok(store)
}

/// Upsert the whole store in one transaction.
pub fn save_ratings(conn: &mut Connection, store: &InMemoryRatingStore) -> Result<usize> {
    let tx = conn.transaction().context("begin ratings transaction")?;
    let written = upsert_ratings(&tx, store)?;
    tx.commit().context("commit ratings transaction")?;
    tracing::debug!(written, "ratings saved");
    Ok(written)
}

/// Write the updated ratings and the change that produced them together;
/// either both land or neither does.
pub fn store_result(
    conn: &mut Connection,
    store: &InMemoryRatingStore,
    change: &RatingChange,
) -> Result<usize> {
    let tx = conn.transaction().context("begin result transaction")?;
    let written = upsert_ratings(&tx, store)?;
    record_change(&tx, change)?;
    tx.commit().context("commit result transaction")?;
    tracing::debug!(
        written,
        home = %change.home_team,
        away = %change.away_team,
        "result stored"
    );
    Ok(written)
}

fn upsert_ratings(conn: &Connection, store: &InMemoryRatingStore) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn
        .prepare(
            "INSERT INTO team_ratings(team, rating, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(team) DO UPDATE
             SET rating = excluded.rating, updated_at = excluded.updated_at",
        )
        .context("prepare rating upsert")?;
    let mut written = 0usize;
    for (team, rating) in store.standings() {
        if !rating.is_finite() {
            return Err(anyhow!("refusing to store non-finite rating for {team}"));
        }
        stmt.execute(params![team, rating, now])
            .with_context(|| format!("upsert rating for {team}"))?;
        written += 1;
    }
    Ok(written)
}

pub fn record_change(conn: &Connection, change: &RatingChange) -> Result<()> {
    conn.execute(
        "INSERT INTO rating_changes(
             home_team, away_team, result,
             home_before, home_after, away_before, away_after, recorded_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            change.home_team,
            change.away_team,
            change.result.as_str(),
            change.home_before,
            change.home_after,
            change.away_before,
            change.away_after,
            Utc::now().to_rfc3339()
        ],
    )
    .context("insert rating change")?;
    Ok(())
}

/// Most recent changes first.
pub fn recent_changes(conn: &Connection, limit: usize) -> Result<Vec<RatingChange>> {
    let mut stmt = conn
        .prepare(
            "SELECT home_team, away_team, result, home_before, home_after, away_before, away_after
             FROM rating_changes ORDER BY change_id DESC LIMIT ?1",
        )
        .context("prepare rating changes query")?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
            ))
        })
        .context("query rating changes")?;

    let mut out = Vec::new();
    for row in rows {
        let (home_team, away_team, result, home_before, home_after, away_before, away_after) =
            row.context("read rating change row")?;
        let result: Outcome = result
            .parse()
            .with_context(|| format!("stored result {result:?} is not an outcome"))?;
        out.push(RatingChange {
            home_team,
            away_team,
            result,
            home_before,
            home_after,
            away_before,
            away_after,
        });
    }
    Ok(out)
}
