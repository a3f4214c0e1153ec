use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::assemble::Linkage;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS link_runs (
            id                  INTEGER PRIMARY KEY,
            started_at          TEXT NOT NULL,
            source_a            TEXT NOT NULL,
            source_b            TEXT NOT NULL,
            strategy            TEXT NOT NULL,
            policy              TEXT NOT NULL CHECK(policy IN ('exclusive','shared')),
            reference_threshold REAL NOT NULL,
            address_threshold   REAL NOT NULL,
            driving_count       INTEGER NOT NULL,
            candidate_count     INTEGER NOT NULL,
            matched             INTEGER NOT NULL,
            unmatched           INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS link_pairs (
            id                  INTEGER PRIMARY KEY,
            run_id              INTEGER NOT NULL REFERENCES link_runs(id),
            driving_name        TEXT NOT NULL,
            candidate_name      TEXT NOT NULL,
            driving_reference   TEXT,
            candidate_reference TEXT,
            matched_by          TEXT NOT NULL CHECK(matched_by IN ('phone','website','reference','address')),
            driving_json        TEXT NOT NULL,
            candidate_json      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pairs_run ON link_pairs(run_id);
        CREATE INDEX IF NOT EXISTS idx_pairs_matcher ON link_pairs(matched_by);

        CREATE TABLE IF NOT EXISTS link_unmatched (
            id           INTEGER PRIMARY KEY,
            run_id       INTEGER NOT NULL REFERENCES link_runs(id),
            name         TEXT NOT NULL,
            record_json  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_unmatched_run ON link_unmatched(run_id);
        ",
    )?;
    Ok(())
}

/// Run parameters stored next to the results.
pub struct RunMeta {
    pub started_at: String,
    pub source_a: String,
    pub source_b: String,
    pub strategy: String,
    pub policy: String,
    pub reference_threshold: f64,
    pub address_threshold: f64,
}

/// Store one finished run in a single transaction. Returns the run id.
pub fn save_run(conn: &Connection, meta: &RunMeta, linkage: &Linkage) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let stats = &linkage.stats;
    tx.execute(
        "INSERT INTO link_runs
         (started_at, source_a, source_b, strategy, policy, reference_threshold,
          address_threshold, driving_count, candidate_count, matched, unmatched)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            meta.started_at, meta.source_a, meta.source_b, meta.strategy, meta.policy,
            meta.reference_threshold, meta.address_threshold,
            stats.driving as i64, stats.candidates as i64, stats.matched as i64,
            stats.unmatched as i64,
        ],
    )?;
    let run_id = tx.last_insert_rowid();
    {
        let mut p_stmt = tx.prepare(
            "INSERT INTO link_pairs
             (run_id, driving_name, candidate_name, driving_reference, candidate_reference,
              matched_by, driving_json, candidate_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for p in &linkage.pairs {
            p_stmt.execute(rusqlite::params![
                run_id,
                p.driving.name,
                p.candidate.name,
                p.driving.reference,
                p.candidate.reference,
                p.matched_by.as_str(),
                serde_json::to_string(&p.driving)?,
                serde_json::to_string(&p.candidate)?,
            ])?;
        }

        let mut u_stmt = tx.prepare(
            "INSERT INTO link_unmatched (run_id, name, record_json) VALUES (?1, ?2, ?3)",
        )?;
        for r in &linkage.unmatched {
            u_stmt.execute(rusqlite::params![run_id, r.name, serde_json::to_string(r)?])?;
        }
    }
    tx.commit()?;
    Ok(run_id)
}

pub struct RunRow {
    pub id: i64,
    pub started_at: String,
    pub source_a: String,
    pub source_b: String,
    pub strategy: String,
    pub policy: String,
    pub driving_count: i64,
    pub candidate_count: i64,
    pub matched: i64,
    pub unmatched: i64,
    /// "phone:12, website:3" style summary.
    pub by_matcher: String,
}

/// Most recent runs first.
pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.started_at, r.source_a, r.source_b, r.strategy, r.policy,
                r.driving_count, r.candidate_count, r.matched, r.unmatched,
                COALESCE((SELECT GROUP_CONCAT(m.matched_by || ':' || m.n, ', ' ORDER BY m.matched_by)
                          FROM (SELECT matched_by, COUNT(*) AS n FROM link_pairs
                                WHERE run_id = r.id GROUP BY matched_by) m), '')
         FROM link_runs r
         ORDER BY r.id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                started_at: row.get(1)?,
                source_a: row.get(2)?,
                source_b: row.get(3)?,
                strategy: row.get(4)?,
                policy: row.get(5)?,
                driving_count: row.get(6)?,
                candidate_count: row.get(7)?,
                matched: row.get(8)?,
                unmatched: row.get(9)?,
                by_matcher: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
