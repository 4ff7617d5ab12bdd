use anyhow::{Context as _, Result, anyhow};
use rusqlite::{Connection, params};
use std::path::PathBuf;

use crate::models::{ApplicationOutcome, OutcomeStatus, WorkArrangement};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: PathBuf::from(":memory:") };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobpilot") {
            proj_dirs.data_dir().join("jobpilot.db")
        } else {
            PathBuf::from("jobpilot.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT,
                work_arrangement TEXT,
                status TEXT NOT NULL CHECK (status IN ('submitted', 'abandoned', 'failed', 'skipped')),
                score REAL,
                source_url TEXT,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            CREATE INDEX IF NOT EXISTS idx_applications_company ON applications(company);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'jobpilot init' first."));
        }
        Ok(())
    }

    /// Store a finalized outcome. One row per job id; a later outcome
    /// replaces an earlier one except that a submitted row is never
    /// downgraded.
    pub fn record_outcome(&self, outcome: &ApplicationOutcome) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO applications
                     (job_id, title, company, location, work_arrangement, status, score, source_url, applied_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(job_id) DO UPDATE SET
                     title = excluded.title,
                     company = excluded.company,
                     location = excluded.location,
                     work_arrangement = excluded.work_arrangement,
                     status = excluded.status,
                     score = excluded.score,
                     source_url = excluded.source_url,
                     applied_at = excluded.applied_at
                 WHERE applications.status != 'submitted'",
                params![
                    outcome.job_id,
                    outcome.title,
                    outcome.company,
                    outcome.location,
                    outcome.work_arrangement.as_str(),
                    outcome.status.as_str(),
                    outcome.score,
                    outcome.source_url,
                    outcome.applied_at,
                ],
            )
            .context("failed to record application outcome")?;
        Ok(())
    }

    /// Idempotency check: has this job already been submitted?
    pub fn has_applied(&self, job_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM applications WHERE job_id = ?1 AND status = 'submitted'",
            [job_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Submitted applications since local midnight; seeds the daily counter.
    /// `applied_at` rows carry local timestamps, so the day boundary must be
    /// computed in local time as well.
    pub fn applications_today(&self) -> Result<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM applications
             WHERE status = 'submitted'
               AND applied_at >= date('now', 'localtime', 'start of day')",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    pub fn list_outcomes(&self, status: Option<&str>, limit: usize) -> Result<Vec<ApplicationOutcome>> {
        let mut sql = String::from(
            "SELECT job_id, title, company, location, work_arrangement, status, score, source_url, applied_at
             FROM applications",
        );
        if status.is_some() {
            sql.push_str(" WHERE status = ?1");
        }
        sql.push_str(" ORDER BY applied_at DESC LIMIT ?");
        sql.push_str(if status.is_some() { "2" } else { "1" });

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(s) = status {
            stmt.query_map(params![s, limit as i64], Self::row_to_outcome)?
        } else {
            stmt.query_map(params![limit as i64], Self::row_to_outcome)?
        };

        rows.collect::<Result<Vec<_>, _>>()
            .context("failed to list application outcomes")
    }

    pub fn stats(&self) -> Result<Stats> {
        let total: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))?;

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM applications GROUP BY status ORDER BY COUNT(*) DESC")?;
        let by_status = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let average_score: Option<f64> = self.conn.query_row(
            "SELECT AVG(score) FROM applications WHERE status = 'submitted'",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT company, COUNT(*) FROM applications WHERE status = 'submitted'
             GROUP BY company ORDER BY COUNT(*) DESC LIMIT 5",
        )?;
        let top_companies = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Stats { total, by_status, average_score, top_companies })
    }

    fn row_to_outcome(row: &rusqlite::Row) -> rusqlite::Result<ApplicationOutcome> {
        let arrangement: Option<String> = row.get(4)?;
        let status: String = row.get(5)?;
        Ok(ApplicationOutcome {
            job_id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            work_arrangement: arrangement
                .as_deref()
                .map(WorkArrangement::from_text)
                .unwrap_or(WorkArrangement::Unknown),
            status: OutcomeStatus::parse(&status).unwrap_or(OutcomeStatus::Failed),
            score: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
            source_url: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            applied_at: row.get(8)?,
        })
    }
}

#[derive(Debug)]
pub struct Stats {
    pub total: i64,
    pub by_status: Vec<(String, i64)>,
    pub average_score: Option<f64>,
    pub top_companies: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(job_id: &str, status: OutcomeStatus) -> ApplicationOutcome {
        ApplicationOutcome {
            job_id: job_id.to_string(),
            title: "Backend Engineer".into(),
            company: "Initech".into(),
            location: "Remote".into(),
            work_arrangement: WorkArrangement::Remote,
            status,
            score: 0.82,
            source_url: format!("https://www.linkedin.com/jobs/view/{job_id}/"),
            applied_at: "2026-08-25 10:00:00".into(),
        }
    }

    #[test]
    fn test_record_and_check_applied() {
        let db = Database::open_in_memory().unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Submitted)).unwrap();

        assert!(db.has_applied("100").unwrap());
        assert!(!db.has_applied("200").unwrap());
    }

    #[test]
    fn test_skipped_does_not_count_as_applied() {
        let db = Database::open_in_memory().unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Skipped)).unwrap();
        assert!(!db.has_applied("100").unwrap());
    }

    #[test]
    fn test_submitted_never_downgraded() {
        let db = Database::open_in_memory().unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Submitted)).unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Failed)).unwrap();

        assert!(db.has_applied("100").unwrap());
        let rows = db.list_outcomes(Some("submitted"), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_id, "100");
    }

    #[test]
    fn test_non_submitted_row_upgrades() {
        let db = Database::open_in_memory().unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Abandoned)).unwrap();
        db.record_outcome(&outcome("100", OutcomeStatus::Submitted)).unwrap();

        assert!(db.has_applied("100").unwrap());
        // Still one row: upsert, not append.
        let rows = db.list_outcomes(None, 10).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_applications_today_uses_local_day_boundary() {
        // Rows are stamped in local time, so the first second of the local
        // day must count even when local midnight and UTC midnight differ.
        let db = Database::open_in_memory().unwrap();
        let today = chrono::Local::now().date_naive();

        let mut first = outcome("1", OutcomeStatus::Submitted);
        first.applied_at = format!("{today} 00:00:00");
        db.record_outcome(&first).unwrap();

        let mut yesterday = outcome("2", OutcomeStatus::Submitted);
        yesterday.applied_at =
            format!("{} 23:59:59", today.pred_opt().unwrap());
        db.record_outcome(&yesterday).unwrap();

        assert_eq!(db.applications_today().unwrap(), 1);
    }

    #[test]
    fn test_applications_today_ignores_old_rows() {
        let db = Database::open_in_memory().unwrap();
        let mut old = outcome("1", OutcomeStatus::Submitted);
        old.applied_at = "2020-01-01 09:00:00".into();
        db.record_outcome(&old).unwrap();

        let mut fresh = outcome("2", OutcomeStatus::Submitted);
        fresh.applied_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        db.record_outcome(&fresh).unwrap();

        let mut skipped = outcome("3", OutcomeStatus::Skipped);
        skipped.applied_at = fresh.applied_at.clone();
        db.record_outcome(&skipped).unwrap();

        assert_eq!(db.applications_today().unwrap(), 1);
    }

    #[test]
    fn test_stats() {
        let db = Database::open_in_memory().unwrap();
        db.record_outcome(&outcome("1", OutcomeStatus::Submitted)).unwrap();
        db.record_outcome(&outcome("2", OutcomeStatus::Submitted)).unwrap();
        db.record_outcome(&outcome("3", OutcomeStatus::Skipped)).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert!(stats.by_status.contains(&("submitted".to_string(), 2)));
        assert!((stats.average_score.unwrap() - 0.82).abs() < 1e-9);
        assert_eq!(stats.top_companies[0], ("Initech".to_string(), 2));
    }
}
