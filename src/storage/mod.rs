use crate::error::TrendingError;
use crate::models::{CompanyRecord, CompanyTrending, InvestorContext};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use duckdb::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id                   VARCHAR PRIMARY KEY,
    name                 VARCHAR NOT NULL DEFAULT '',
    category             VARCHAR NOT NULL,
    total_funding        DOUBLE  NOT NULL DEFAULT 0,
    last_funding_date    TIMESTAMP,
    funding_rounds_count BIGINT  NOT NULL DEFAULT 0,
    founded_year         INTEGER NOT NULL,
    growth_rate          DOUBLE,
    current_stage        VARCHAR,
    loaded_at            TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS company_investors (
    company_id  VARCHAR NOT NULL,
    ordinal     INTEGER NOT NULL,
    investor    VARCHAR NOT NULL,
    is_lead     BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (company_id, ordinal)
);

CREATE SEQUENCE IF NOT EXISTS scoring_run_seq START 1;

CREATE TABLE IF NOT EXISTS scoring_runs (
    id                BIGINT PRIMARY KEY DEFAULT nextval('scoring_run_seq'),
    started_at        TIMESTAMP NOT NULL,
    finished_at       TIMESTAMP,
    status            VARCHAR NOT NULL DEFAULT 'running',
    companies_scored  BIGINT DEFAULT 0,
    error_msg         VARCHAR
);

-- One row per company per scoring run; the latest row is the "previous"
-- score for the next run.
CREATE TABLE IF NOT EXISTS trending_scores (
    company_id         VARCHAR   NOT NULL,
    computed_at        TIMESTAMP NOT NULL,
    run_id             BIGINT,
    trending_score     BIGINT    NOT NULL,
    funding_momentum   DOUBLE    NOT NULL,
    growth_rate        DOUBLE    NOT NULL,
    market_interest    DOUBLE    NOT NULL,
    investor_activity  DOUBLE    NOT NULL,
    time_relevance     DOUBLE    NOT NULL,
    trend_direction    VARCHAR   NOT NULL,
    percentage_change  DOUBLE    NOT NULL,
    rank_position      BIGINT    NOT NULL,
    PRIMARY KEY (company_id, computed_at)
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_companies_category ON companies (category);
CREATE INDEX IF NOT EXISTS idx_scores_computed    ON trending_scores (computed_at);
"#;

// ── Row mapping ───────────────────────────────────────────────────────────────

struct StoredCompany {
    id: String,
    name: String,
    category: String,
    total_funding: f64,
    last_funding_date: Option<NaiveDateTime>,
    funding_rounds_count: i64,
    founded_year: i32,
    growth_rate: Option<f64>,
    current_stage: Option<String>,
}

impl StoredCompany {
    fn into_record(self) -> std::result::Result<CompanyRecord, TrendingError> {
        let rounds = u32::try_from(self.funding_rounds_count.max(0)).unwrap_or(u32::MAX);
        Ok(CompanyRecord::new(self.id, self.name, self.category, self.founded_year)?
            .with_funding(
                self.total_funding,
                rounds,
                self.last_funding_date.map(|d| d.and_utc()),
            )?
            .with_growth_rate(self.growth_rate)?
            .with_stage(self.current_stage))
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DbStats {
    pub companies: i64,
    pub categories: i64,
    pub total_funding: f64,
    pub scores: i64,
    pub last_scored_at: Option<NaiveDateTime>,
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Companies ─────────────────────────────────────────────────────────────

    /// Upsert companies — idempotent, safe to re-run on the same CSV.
    /// The incoming row replaces every field, so a blank cell clears the stored value.
    pub fn upsert_companies(&self, companies: &[CompanyRecord]) -> Result<usize> {
        if companies.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().naive_utc();
        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO companies
                (id, name, category, total_funding, last_funding_date, funding_rounds_count,
                 founded_year, growth_rate, current_stage, loaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name                 = excluded.name,
                category             = excluded.category,
                total_funding        = excluded.total_funding,
                last_funding_date    = excluded.last_funding_date,
                funding_rounds_count = excluded.funding_rounds_count,
                founded_year         = excluded.founded_year,
                growth_rate          = excluded.growth_rate,
                current_stage        = excluded.current_stage,
                loaded_at            = excluded.loaded_at
        "#;

        for c in companies {
            tx.execute(sql, params![
                c.id, c.name, c.category,
                c.total_funding,
                c.last_funding_date.map(|d| d.naive_utc()),
                c.funding_rounds_count as i64,
                c.founded_year,
                c.growth_rate,
                c.current_stage,
                now,
            ]).with_context(|| format!("upsert company {}", c.id))?;
        }

        tx.commit()?;
        Ok(companies.len())
    }

    /// Stored companies, rebuilt through the validated constructors.
    /// Rows that fail validation are logged and skipped.
    pub fn list_companies(&self) -> Result<Vec<CompanyRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, name, category, total_funding, last_funding_date, funding_rounds_count,
                      founded_year, growth_rate, current_stage
               FROM companies ORDER BY id"#,
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(StoredCompany {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    category: r.get(2)?,
                    total_funding: r.get(3)?,
                    last_funding_date: r.get(4)?,
                    funding_rounds_count: r.get(5)?,
                    founded_year: r.get(6)?,
                    growth_rate: r.get(7)?,
                    current_stage: r.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut companies = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match row.into_record() {
                Ok(c) => companies.push(c),
                Err(e) => warn!("Stored company {} is invalid, skipping: {}", id, e),
            }
        }
        Ok(companies)
    }

    pub fn company_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM companies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn category_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(DISTINCT category) FROM companies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn total_funding(&self) -> Result<f64> {
        let mut s = self.conn.prepare("SELECT COALESCE(SUM(total_funding), 0) FROM companies")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    // ── Investors ─────────────────────────────────────────────────────────────

    /// Replace each listed company's investors wholesale, keeping order.
    pub fn replace_investors(
        &self,
        investors: &HashMap<String, InvestorContext>,
    ) -> Result<usize> {
        if investors.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut rows = 0usize;
        for (company_id, ctx) in investors {
            tx.execute(
                "DELETE FROM company_investors WHERE company_id = ?",
                params![company_id],
            )?;
            let mut lead_marked = false;
            for (pos, investor) in ctx.investors.iter().enumerate() {
                let is_lead =
                    !lead_marked && ctx.lead_investor.as_deref() == Some(investor.as_str());
                lead_marked |= is_lead;
                tx.execute(
                    r#"INSERT INTO company_investors (company_id, ordinal, investor, is_lead)
                       VALUES (?, ?, ?, ?)"#,
                    params![company_id, pos as i64, investor, is_lead],
                )
                .with_context(|| format!("insert investor {} for {}", investor, company_id))?;
                rows += 1;
            }
        }
        tx.commit()?;
        Ok(rows)
    }

    pub fn investors_by_company(&self) -> Result<HashMap<String, InvestorContext>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT company_id, investor, is_lead FROM company_investors
               ORDER BY company_id, ordinal"#,
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, bool>(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut grouped: HashMap<String, InvestorContext> = HashMap::new();
        for (company_id, investor, is_lead) in rows {
            let ctx = grouped.entry(company_id).or_default();
            if is_lead && ctx.lead_investor.is_none() {
                ctx.lead_investor = Some(investor.clone());
            }
            ctx.investors.push(investor);
        }
        Ok(grouped)
    }

    // ── Score history ─────────────────────────────────────────────────────────

    pub fn record_scores(&self, run_id: Option<i64>, scores: &[CompanyTrending]) -> Result<usize> {
        if scores.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO trending_scores
                (company_id, computed_at, run_id, trending_score, funding_momentum, growth_rate,
                 market_interest, investor_activity, time_relevance, trend_direction,
                 percentage_change, rank_position)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (company_id, computed_at) DO UPDATE SET
                run_id            = excluded.run_id,
                trending_score    = excluded.trending_score,
                trend_direction   = excluded.trend_direction,
                percentage_change = excluded.percentage_change,
                rank_position     = excluded.rank_position
        "#;

        for s in scores {
            let f = &s.trending_factors;
            tx.execute(sql, params![
                s.id, s.last_updated.naive_utc(), run_id,
                s.trending_score as i64,
                f.funding_momentum, f.growth_rate, f.market_interest,
                f.investor_activity, f.time_relevance,
                s.trend_direction.as_str(),
                s.percentage_change,
                s.rank as i64,
            ]).with_context(|| format!("insert score {}", s.id))?;
        }

        tx.commit()?;
        Ok(scores.len())
    }

    /// Most recent recorded score per company.
    pub fn latest_scores(&self) -> Result<HashMap<String, f64>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT company_id, arg_max(trending_score, computed_at)
               FROM trending_scores GROUP BY company_id"#,
        )?;
        let scores = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as f64)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(scores)
    }

    pub fn score_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM trending_scores")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn last_scored_at(&self) -> Result<Option<NaiveDateTime>> {
        let mut s = self.conn.prepare("SELECT MAX(computed_at) FROM trending_scores")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    /// Summary counters for the `stats` command. Any failing query fails the call.
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            companies: self.company_count()?,
            categories: self.category_count()?,
            total_funding: self.total_funding()?,
            scores: self.score_count()?,
            last_scored_at: self.last_scored_at().context("Failed to read last score time")?,
        })
    }

    // ── Scoring run log ───────────────────────────────────────────────────────

    pub fn begin_scoring_run(&self) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO scoring_runs (started_at, status) VALUES (?, 'running') RETURNING id",
            params![Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_scoring_run(
        &self,
        run_id: i64,
        scored: usize,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE scoring_runs SET
               finished_at = ?, status = ?, companies_scored = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                scored as i64, error, run_id,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TrendDirection, TrendingFactors};
    use chrono::{Duration, TimeZone};

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    fn company(id: &str) -> CompanyRecord {
        CompanyRecord::new(id, format!("{id} Corp"), "Identity", 2021)
            .unwrap()
            .with_funding(
                25_000_000.0,
                2,
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            )
            .unwrap()
    }

    fn scored(id: &str, score: u8, at: chrono::DateTime<Utc>) -> CompanyTrending {
        CompanyTrending {
            id: id.to_string(),
            name: id.to_string(),
            category: "Identity".into(),
            trending_score: score,
            trending_factors: TrendingFactors {
                funding_momentum: 1.0,
                growth_rate: 2.0,
                market_interest: 3.0,
                investor_activity: 4.0,
                time_relevance: 5.0,
                overall_trending: score,
            },
            trend_direction: TrendDirection::Stable,
            percentage_change: 0.0,
            rank: 1,
            last_updated: at,
        }
    }

    #[test]
    fn test_migrations_idempotent() {
        let repo = repo();
        repo.run_migrations().unwrap();
        assert_eq!(repo.company_count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_and_list_companies() {
        let repo = repo();
        repo.upsert_companies(&[company("b"), company("a")]).unwrap();
        repo.upsert_companies(&[company("a")]).unwrap();

        let listed = repo.list_companies().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], company("a"));
        assert_eq!(repo.category_count().unwrap(), 1);
        assert_eq!(repo.total_funding().unwrap(), 50_000_000.0);
    }

    #[test]
    fn test_reimport_clears_blank_fields() {
        let repo = repo();
        let first = company("a")
            .with_growth_rate(Some(80.0))
            .unwrap()
            .with_stage(Some("seed".into()));
        repo.upsert_companies(&[first]).unwrap();

        let cleared = CompanyRecord::new("a", "a Corp", "Identity", 2021)
            .unwrap()
            .with_funding(25_000_000.0, 2, None)
            .unwrap();
        repo.upsert_companies(&[cleared.clone()]).unwrap();

        let listed = repo.list_companies().unwrap();
        assert_eq!(listed, vec![cleared]);
        assert!(listed[0].last_funding_date.is_none());
        assert!(listed[0].growth_rate.is_none());
        assert!(listed[0].current_stage.is_none());
    }

    #[test]
    fn test_list_companies_skips_invalid_rows() {
        let repo = repo();
        repo.upsert_companies(&[company("a")]).unwrap();
        repo.conn
            .execute(
                r#"INSERT INTO companies
                       (id, name, category, total_funding, founded_year, loaded_at)
                   VALUES ('bad', 'Bad', 'Identity', -10.0, 2020, ?)"#,
                params![Utc::now().naive_utc()],
            )
            .unwrap();

        let listed = repo.list_companies().unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_investor_round_trip_keeps_order() {
        let repo = repo();
        let mut map = HashMap::new();
        map.insert(
            "a".to_string(),
            InvestorContext {
                investors: vec!["Accel".into(), "Sequoia".into(), "Accel".into()],
                lead_investor: Some("Sequoia".into()),
            },
        );
        assert_eq!(repo.replace_investors(&map).unwrap(), 3);
        assert_eq!(repo.investors_by_company().unwrap(), map);
    }

    #[test]
    fn test_latest_scores_picks_newest() {
        let repo = repo();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        repo.record_scores(None, &[scored("a", 40, t0)]).unwrap();
        repo.record_scores(None, &[scored("a", 65, t0 + Duration::days(1))]).unwrap();

        let latest = repo.latest_scores().unwrap();
        assert_eq!(latest.get("a"), Some(&65.0));
        assert_eq!(repo.score_count().unwrap(), 2);
    }

    #[test]
    fn test_stats_on_empty_db() {
        let stats = repo().stats().unwrap();
        assert_eq!((stats.companies, stats.scores), (0, 0));
        assert_eq!(stats.total_funding, 0.0);
        assert!(stats.last_scored_at.is_none());
    }

    #[test]
    fn test_stats_propagates_query_errors() {
        let repo = repo();
        repo.upsert_companies(&[company("a")]).unwrap();
        repo.conn.execute_batch("DROP TABLE trending_scores").unwrap();
        assert!(repo.stats().is_err());
    }

    #[test]
    fn test_scoring_run_log() {
        let repo = repo();
        let first = repo.begin_scoring_run().unwrap();
        let second = repo.begin_scoring_run().unwrap();
        assert!(second > first);
        repo.finish_scoring_run(first, 3, None).unwrap();
    }
}
