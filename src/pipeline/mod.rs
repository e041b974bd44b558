//! Pipeline orchestrator: ties loader → storage → trending engine together.
//!
//! ## Run modes
//!
//! `import()` — reads every CSV under a directory into the companies and
//!   investors tables. Idempotent (ON CONFLICT DO UPDATE).
//!
//! `evaluate()` — scores every stored company against the stored population,
//!   using each company's last recorded score as its previous score, and
//!   returns the ranked batch without writing anything.
//!
//! `run()` — `evaluate()` plus recording the batch in `trending_scores`, so
//!   the next run compares against real history instead of the fallback.

use crate::config::AppConfig;
use crate::loader::{
    classify_csv, discover_csv_files, load_companies_csv, load_investors_csv, CsvKind,
};
use crate::models::CompanyTrending;
use crate::storage::Repository;
use crate::trending::{calculate_trending_factors, rank_trending_companies, ScoringContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Pipeline {
    config: AppConfig,
    repo: Repository,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        let repo = Repository::open(&config.storage.db_path).context("Failed to open DuckDB")?;
        Self::with_repository(config, repo)
    }

    pub fn with_repository(config: AppConfig, repo: Repository) -> Result<Self> {
        if config.storage.run_migrations {
            repo.run_migrations()?;
        }
        Ok(Self { config, repo })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn import(&self, dir: &Path) -> Result<ImportStats> {
        let files = discover_csv_files(dir)?;
        info!("Found {} CSV files in {:?}", files.len(), dir);

        let mut stats = ImportStats::default();
        let prefix = &self.config.loader.investors_prefix;

        // Companies first so investor rows land next to known ids.
        let mut ordered: Vec<_> = files
            .iter()
            .filter_map(|p| classify_csv(p, prefix).map(|k| (k, p)))
            .collect();
        ordered.sort_by_key(|(k, _)| *k == CsvKind::Investors);

        for (kind, path) in ordered {
            let outcome = match kind {
                CsvKind::Companies => load_companies_csv(path)
                    .and_then(|c| self.repo.upsert_companies(&c))
                    .map(|n| stats.companies += n),
                CsvKind::Investors => load_investors_csv(path)
                    .and_then(|i| self.repo.replace_investors(&i))
                    .map(|n| stats.investor_rows += n),
            };
            if let Err(e) = outcome {
                warn!("Error loading {:?}: {:#}", path, e);
                stats.errors += 1;
            }
        }

        Ok(stats)
    }

    pub fn evaluate(&self) -> Result<Vec<CompanyTrending>> {
        self.evaluate_at(Utc::now())
    }

    pub fn evaluate_at(&self, now: DateTime<Utc>) -> Result<Vec<CompanyTrending>> {
        let companies = self.repo.list_companies()?;
        let investors = self.repo.investors_by_company()?;
        let history = self.repo.latest_scores()?;
        info!(
            "Scoring {} companies ({} with investors, {} with history)",
            companies.len(),
            investors.len(),
            history.len()
        );

        let ctx = ScoringContext::new(&companies)
            .at(now)
            .with_fallback(self.config.scoring.history_fallback);

        let scored: Vec<CompanyTrending> = companies
            .iter()
            .map(|c| {
                let t = calculate_trending_factors(
                    c,
                    &ctx,
                    investors.get(&c.id),
                    history.get(&c.id).copied(),
                );
                debug!("{}: {} ({})", c.id, t.trending_score, t.trend_direction.as_str());
                t
            })
            .collect();

        Ok(rank_trending_companies(&scored))
    }

    pub fn run(&self) -> Result<RunOutcome> {
        self.run_at(Utc::now())
    }

    pub fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let run_id = self.repo.begin_scoring_run()?;

        let result = self
            .evaluate_at(now)
            .and_then(|ranked| self.repo.record_scores(Some(run_id), &ranked).map(|_| ranked));

        match result {
            Ok(ranked) => {
                self.repo.finish_scoring_run(run_id, ranked.len(), None)?;
                info!("=== Run {}: {} companies scored ===", run_id, ranked.len());
                Ok(RunOutcome { run_id, ranked })
            }
            Err(e) => {
                let msg = format!("{:#}", e);
                self.repo.finish_scoring_run(run_id, 0, Some(&msg)).ok();
                Err(e)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub companies: usize,
    pub investor_rows: usize,
    pub errors: usize,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: i64,
    pub ranked: Vec<CompanyTrending>,
}
