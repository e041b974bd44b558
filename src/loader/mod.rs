//! CSV loader for bulk-importing company and investor records.

pub mod cleaner;

use crate::models::{CompanyRecord, InvestorContext, RawCompanyRow, RawInvestorRow};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use self::cleaner::{csv_row_to_company, group_investor_rows};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvKind {
    Companies,
    Investors,
}

/// Classify a CSV by filename: stems starting with `investors_prefix` hold
/// investor rows, everything else holds company rows.
pub fn classify_csv(path: &Path, investors_prefix: &str) -> Option<CsvKind> {
    let stem = path.file_stem()?.to_str()?.trim().to_lowercase();
    if stem.is_empty() {
        return None;
    }
    if stem.starts_with(&investors_prefix.to_lowercase()) {
        Some(CsvKind::Investors)
    } else {
        Some(CsvKind::Companies)
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV {:?}", path))
}

/// Company CSV: id, name, category, total_funding, last_funding_date,
/// funding_rounds_count, founded_year, growth_rate, current_stage
pub fn load_companies_csv(path: &Path) -> Result<Vec<CompanyRecord>> {
    debug!("Loading companies from {:?}", path);
    let mut reader = reader(path)?;
    let mut companies = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };

        let field = |n: usize| record.get(n).map(|s| s.to_string());
        let raw = RawCompanyRow {
            id: field(0),
            name: field(1),
            category: field(2),
            total_funding: field(3),
            last_funding_date: field(4),
            funding_rounds_count: field(5),
            founded_year: field(6),
            growth_rate: field(7),
            current_stage: field(8),
        };

        match csv_row_to_company(&raw) {
            Some(company) => companies.push(company),
            None => debug!("Row {} in {:?} skipped", i + 1, path),
        }
    }

    info!("{:?}: {} companies loaded", path.file_name().unwrap_or_default(), companies.len());
    Ok(companies)
}

/// Investor CSV: company_id, investor, is_lead
pub fn load_investors_csv(path: &Path) -> Result<HashMap<String, InvestorContext>> {
    debug!("Loading investors from {:?}", path);
    let mut reader = reader(path)?;
    let mut rows = Vec::new();

    for (i, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(RawInvestorRow {
                company_id: record.get(0).map(|s| s.to_string()),
                investor: record.get(1).map(|s| s.to_string()),
                is_lead: record.get(2).map(|s| s.to_string()),
            }),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }

    let grouped = group_investor_rows(&rows);
    info!("{:?}: investors for {} companies", path.file_name().unwrap_or_default(), grouped.len());
    Ok(grouped)
}

/// Every `.csv` file directly under `dir`, sorted by name. Missing dir → empty.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read_dir {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
