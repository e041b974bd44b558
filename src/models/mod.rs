use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrendingError};

// ── Company ───────────────────────────────────────────────────────────────────

/// Snapshot of a company as supplied by the caller. Read-only to the scorer.
///
/// Only built through [`CompanyRecord::new`] and the `with_*` setters; there
/// is no `Deserialize` impl, so storage and CSV rows go through validation too.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub total_funding: f64,
    pub last_funding_date: Option<DateTime<Utc>>,
    pub funding_rounds_count: u32,
    pub founded_year: i32,
    pub growth_rate: Option<f64>, // percent, e.g. 120.0 == 120%
    pub current_stage: Option<String>, // "seed", "series-a", ...
}

impl CompanyRecord {
    /// Build a record with no funding history. Id and category are required.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        founded_year: i32,
    ) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(TrendingError::EmptyField("id"));
        }
        let category = category.into().trim().to_string();
        if category.is_empty() {
            return Err(TrendingError::EmptyField("category"));
        }

        Ok(Self {
            id,
            name: name.into().trim().to_string(),
            category,
            total_funding: 0.0,
            last_funding_date: None,
            funding_rounds_count: 0,
            founded_year,
            growth_rate: None,
            current_stage: None,
        })
    }

    pub fn with_funding(
        mut self,
        total_funding: f64,
        funding_rounds_count: u32,
        last_funding_date: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if !total_funding.is_finite() {
            return Err(TrendingError::NonFinite("total_funding"));
        }
        if total_funding < 0.0 {
            return Err(TrendingError::NegativeAmount {
                field: "total_funding",
                value: total_funding,
            });
        }
        self.total_funding = total_funding;
        self.funding_rounds_count = funding_rounds_count;
        self.last_funding_date = last_funding_date;
        Ok(self)
    }

    pub fn with_growth_rate(mut self, growth_rate: Option<f64>) -> Result<Self> {
        if growth_rate.is_some_and(|g| !g.is_finite()) {
            return Err(TrendingError::NonFinite("growth_rate"));
        }
        self.growth_rate = growth_rate;
        Ok(self)
    }

    pub fn with_stage(mut self, stage: Option<String>) -> Self {
        self.current_stage = stage
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        self
    }
}

// ── Investors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvestorContext {
    /// Ordered as reported; duplicates are kept.
    pub investors: Vec<String>,
    pub lead_investor: Option<String>,
}

// ── Scores ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendingFactors {
    pub funding_momentum: f64,
    pub growth_rate: f64,
    pub market_interest: f64,
    pub investor_activity: f64,
    pub time_relevance: f64,
    pub overall_trending: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Up => "▲",
            TrendDirection::Down => "▼",
            TrendDirection::Stable => "■",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendChange {
    pub direction: TrendDirection,
    pub percentage_change: f64,
}

/// Scored company. `rank` stays 0 until the batch is ranked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyTrending {
    pub id: String,
    pub name: String,
    pub category: String,
    pub trending_score: u8,
    pub trending_factors: TrendingFactors,
    pub trend_direction: TrendDirection,
    pub percentage_change: f64,
    pub rank: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectorTrend {
    pub sector: String,
    pub average_trending_score: u32,
    pub company_count: usize,
    pub top_company: String,
}

// ── Raw CSV rows ──────────────────────────────────────────────────────────────

/// Company CSV: id, name, category, total_funding, last_funding_date,
/// funding_rounds_count, founded_year, growth_rate, current_stage
#[derive(Debug, Clone, Default)]
pub struct RawCompanyRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub total_funding: Option<String>,
    pub last_funding_date: Option<String>,
    pub funding_rounds_count: Option<String>,
    pub founded_year: Option<String>,
    pub growth_rate: Option<String>,
    pub current_stage: Option<String>,
}

/// Investor CSV: company_id, investor, is_lead
#[derive(Debug, Clone, Default)]
pub struct RawInvestorRow {
    pub company_id: Option<String>,
    pub investor: Option<String>,
    pub is_lead: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_id() {
        let err = CompanyRecord::new("  ", "Acme", "AI", 2020).unwrap_err();
        assert_eq!(err, TrendingError::EmptyField("id"));
    }

    #[test]
    fn test_with_funding_rejects_negative() {
        let err = CompanyRecord::new("c1", "Acme", "AI", 2020)
            .unwrap()
            .with_funding(-5.0, 1, None)
            .unwrap_err();
        assert!(matches!(err, TrendingError::NegativeAmount { field: "total_funding", .. }));
    }

    #[test]
    fn test_with_growth_rate_rejects_nan() {
        let err = CompanyRecord::new("c1", "Acme", "AI", 2020)
            .unwrap()
            .with_growth_rate(Some(f64::NAN))
            .unwrap_err();
        assert_eq!(err, TrendingError::NonFinite("growth_rate"));
    }

    #[test]
    fn test_stage_normalised() {
        let rec = CompanyRecord::new("c1", "Acme", "AI", 2020)
            .unwrap()
            .with_stage(Some(" Series-A ".into()));
        assert_eq!(rec.current_stage.as_deref(), Some("series-a"));
    }

    #[test]
    fn test_direction_serialises_lowercase() {
        let json = serde_json::to_string(&TrendDirection::Up).unwrap();
        assert_eq!(json, "\"up\"");
    }
}
