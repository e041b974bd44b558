//! Trending score engine.
//!
//! Scores one company at a time against the full population, then ranks,
//! filters and aggregates scored batches. Everything here is pure: no I/O,
//! no shared state, and the clock is passed in through [`ScoringContext`].
//!
//! ## Weights
//!
//! | factor            | weight |
//! |-------------------|--------|
//! | funding momentum  | 0.25   |
//! | growth rate       | 0.20   |
//! | market interest   | 0.20   |
//! | investor activity | 0.20   |
//! | time relevance    | 0.15   |

pub mod factors;
pub mod ranking;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CompanyRecord, CompanyTrending, InvestorContext, TrendingFactors};

pub use self::factors::{
    calculate_funding_momentum, calculate_growth_score, calculate_investor_activity,
    calculate_market_interest, calculate_time_relevance, calculate_trend_direction,
};
pub use self::ranking::{
    get_top_trending, get_trending_by_category, get_trending_sectors, rank_trending_companies,
};

const W_FUNDING_MOMENTUM: f64 = 0.25;
const W_GROWTH_RATE: f64 = 0.20;
const W_MARKET_INTEREST: f64 = 0.20;
const W_INVESTOR_ACTIVITY: f64 = 0.20;
const W_TIME_RELEVANCE: f64 = 0.15;

/// Ratio applied to the current score when no history exists and the
/// fallback is [`HistoryFallback::Simulate`].
pub const SIMULATED_PREVIOUS_RATIO: f64 = 0.85;

/// What to compare against when a company has no recorded previous score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFallback {
    /// Pretend the previous score was 85% of the current one (demo mode).
    #[default]
    Simulate,
    /// Treat the previous score as 0, which always reads as stable.
    None,
}

/// Population and clock shared by every company scored in one batch.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub population: &'a [CompanyRecord],
    pub now: DateTime<Utc>,
    pub fallback: HistoryFallback,
}

impl<'a> ScoringContext<'a> {
    pub fn new(population: &'a [CompanyRecord]) -> Self {
        Self {
            population,
            now: Utc::now(),
            fallback: HistoryFallback::default(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_fallback(mut self, fallback: HistoryFallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Score a single company. `funding_data` absent means zero investor
/// activity; `previous_score` absent defers to the context's fallback.
/// The result is unranked (`rank == 0`).
pub fn calculate_trending_factors(
    company: &CompanyRecord,
    ctx: &ScoringContext<'_>,
    funding_data: Option<&InvestorContext>,
    previous_score: Option<f64>,
) -> CompanyTrending {
    let funding_momentum = calculate_funding_momentum(
        company.total_funding,
        company.last_funding_date,
        company.funding_rounds_count,
        ctx.now,
    );
    let growth_rate = calculate_growth_score(company.growth_rate);
    let market_interest = calculate_market_interest(&company.category, ctx.population);
    let investor_activity = funding_data
        .map(|f| calculate_investor_activity(&f.investors, f.lead_investor.as_deref()))
        .unwrap_or(0.0);
    let time_relevance =
        calculate_time_relevance(company.founded_year, company.last_funding_date, ctx.now);

    let weighted = funding_momentum * W_FUNDING_MOMENTUM
        + growth_rate * W_GROWTH_RATE
        + market_interest * W_MARKET_INTEREST
        + investor_activity * W_INVESTOR_ACTIVITY
        + time_relevance * W_TIME_RELEVANCE;
    let overall_trending = factors::clamp_score(weighted).round() as u8;

    let previous = previous_score.unwrap_or_else(|| match ctx.fallback {
        HistoryFallback::Simulate => overall_trending as f64 * SIMULATED_PREVIOUS_RATIO,
        HistoryFallback::None => 0.0,
    });
    let trend = calculate_trend_direction(overall_trending as f64, previous);

    CompanyTrending {
        id: company.id.clone(),
        name: company.name.clone(),
        category: company.category.clone(),
        trending_score: overall_trending,
        trending_factors: TrendingFactors {
            funding_momentum,
            growth_rate,
            market_interest,
            investor_activity,
            time_relevance,
            overall_trending,
        },
        trend_direction: trend.direction,
        percentage_change: trend.percentage_change,
        rank: 0,
        last_updated: ctx.now,
    }
}
