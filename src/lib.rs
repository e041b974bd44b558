//! Trending scores for venture-backed security startups.
//!
//! The [`trending`] module is the pure scoring engine; the other modules
//! load company data from CSV, keep it (and score history) in DuckDB, and
//! drive scoring runs.

pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod trending;
pub mod utils;

pub use error::TrendingError;
pub use models::{
    CompanyRecord, CompanyTrending, InvestorContext, SectorTrend, TrendChange, TrendDirection,
    TrendingFactors,
};
pub use trending::{
    calculate_funding_momentum, calculate_investor_activity, calculate_market_interest,
    calculate_time_relevance, calculate_trend_direction, calculate_trending_factors,
    get_top_trending, get_trending_by_category, get_trending_sectors, rank_trending_companies,
    HistoryFallback, ScoringContext,
};
