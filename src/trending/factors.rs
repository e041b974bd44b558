//! The five independent sub-scores. Each returns a value in [0, 100].

use chrono::{DateTime, Datelike, Utc};

use crate::models::{CompanyRecord, TrendChange, TrendDirection};

/// Investors whose presence earns the premium boost (case-insensitive substring).
pub const PREMIUM_INVESTORS: [&str; 5] = ["sequoia", "a16z", "accel", "benchmark", "founders fund"];

const PREMIUM_BOOST: f64 = 30.0;
const STABLE_THRESHOLD_PCT: f64 = 5.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// Clamp to [0, 100]; NaN collapses to 0.
pub(crate) fn clamp_score(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) }
}

/// Negative or non-finite amounts count as zero.
fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// Fractional days elapsed since `date`; future dates count as 0.
fn days_since(date: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - date).num_seconds() as f64 / 86_400.0).max(0.0)
}

// ── Funding momentum ──────────────────────────────────────────────────────────

/// Recency (50%), size (30%) and frequency (20%) of funding.
/// Recency reaches 0 at 300 days, size saturates at $200M, frequency at 4 rounds.
pub fn calculate_funding_momentum(
    total_funding: f64,
    last_funding_date: Option<DateTime<Utc>>,
    funding_rounds_count: u32,
    now: DateTime<Utc>,
) -> f64 {
    let total_funding = non_negative(total_funding);
    let Some(last) = last_funding_date else {
        return 0.0;
    };
    if total_funding == 0.0 {
        return 0.0;
    }

    let recency = (100.0 - days_since(last, now) / 3.0).max(0.0);
    let size = (total_funding / 100_000_000.0 * 50.0).min(100.0);
    let frequency = (funding_rounds_count as f64 * 25.0).min(100.0);

    clamp_score(recency * 0.5 + size * 0.3 + frequency * 0.2)
}

// ── Market interest ───────────────────────────────────────────────────────────

/// Share of the population in `category` (60%) and the category's cumulative
/// funding (40%). Category match is exact and case-sensitive, unlike
/// [`get_trending_by_category`](super::get_trending_by_category).
pub fn calculate_market_interest(category: &str, all_companies: &[CompanyRecord]) -> f64 {
    if all_companies.is_empty() {
        return 0.0;
    }

    let (count, funding) = all_companies
        .iter()
        .filter(|c| c.category == category)
        .fold((0usize, 0.0f64), |(n, sum), c| (n + 1, sum + non_negative(c.total_funding)));

    let popularity = (count as f64 / all_companies.len() as f64 * 200.0).min(100.0);
    let investment = (funding / 1_000_000_000.0 * 50.0).min(100.0);

    clamp_score(popularity * 0.6 + investment * 0.4)
}

// ── Investor activity ─────────────────────────────────────────────────────────

/// 20 points per listed investor plus a flat boost for a premium firm.
/// `_lead_investor` is accepted for API symmetry and does not affect the score.
pub fn calculate_investor_activity(investors: &[String], _lead_investor: Option<&str>) -> f64 {
    if investors.is_empty() {
        return 0.0;
    }

    let diversity = (investors.len() as f64 * 20.0).min(100.0);
    let premium = investors.iter().any(|name| {
        let name = name.to_lowercase();
        PREMIUM_INVESTORS.iter().any(|p| name.contains(p))
    });
    let boost = if premium { PREMIUM_BOOST } else { 0.0 };

    clamp_score(diversity + boost)
}

// ── Time relevance ────────────────────────────────────────────────────────────

/// Youth (60%, zero at 10 years old) and recent activity (40%, zero after 10 months).
pub fn calculate_time_relevance(
    founded_year: i32,
    last_funding_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> f64 {
    let age = (now.year() as i64 - founded_year as i64) as f64;
    let age_score = (100.0 - age * 10.0).max(0.0);

    let activity = last_funding_date
        .map(|d| (50.0 - days_since(d, now) / DAYS_PER_MONTH * 5.0).max(0.0))
        .unwrap_or(0.0);

    clamp_score(age_score * 0.6 + activity * 0.4)
}

// ── Growth ────────────────────────────────────────────────────────────────────

/// 200% growth or more saturates.
pub fn calculate_growth_score(growth_rate: Option<f64>) -> f64 {
    clamp_score(non_negative(growth_rate.unwrap_or(0.0)) / 2.0)
}

// ── Direction ─────────────────────────────────────────────────────────────────

/// Compare against a previous score. Changes under 5% are `Stable`;
/// a previous score of 0 always yields `Stable` with 0% change.
pub fn calculate_trend_direction(current_score: f64, previous_score: f64) -> TrendChange {
    let change = current_score - previous_score;
    let percentage_change = if previous_score > 0.0 {
        (change / previous_score).abs() * 100.0
    } else {
        0.0
    };

    let direction = if percentage_change < STABLE_THRESHOLD_PCT {
        TrendDirection::Stable
    } else if change > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    TrendChange { direction, percentage_change }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn company(category: &str, funding: f64) -> CompanyRecord {
        CompanyRecord::new(format!("{category}-{funding}"), "X", category, 2020)
            .unwrap()
            .with_funding(funding, 1, None)
            .unwrap()
    }

    #[test]
    fn test_momentum_zero_without_date() {
        assert_eq!(calculate_funding_momentum(50_000_000.0, None, 3, now()), 0.0);
    }

    #[test]
    fn test_momentum_zero_without_funding() {
        let date = Some(now() - Duration::days(5));
        assert_eq!(calculate_funding_momentum(0.0, date, 3, now()), 0.0);
        assert_eq!(calculate_funding_momentum(-10.0, date, 3, now()), 0.0);
    }

    #[test]
    fn test_momentum_saturated() {
        let score = calculate_funding_momentum(400_000_000.0, Some(now()), 6, now());
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_momentum_recency_decays_to_zero_at_300_days() {
        let date = Some(now() - Duration::days(300));
        // recency 0, size 50 * 0.3, frequency 25 * 0.2
        let score = calculate_funding_momentum(100_000_000.0, date, 1, now());
        assert!((score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_momentum_future_date_stays_in_range() {
        let date = Some(now() + Duration::days(90));
        let score = calculate_funding_momentum(500_000_000.0, date, 10, now());
        assert!(score <= 100.0);
    }

    #[test]
    fn test_market_interest_empty_population() {
        assert_eq!(calculate_market_interest("AI", &[]), 0.0);
    }

    #[test]
    fn test_market_interest_exact_match() {
        let all = vec![
            company("AI", 1_000_000_000.0),
            company("ai", 1_000_000_000.0),
            company("Cloud", 0.0),
            company("Cloud", 0.0),
        ];
        // 1/4 * 200 = 50 popularity; $1B -> 50 investment
        let score = calculate_market_interest("AI", &all);
        assert!((score - (50.0 * 0.6 + 50.0 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_market_interest_unknown_category() {
        let all = vec![company("AI", 10.0)];
        assert_eq!(calculate_market_interest("Quantum", &all), 0.0);
    }

    #[test]
    fn test_investor_activity_empty() {
        assert_eq!(calculate_investor_activity(&[], None), 0.0);
    }

    #[test]
    fn test_investor_activity_premium() {
        let investors = vec!["Sequoia Capital".to_string()];
        assert_eq!(calculate_investor_activity(&investors, None), 50.0);
    }

    #[test]
    fn test_investor_activity_counts_duplicates_and_caps() {
        let investors = vec!["Local Angel".to_string(); 4];
        assert_eq!(calculate_investor_activity(&investors, None), 80.0);

        let mut more = vec!["Foo".to_string(); 5];
        more.push("ACCEL partners".to_string());
        assert_eq!(calculate_investor_activity(&more, Some("Foo")), 100.0);
    }

    #[test]
    fn test_time_relevance_old_and_idle() {
        assert_eq!(calculate_time_relevance(2010, None, now()), 0.0);
    }

    #[test]
    fn test_time_relevance_young_and_active() {
        let score = calculate_time_relevance(2025, Some(now()), now());
        assert!((score - (100.0 * 0.6 + 50.0 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_time_relevance_future_founding_clamped() {
        let score = calculate_time_relevance(2030, Some(now()), now());
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_time_relevance_extreme_founding_years() {
        assert_eq!(calculate_time_relevance(i32::MIN, None, now()), 0.0);
        assert_eq!(calculate_time_relevance(i32::MAX, None, now()), 100.0);
    }

    #[test]
    fn test_growth_score() {
        assert_eq!(calculate_growth_score(None), 0.0);
        assert_eq!(calculate_growth_score(Some(100.0)), 50.0);
        assert_eq!(calculate_growth_score(Some(450.0)), 100.0);
        assert_eq!(calculate_growth_score(Some(-20.0)), 0.0);
    }

    #[test]
    fn test_trend_direction_stable() {
        let t = calculate_trend_direction(100.0, 100.0);
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(t.percentage_change, 0.0);
    }

    #[test]
    fn test_trend_direction_up_and_down() {
        let up = calculate_trend_direction(110.0, 100.0);
        assert_eq!(up.direction, TrendDirection::Up);
        assert!((up.percentage_change - 10.0).abs() < 1e-9);

        let down = calculate_trend_direction(90.0, 100.0);
        assert_eq!(down.direction, TrendDirection::Down);
        assert!((down.percentage_change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_direction_without_history() {
        let t = calculate_trend_direction(42.0, 0.0);
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(t.percentage_change, 0.0);
    }

    #[test]
    fn test_trend_direction_below_threshold() {
        let t = calculate_trend_direction(104.0, 100.0);
        assert_eq!(t.direction, TrendDirection::Stable);
    }
}
