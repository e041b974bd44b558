use crate::models::{CompanyRecord, InvestorContext, RawCompanyRow, RawInvestorRow};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::warn;

// ── Parsers ───────────────────────────────────────────────────────────────────

fn is_blank(s: &str) -> bool {
    matches!(s, "" | "N/A" | "n/a" | "-" | "—" | "null")
}

/// Parse a funding amount with optional currency sign, separators and K/M/B suffix.
/// "$1.2M" → 1,200,000 | "345K" → 345,000 | "2,500,000" → 2,500,000
pub fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim().to_uppercase().replace([',', '$', ' '], "");
    if is_blank(&s) {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('B') {
        (n, 1_000_000_000.0)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1_000_000.0)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1_000.0)
    } else {
        (s.as_str(), 1.0)
    };

    let num: f64 = num_str.parse().ok()?;
    num.is_finite().then_some(num * multiplier)
}

/// "120%" → 120.0 | "-4.5" → -4.5
pub fn parse_pct(s: &str) -> Option<f64> {
    let s = s.trim().replace(['%', ','], "");
    if is_blank(&s) {
        return None;
    }
    s.parse().ok().filter(|v: &f64| v.is_finite())
}

pub fn parse_count(s: &str) -> Option<u32> {
    let s = s.trim();
    if is_blank(s) {
        return None;
    }
    s.parse().ok()
}

/// Parse RFC 3339 timestamps or plain dates ("2024-02-20", "Feb 20, 2024", ...).
/// Plain dates are taken as midnight UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if is_blank(s) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d", "%b %d, %Y", "%d/%m/%Y", "%d %b %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !is_blank(s)).map(str::to_string)
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "y" | "1" | "lead")
}

// ── Company CSV → CompanyRecord ───────────────────────────────────────────────

pub fn csv_row_to_company(row: &RawCompanyRow) -> Option<CompanyRecord> {
    let id = non_empty(row.id.as_deref())?;
    let category = non_empty(row.category.as_deref())?;

    let founded_year = match row.founded_year.as_deref().map(str::trim).map(str::parse::<i32>) {
        Some(Ok(y)) => y,
        _ => {
            warn!("{}: missing or invalid founded_year, skipping", id);
            return None;
        }
    };

    let total_funding = row.total_funding.as_deref().and_then(parse_amount).unwrap_or(0.0);
    let rounds = row.funding_rounds_count.as_deref().and_then(parse_count).unwrap_or(0);
    let last_funding_date = row.last_funding_date.as_deref().and_then(parse_date);
    let growth_rate = row.growth_rate.as_deref().and_then(parse_pct);
    let name = non_empty(row.name.as_deref()).unwrap_or_else(|| id.clone());

    let built = CompanyRecord::new(&id, name, category, founded_year)
        .and_then(|c| c.with_funding(total_funding, rounds, last_funding_date))
        .and_then(|c| c.with_growth_rate(growth_rate))
        .map(|c| c.with_stage(non_empty(row.current_stage.as_deref())));

    match built {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("{}: {}", id, e);
            None
        }
    }
}

// ── Investor CSV → InvestorContext ────────────────────────────────────────────

/// Fold investor rows into per-company contexts, keeping row order.
/// The first row flagged as lead wins.
pub fn group_investor_rows(rows: &[RawInvestorRow]) -> HashMap<String, InvestorContext> {
    let mut grouped: HashMap<String, InvestorContext> = HashMap::new();

    for row in rows {
        let (Some(company_id), Some(investor)) =
            (non_empty(row.company_id.as_deref()), non_empty(row.investor.as_deref()))
        else {
            continue;
        };

        let ctx = grouped.entry(company_id).or_default();
        if ctx.lead_investor.is_none() && row.is_lead.as_deref().is_some_and(parse_flag) {
            ctx.lead_investor = Some(investor.clone());
        }
        ctx.investors.push(investor);
    }

    grouped
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, funding: &str, year: &str) -> RawCompanyRow {
        RawCompanyRow {
            id: Some(id.into()),
            name: Some("Acme Sec".into()),
            category: Some("Identity".into()),
            total_funding: Some(funding.into()),
            last_funding_date: Some("2024-02-20".into()),
            funding_rounds_count: Some("3".into()),
            founded_year: Some(year.into()),
            growth_rate: Some("120%".into()),
            current_stage: Some("Series-B".into()),
        }
    }

    fn investor_row(company: &str, investor: Option<&str>, lead: Option<&str>) -> RawInvestorRow {
        RawInvestorRow {
            company_id: Some(company.into()),
            investor: investor.map(Into::into),
            is_lead: lead.map(Into::into),
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1.2M"), Some(1_200_000.0));
        assert_eq!(parse_amount("345K"), Some(345_000.0));
        assert_eq!(parse_amount("1.5B"), Some(1_500_000_000.0));
        assert_eq!(parse_amount("2,500,000"), Some(2_500_000.0));
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("lots"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-02-20"), Some(expected));
        assert_eq!(parse_date("Feb 20, 2024"), Some(expected));
        assert_eq!(parse_date("2024-02-20T00:00:00Z"), Some(expected));
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_csv_row_to_company() {
        let c = csv_row_to_company(&row("c1", "$40M", "2019")).unwrap();
        assert_eq!(c.id, "c1");
        assert_eq!(c.total_funding, 40_000_000.0);
        assert_eq!(c.funding_rounds_count, 3);
        assert_eq!(c.growth_rate, Some(120.0));
        assert_eq!(c.current_stage.as_deref(), Some("series-b"));
    }

    #[test]
    fn test_csv_row_rejects_negative_funding() {
        assert!(csv_row_to_company(&row("c1", "-5", "2019")).is_none());
    }

    #[test]
    fn test_csv_row_requires_year() {
        assert!(csv_row_to_company(&row("c1", "5", "")).is_none());
    }

    #[test]
    fn test_group_investor_rows() {
        let rows = vec![
            investor_row("c1", Some("Accel"), Some("no")),
            investor_row("c1", Some("Sequoia"), Some("yes")),
            investor_row("c1", Some("Accel"), None),
            investor_row("c2", None, None),
        ];
        let grouped = group_investor_rows(&rows);
        let c1 = &grouped["c1"];
        assert_eq!(c1.investors, vec!["Accel", "Sequoia", "Accel"]);
        assert_eq!(c1.lead_investor.as_deref(), Some("Sequoia"));
        assert!(!grouped.contains_key("c2"));
    }
}
