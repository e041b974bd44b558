//! Batch operations over scored companies. None of them mutate their input.

use std::collections::HashMap;

use crate::models::{CompanyTrending, SectorTrend};

/// Stable descending sort by score; equal scores keep input order.
fn sorted_by_score(list: &[CompanyTrending]) -> Vec<CompanyTrending> {
    let mut sorted = list.to_vec();
    sorted.sort_by(|a, b| b.trending_score.cmp(&a.trending_score));
    sorted
}

/// Sort descending and assign 1-based ranks.
pub fn rank_trending_companies(list: &[CompanyTrending]) -> Vec<CompanyTrending> {
    let mut ranked = sorted_by_score(list);
    for (i, company) in ranked.iter_mut().enumerate() {
        company.rank = i as u32 + 1;
    }
    ranked
}

/// Companies whose category contains `category`, ignoring case.
///
/// Deliberately looser than the exact match used for market interest:
/// "cloud" here finds both "Cloud Security" and "Multi-Cloud".
pub fn get_trending_by_category(
    list: &[CompanyTrending],
    category: &str,
    limit: usize,
) -> Vec<CompanyTrending> {
    let needle = category.to_lowercase();
    let matching: Vec<CompanyTrending> = list
        .iter()
        .filter(|c| c.category.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    let mut sorted = sorted_by_score(&matching);
    sorted.truncate(limit);
    sorted
}

pub fn get_top_trending(list: &[CompanyTrending], limit: usize) -> Vec<CompanyTrending> {
    let mut sorted = sorted_by_score(list);
    sorted.truncate(limit);
    sorted
}

/// Per-category mean score, count and leader, best sector first.
/// On a tied top score the first company seen keeps the lead.
pub fn get_trending_sectors(list: &[CompanyTrending]) -> Vec<SectorTrend> {
    struct Acc<'a> {
        sector: &'a str,
        total: u64,
        count: usize,
        top_score: u8,
        top_company: &'a str,
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Acc<'_>> = Vec::new();

    for company in list {
        let slot = *index.entry(company.category.as_str()).or_insert_with(|| {
            groups.push(Acc {
                sector: &company.category,
                total: 0,
                count: 0,
                top_score: company.trending_score,
                top_company: &company.name,
            });
            groups.len() - 1
        });

        let acc = &mut groups[slot];
        acc.total += company.trending_score as u64;
        acc.count += 1;
        if company.trending_score > acc.top_score {
            acc.top_score = company.trending_score;
            acc.top_company = &company.name;
        }
    }

    let mut sectors: Vec<SectorTrend> = groups
        .into_iter()
        .map(|g| SectorTrend {
            sector: g.sector.to_string(),
            average_trending_score: (g.total as f64 / g.count as f64).round() as u32,
            company_count: g.count,
            top_company: g.top_company.to_string(),
        })
        .collect();

    sectors.sort_by(|a, b| b.average_trending_score.cmp(&a.average_trending_score));
    sectors
}
