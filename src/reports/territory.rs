//! Territory performance
//!
//! Per account manager ("territory") activity, conversion and revenue,
//! with a six month trailing breakdown and cross-territory benchmarks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::records::{Deal, Interaction, ManagerIndex, Organization};
use super::stats::{mean, percent_of, ratio, trailing_months, MonthRange};

/// Months in the trailing breakdown, current month included
pub const TRAILING_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryPerformanceReport {
    pub territories: Vec<TerritoryPerformance>,
    pub benchmarks: Benchmarks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryPerformance {
    pub account_manager: String,
    pub organizations: usize,
    pub interactions: usize,
    pub completed_interactions: usize,
    pub completion_rate: f64,
    pub deals: usize,
    pub won_deals: usize,
    pub win_rate: f64,
    pub revenue: f64,
    pub pipeline_value: f64,
    pub average_deal_size: f64,
    pub monthly: Vec<MonthlyPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPerformance {
    #[serde(flatten)]
    pub range: MonthRange,
    pub interactions: usize,
    pub deals: usize,
    pub revenue: f64,
}

/// Means across territories; all zero when there are none
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Benchmarks {
    pub territories: usize,
    pub average_interactions: f64,
    pub average_completion_rate: f64,
    pub average_win_rate: f64,
    pub average_revenue: f64,
    pub average_deal_size: f64,
}

impl Benchmarks {
    pub fn from_territories(territories: &[TerritoryPerformance]) -> Self {
        let avg = |f: fn(&TerritoryPerformance) -> f64| mean(territories.iter().map(f));
        Self {
            territories: territories.len(),
            average_interactions: avg(|t| t.interactions as f64),
            average_completion_rate: avg(|t| t.completion_rate),
            average_win_rate: avg(|t| t.win_rate),
            average_revenue: avg(|t| t.revenue),
            average_deal_size: avg(|t| t.average_deal_size),
        }
    }
}

/// Compute performance per account manager, optionally for one manager only.
///
/// Organizations without a manager belong to no territory.
pub fn compute_territory_performance(
    orgs: &[Organization],
    interactions: &[Interaction],
    deals: &[Deal],
    account_manager: Option<&str>,
    now: DateTime<Utc>,
) -> TerritoryPerformanceReport {
    let index = ManagerIndex::new(orgs);
    let wanted = account_manager.map(str::trim).filter(|m| !m.is_empty());

    let mut books: BTreeMap<&str, Book<'_>> = BTreeMap::new();
    for org in orgs {
        if let Some(manager) = org.manager() {
            if wanted.is_none_or(|w| w == manager) {
                books.entry(manager).or_default().organizations += 1;
            }
        }
    }
    for interaction in interactions {
        if let Some(book) = index
            .manager_of(interaction.organization_id.as_deref())
            .and_then(|m| books.get_mut(m))
        {
            book.interactions.push(interaction);
        }
    }
    for deal in deals {
        if let Some(book) = index
            .manager_of(deal.organization_id.as_deref())
            .and_then(|m| books.get_mut(m))
        {
            book.deals.push(deal);
        }
    }

    let months = trailing_months(now, TRAILING_MONTHS);
    let territories: Vec<TerritoryPerformance> = books
        .into_iter()
        .map(|(manager, book)| book.performance(manager, &months))
        .collect();
    let benchmarks = Benchmarks::from_territories(&territories);

    TerritoryPerformanceReport {
        territories,
        benchmarks,
    }
}

/// Records attributed to one manager
#[derive(Default)]
struct Book<'a> {
    organizations: usize,
    interactions: Vec<&'a Interaction>,
    deals: Vec<&'a Deal>,
}

impl Book<'_> {
    fn performance(&self, manager: &str, months: &[MonthRange]) -> TerritoryPerformance {
        let completed = self.interactions.iter().filter(|i| i.completed).count();
        let won: Vec<&&Deal> = self.deals.iter().filter(|d| d.is_won()).collect();
        let revenue: f64 = won.iter().map(|d| d.amount).sum();
        let pipeline_value: f64 = self
            .deals
            .iter()
            .filter(|d| d.is_active())
            .map(|d| d.amount)
            .sum();

        let monthly = months
            .iter()
            .map(|range| MonthlyPerformance {
                range: range.clone(),
                interactions: self
                    .interactions
                    .iter()
                    .filter(|i| range.contains(i.created_at))
                    .count(),
                deals: self
                    .deals
                    .iter()
                    .filter(|d| range.contains(d.created_at))
                    .count(),
                revenue: won
                    .iter()
                    .filter(|d| range.contains(d.created_at))
                    .map(|d| d.amount)
                    .sum(),
            })
            .collect();

        TerritoryPerformance {
            account_manager: manager.to_string(),
            organizations: self.organizations,
            interactions: self.interactions.len(),
            completed_interactions: completed,
            completion_rate: percent_of(completed, self.interactions.len()),
            deals: self.deals.len(),
            won_deals: won.len(),
            win_rate: percent_of(won.len(), self.deals.len()),
            revenue,
            pipeline_value,
            average_deal_size: ratio(revenue, won.len() as f64),
            monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::records::DealStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
    }

    fn on(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn org(id: &str, manager: Option<&str>) -> Organization {
        Organization {
            id: id.into(),
            name: id.into(),
            account_manager: manager.map(Into::into),
            state: None,
            city: None,
            zip_code: None,
            created_at: on(2025, 1, 1),
            updated_at: on(2025, 1, 1),
        }
    }

    fn deal(
        id: &str,
        org_id: &str,
        status: DealStatus,
        amount: f64,
        created: DateTime<Utc>,
    ) -> Deal {
        Deal {
            id: id.into(),
            organization_id: Some(org_id.into()),
            name: id.into(),
            status,
            stage: "negotiation".into(),
            amount,
            probability: 60.0,
            created_at: created,
            updated_at: created,
        }
    }

    fn interaction(id: &str, org_id: &str, completed: bool, created: DateTime<Utc>) -> Interaction {
        Interaction {
            id: id.into(),
            organization_id: Some(org_id.into()),
            contact_id: None,
            kind: "visit".into(),
            completed,
            follow_up_date: None,
            created_at: created,
        }
    }

    fn fixture() -> (Vec<Organization>, Vec<Interaction>, Vec<Deal>) {
        let orgs = vec![
            org("o1", Some("Dana")),
            org("o2", Some("Dana")),
            org("o3", Some("Eli")),
            org("o4", None),
        ];
        let interactions = vec![
            interaction("i1", "o1", true, on(2026, 3, 1)),
            interaction("i2", "o2", false, on(2026, 1, 20)),
            interaction("i3", "o3", true, on(2025, 12, 5)),
            interaction("i4", "o4", true, on(2026, 3, 2)),
        ];
        let deals = vec![
            deal("d1", "o1", DealStatus::Won, 1_000.0, on(2026, 3, 3)),
            deal("d2", "o2", DealStatus::Won, 3_000.0, on(2025, 10, 31)),
            deal("d3", "o2", DealStatus::Active, 500.0, on(2026, 2, 1)),
            deal("d4", "o3", DealStatus::Lost, 800.0, on(2026, 2, 28)),
            deal("d5", "o1", DealStatus::Won, 9_999.0, on(2025, 9, 30)),
        ];
        (orgs, interactions, deals)
    }

    #[test]
    fn test_per_manager_metrics() {
        let (orgs, interactions, deals) = fixture();
        let report = compute_territory_performance(&orgs, &interactions, &deals, None, now());

        assert_eq!(report.territories.len(), 2);
        let dana = &report.territories[0];
        assert_eq!(dana.account_manager, "Dana");
        assert_eq!(dana.organizations, 2);
        assert_eq!(dana.interactions, 2);
        assert_eq!(dana.completion_rate, 50.0);
        assert_eq!(dana.deals, 4);
        assert_eq!(dana.won_deals, 3);
        assert_eq!(dana.win_rate, 75.0);
        assert_eq!(dana.revenue, 13_999.0);
        assert_eq!(dana.pipeline_value, 500.0);

        let eli = &report.territories[1];
        assert_eq!(eli.win_rate, 0.0);
        assert_eq!(eli.average_deal_size, 0.0);
    }

    #[test]
    fn test_monthly_breakdown_covers_six_closed_months() {
        let (orgs, interactions, deals) = fixture();
        let report =
            compute_territory_performance(&orgs, &interactions, &deals, Some("Dana"), now());
        let dana = &report.territories[0];

        let labels: Vec<&str> = dana.monthly.iter().map(|m| m.range.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2025-10", "2025-11", "2025-12", "2026-01", "2026-02", "2026-03"]
        );

        let october = &dana.monthly[0];
        assert_eq!(october.deals, 1);
        assert_eq!(october.revenue, 3_000.0);

        let march = &dana.monthly[5];
        assert_eq!(march.interactions, 1);
        assert_eq!(march.revenue, 1_000.0);

        // September deal falls outside the breakdown
        let total: f64 = dana.monthly.iter().map(|m| m.revenue).sum();
        assert_eq!(total, 4_000.0);
    }

    #[test]
    fn test_manager_filter() {
        let (orgs, interactions, deals) = fixture();
        let report =
            compute_territory_performance(&orgs, &interactions, &deals, Some("Eli"), now());
        assert_eq!(report.territories.len(), 1);
        assert_eq!(report.territories[0].account_manager, "Eli");
        assert_eq!(report.benchmarks.territories, 1);

        let none =
            compute_territory_performance(&orgs, &interactions, &deals, Some("Nobody"), now());
        assert!(none.territories.is_empty());
    }

    #[test]
    fn test_benchmarks_are_means() {
        let (orgs, interactions, deals) = fixture();
        let report = compute_territory_performance(&orgs, &interactions, &deals, None, now());
        assert_eq!(report.benchmarks.average_interactions, 1.5);
        assert_eq!(report.benchmarks.average_win_rate, 37.5);
        assert_eq!(report.benchmarks.average_revenue, 13_999.0 / 2.0);
    }

    #[test]
    fn test_empty_benchmarks_are_zero() {
        let report = compute_territory_performance(&[], &[], &[], None, now());
        assert!(report.territories.is_empty());
        assert_eq!(report.benchmarks.territories, 0);
        assert_eq!(report.benchmarks.average_revenue, 0.0);
        assert_eq!(report.benchmarks.average_completion_rate, 0.0);
    }
}
