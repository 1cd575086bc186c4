//! Executive dashboard
//!
//! One pass over the book of business for a reporting window: headline
//! sums and rates, trends against a comparison window, a per-manager
//! rollup, top performers, alerts and quick stats.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::records::{Contact, Deal, Interaction, ManagerIndex, Organization};
use super::stats::{
    older_than, percent_change, percent_of, ratio, ComparisonBasis, ReportWindow,
};
use crate::types::{ReportError, Result};

pub const TOP_TERRITORIES: usize = 5;
pub const TOP_ORGANIZATIONS: usize = 10;
/// Days without an update before a record counts as stale
pub const STALE_AFTER_DAYS: i64 = 30;
pub const LOW_WIN_RATE: f64 = 20.0;
pub const LOW_COMPLETION_RATE: f64 = 60.0;
pub const HOT_DEAL_PROBABILITY: f64 = 75.0;
pub const HOT_DEAL_AMOUNT: f64 = 25_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub period_days: u32,
    pub compare_with: ComparisonBasis,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            period_days: 30,
            compare_with: ComparisonBasis::PreviousPeriod,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub window: ReportWindow,
    pub comparison_window: ReportWindow,
    pub compare_with: ComparisonBasis,
    pub summary: DashboardSummary,
    pub trends: DashboardTrends,
    pub managers: Vec<ManagerRollup>,
    pub top_performers: TopPerformers,
    pub alerts: Vec<Alert>,
    pub quick_stats: QuickStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_revenue: f64,
    pub pipeline_value: f64,
    pub total_organizations: usize,
    pub total_contacts: usize,
    pub total_interactions: usize,
    pub completed_interactions: usize,
    pub total_deals: usize,
    pub won_deals: usize,
    pub active_deals: usize,
    pub interaction_completion_rate: f64,
    pub deal_win_rate: f64,
    pub average_deal_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTrends {
    pub interaction_growth: f64,
    /// Percentage points
    pub completion_rate_change: f64,
    pub revenue_growth: f64,
    pub deal_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerRollup {
    pub account_manager: String,
    pub organizations: usize,
    pub interactions: usize,
    pub deals: usize,
    pub revenue: f64,
    pub pipeline_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRevenue {
    pub id: String,
    pub name: String,
    pub account_manager: Option<String>,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformers {
    pub territories: Vec<ManagerRollup>,
    pub organizations: Vec<OrganizationRevenue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub stale_organizations: usize,
    pub overdue_follow_ups: usize,
    pub hot_deals: usize,
}

/// Headline numbers for one window
struct PeriodTotals {
    interactions: usize,
    completed: usize,
    deals: usize,
    won: usize,
    active: usize,
    revenue: f64,
    pipeline: f64,
}

impl PeriodTotals {
    fn collect(window: &ReportWindow, interactions: &[Interaction], deals: &[Deal]) -> Self {
        let interactions: Vec<&Interaction> = interactions
            .iter()
            .filter(|i| window.contains(i.created_at))
            .collect();
        let deals: Vec<&Deal> = deals.iter().filter(|d| window.contains(d.created_at)).collect();

        Self {
            interactions: interactions.len(),
            completed: interactions.iter().filter(|i| i.completed).count(),
            deals: deals.len(),
            won: deals.iter().filter(|d| d.is_won()).count(),
            active: deals.iter().filter(|d| d.is_active()).count(),
            revenue: deals.iter().filter(|d| d.is_won()).map(|d| d.amount).sum(),
            pipeline: deals.iter().filter(|d| d.is_active()).map(|d| d.amount).sum(),
        }
    }

    fn completion_rate(&self) -> f64 {
        percent_of(self.completed, self.interactions)
    }

    fn win_rate(&self) -> f64 {
        percent_of(self.won, self.deals)
    }
}

/// Compute the executive dashboard for the window of `options.period_days`
/// days ending at `now`.
///
/// Organization and contact counts cover the whole book; interaction and
/// deal figures cover records created inside the window. Fails with
/// `BadRequest` when the window or its comparison window reaches past the
/// representable date range.
pub fn compute_executive_dashboard(
    orgs: &[Organization],
    contacts: &[Contact],
    interactions: &[Interaction],
    deals: &[Deal],
    options: DashboardOptions,
    now: DateTime<Utc>,
) -> Result<DashboardMetrics> {
    let out_of_range = || {
        ReportError::BadRequest(format!(
            "period of {} days reaches past the supported date range",
            options.period_days
        ))
    };
    let window = ReportWindow::trailing_days(now, options.period_days).ok_or_else(out_of_range)?;
    let comparison_window = window
        .comparison(options.compare_with)
        .ok_or_else(out_of_range)?;

    let current = PeriodTotals::collect(&window, interactions, deals);
    let previous = PeriodTotals::collect(&comparison_window, interactions, deals);

    let summary = DashboardSummary {
        total_revenue: current.revenue,
        pipeline_value: current.pipeline,
        total_organizations: orgs.len(),
        total_contacts: contacts.len(),
        total_interactions: current.interactions,
        completed_interactions: current.completed,
        total_deals: current.deals,
        won_deals: current.won,
        active_deals: current.active,
        interaction_completion_rate: current.completion_rate(),
        deal_win_rate: current.win_rate(),
        average_deal_size: ratio(current.revenue, current.won as f64),
    };

    let trends = DashboardTrends {
        interaction_growth: percent_change(
            current.interactions as f64,
            previous.interactions as f64,
        ),
        completion_rate_change: if previous.interactions == 0 {
            0.0
        } else {
            current.completion_rate() - previous.completion_rate()
        },
        revenue_growth: percent_change(current.revenue, previous.revenue),
        deal_growth: percent_change(current.deals as f64, previous.deals as f64),
    };

    let window_interactions: Vec<Interaction> = interactions
        .iter()
        .filter(|i| window.contains(i.created_at))
        .cloned()
        .collect();
    let window_deals: Vec<Deal> = deals
        .iter()
        .filter(|d| window.contains(d.created_at))
        .cloned()
        .collect();

    let managers = manager_rollups(orgs, &window_interactions, &window_deals);
    let top_performers = TopPerformers {
        territories: top_territories(&managers, TOP_TERRITORIES),
        organizations: top_organizations(orgs, &window_deals, TOP_ORGANIZATIONS),
    };

    let stale_deals = deals
        .iter()
        .filter(|d| d.is_active() && older_than(d.updated_at, now, STALE_AFTER_DAYS))
        .count();
    let alerts = build_alerts(&summary, stale_deals);

    let quick_stats = QuickStats {
        stale_organizations: orgs
            .iter()
            .filter(|o| now - o.updated_at >= Duration::days(STALE_AFTER_DAYS))
            .count(),
        overdue_follow_ups: interactions
            .iter()
            .filter(|i| !i.completed && i.follow_up_date.is_some_and(|due| due < now))
            .count(),
        hot_deals: deals
            .iter()
            .filter(|d| {
                d.is_active() && d.probability > HOT_DEAL_PROBABILITY && d.amount > HOT_DEAL_AMOUNT
            })
            .count(),
    };

    Ok(DashboardMetrics {
        window,
        comparison_window,
        compare_with: options.compare_with,
        summary,
        trends,
        managers,
        top_performers,
        alerts,
        quick_stats,
    })
}

/// Group the book by account manager. Organizations without a manager are
/// left out; deals and interactions follow their organization's manager.
pub fn manager_rollups(
    orgs: &[Organization],
    interactions: &[Interaction],
    deals: &[Deal],
) -> Vec<ManagerRollup> {
    let index = ManagerIndex::new(orgs);
    let mut rollups: BTreeMap<&str, ManagerRollup> = BTreeMap::new();

    for org in orgs {
        if let Some(manager) = org.manager() {
            rollups
                .entry(manager)
                .or_insert_with(|| empty_rollup(manager))
                .organizations += 1;
        }
    }

    for interaction in interactions {
        if let Some(manager) = index.manager_of(interaction.organization_id.as_deref()) {
            if let Some(rollup) = rollups.get_mut(manager) {
                rollup.interactions += 1;
            }
        }
    }

    for deal in deals {
        if let Some(rollup) = index
            .manager_of(deal.organization_id.as_deref())
            .and_then(|manager| rollups.get_mut(manager))
        {
            rollup.deals += 1;
            if deal.is_won() {
                rollup.revenue += deal.amount;
            } else if deal.is_active() {
                rollup.pipeline_value += deal.amount;
            }
        }
    }

    rollups.into_values().collect()
}

fn empty_rollup(manager: &str) -> ManagerRollup {
    ManagerRollup {
        account_manager: manager.to_string(),
        organizations: 0,
        interactions: 0,
        deals: 0,
        revenue: 0.0,
        pipeline_value: 0.0,
    }
}

/// Revenue descending; equal revenue ordered by name
fn by_revenue_desc(a_revenue: f64, a_name: &str, b_revenue: f64, b_name: &str) -> Ordering {
    b_revenue
        .partial_cmp(&a_revenue)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_name.cmp(b_name))
}

pub fn top_territories(rollups: &[ManagerRollup], limit: usize) -> Vec<ManagerRollup> {
    let mut ranked = rollups.to_vec();
    ranked.sort_by(|a, b| {
        by_revenue_desc(a.revenue, &a.account_manager, b.revenue, &b.account_manager)
    });
    ranked.truncate(limit);
    ranked
}

pub fn top_organizations(
    orgs: &[Organization],
    deals: &[Deal],
    limit: usize,
) -> Vec<OrganizationRevenue> {
    let mut won_by_org: BTreeMap<&str, f64> = BTreeMap::new();
    for deal in deals.iter().filter(|d| d.is_won()) {
        if let Some(org_id) = deal.organization_id.as_deref() {
            *won_by_org.entry(org_id).or_default() += deal.amount;
        }
    }

    let mut ranked: Vec<OrganizationRevenue> = orgs
        .iter()
        .map(|org| OrganizationRevenue {
            id: org.id.clone(),
            name: org.name.clone(),
            account_manager: org.manager().map(str::to_string),
            revenue: won_by_org.get(org.id.as_str()).copied().unwrap_or(0.0),
        })
        .collect();

    ranked.sort_by(|a, b| {
        by_revenue_desc(a.revenue, &a.name, b.revenue, &b.name).then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(limit);
    ranked
}

fn build_alerts(summary: &DashboardSummary, stale_deals: usize) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if summary.deal_win_rate < LOW_WIN_RATE {
        alerts.push(Alert {
            kind: AlertKind::Warning,
            priority: AlertPriority::High,
            title: "Low win rate".to_string(),
            message: format!(
                "Deal win rate is {:.1}%, below the {LOW_WIN_RATE}% target",
                summary.deal_win_rate
            ),
        });
    }

    if summary.interaction_completion_rate < LOW_COMPLETION_RATE {
        alerts.push(Alert {
            kind: AlertKind::Warning,
            priority: AlertPriority::Medium,
            title: "Low interaction completion".to_string(),
            message: format!(
                "Only {:.1}% of interactions were completed",
                summary.interaction_completion_rate
            ),
        });
    }

    if stale_deals > 0 {
        alerts.push(Alert {
            kind: AlertKind::Info,
            priority: AlertPriority::Medium,
            title: "Stale deals".to_string(),
            message: format!(
                "{stale_deals} active deal(s) have not been updated in over {STALE_AFTER_DAYS} days"
            ),
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::records::DealStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 30, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn org(id: &str, manager: Option<&str>) -> Organization {
        Organization {
            id: id.into(),
            name: format!("Org {id}"),
            account_manager: manager.map(Into::into),
            state: Some("CA".into()),
            city: None,
            zip_code: None,
            created_at: days_ago(400),
            updated_at: days_ago(1),
        }
    }

    fn deal(id: &str, org_id: &str, status: DealStatus, amount: f64) -> Deal {
        Deal {
            id: id.into(),
            organization_id: Some(org_id.into()),
            name: id.into(),
            status,
            stage: "proposal".into(),
            amount,
            probability: 50.0,
            created_at: days_ago(5),
            updated_at: days_ago(2),
        }
    }

    fn interaction(id: &str, org_id: &str, completed: bool, age_days: i64) -> Interaction {
        Interaction {
            id: id.into(),
            organization_id: Some(org_id.into()),
            contact_id: None,
            kind: "call".into(),
            completed,
            follow_up_date: None,
            created_at: days_ago(age_days),
        }
    }

    fn dashboard(
        orgs: &[Organization],
        interactions: &[Interaction],
        deals: &[Deal],
    ) -> DashboardMetrics {
        compute_executive_dashboard(
            orgs,
            &[],
            interactions,
            deals,
            DashboardOptions::default(),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_input_has_no_division_by_zero() {
        let metrics = dashboard(&[], &[], &[]);
        assert_eq!(metrics.summary.deal_win_rate, 0.0);
        assert_eq!(metrics.summary.total_revenue, 0.0);
        assert_eq!(metrics.summary.interaction_completion_rate, 0.0);
        assert_eq!(metrics.summary.average_deal_size, 0.0);
        assert_eq!(metrics.trends.interaction_growth, 0.0);
        assert_eq!(metrics.trends.completion_rate_change, 0.0);
        assert!(metrics.managers.is_empty());
    }

    #[test]
    fn test_revenue_pipeline_and_win_rate() {
        let orgs = vec![org("o1", Some("Dana"))];
        let deals = vec![
            deal("d1", "o1", DealStatus::Won, 100.0),
            deal("d2", "o1", DealStatus::Won, 50.0),
            deal("d3", "o1", DealStatus::Active, 200.0),
            deal("d4", "o1", DealStatus::Lost, 10.0),
        ];
        let metrics = dashboard(&orgs, &[], &deals);

        assert_eq!(metrics.summary.total_revenue, 150.0);
        assert_eq!(metrics.summary.pipeline_value, 200.0);
        assert_eq!(metrics.summary.deal_win_rate, 50.0);
        assert_eq!(metrics.summary.average_deal_size, 75.0);
    }

    #[test]
    fn test_interaction_trends() {
        let orgs = vec![org("o1", Some("Dana"))];
        let interactions = vec![
            // current window: 3 interactions, 3 completed
            interaction("i1", "o1", true, 1),
            interaction("i2", "o1", true, 2),
            interaction("i3", "o1", true, 3),
            // previous window: 2 interactions, 1 completed
            interaction("i4", "o1", true, 40),
            interaction("i5", "o1", false, 45),
            // outside both windows
            interaction("i6", "o1", false, 90),
        ];
        let metrics = dashboard(&orgs, &interactions, &[]);

        assert_eq!(metrics.summary.total_interactions, 3);
        assert_eq!(metrics.summary.interaction_completion_rate, 100.0);
        assert_eq!(metrics.trends.interaction_growth, 50.0);
        assert_eq!(metrics.trends.completion_rate_change, 50.0);
    }

    #[test]
    fn test_manager_rollup_attributes_deals_through_organization() {
        let orgs = vec![
            org("o1", Some("Dana")),
            org("o2", Some("Eli")),
            org("o3", None),
            org("o4", Some("")),
        ];
        let deals = vec![
            deal("d1", "o1", DealStatus::Won, 100.0),
            deal("d2", "o1", DealStatus::Active, 40.0),
            deal("d3", "o2", DealStatus::Won, 300.0),
            deal("d4", "o3", DealStatus::Won, 999.0),
        ];
        let metrics = dashboard(&orgs, &[interaction("i1", "o2", true, 1)], &deals);

        assert_eq!(metrics.managers.len(), 2);
        let dana = &metrics.managers[0];
        assert_eq!(dana.account_manager, "Dana");
        assert_eq!(dana.organizations, 1);
        assert_eq!(dana.deals, 2);
        assert_eq!(dana.revenue, 100.0);
        assert_eq!(dana.pipeline_value, 40.0);

        let eli = &metrics.managers[1];
        assert_eq!(eli.interactions, 1);
        assert_eq!(eli.revenue, 300.0);

        let ranked: Vec<&str> = metrics
            .top_performers
            .territories
            .iter()
            .map(|t| t.account_manager.as_str())
            .collect();
        assert_eq!(ranked, vec!["Eli", "Dana"]);
    }

    #[test]
    fn test_top_organizations_ranked_with_name_tie_break() {
        let orgs: Vec<Organization> = (0..12).map(|i| org(&format!("o{i:02}"), None)).collect();
        let mut deals = vec![
            deal("d1", "o05", DealStatus::Won, 500.0),
            deal("d2", "o03", DealStatus::Won, 200.0),
            deal("d3", "o01", DealStatus::Won, 200.0),
        ];
        deals.push(deal("d4", "o05", DealStatus::Active, 10_000.0));
        let metrics = dashboard(&orgs, &[], &deals);

        let top = &metrics.top_performers.organizations;
        assert_eq!(top.len(), TOP_ORGANIZATIONS);
        assert_eq!(top[0].id, "o05");
        assert_eq!(top[0].revenue, 500.0);
        assert_eq!(top[1].id, "o01");
        assert_eq!(top[2].id, "o03");
        assert_eq!(top[3].revenue, 0.0);
    }

    #[test]
    fn test_alerts_are_additive() {
        let mut stale = deal("d1", "o1", DealStatus::Active, 10.0);
        stale.updated_at = days_ago(45);
        let deals = vec![stale, deal("d2", "o1", DealStatus::Lost, 5.0)];
        let interactions = vec![interaction("i1", "o1", false, 1)];
        let metrics = dashboard(&[org("o1", None)], &interactions, &deals);

        let kinds: Vec<(AlertKind, AlertPriority)> =
            metrics.alerts.iter().map(|a| (a.kind, a.priority)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertKind::Warning, AlertPriority::High),
                (AlertKind::Warning, AlertPriority::Medium),
                (AlertKind::Info, AlertPriority::Medium),
            ]
        );
        assert!(metrics.alerts[2].message.starts_with("1 active deal"));
    }

    #[test]
    fn test_healthy_book_raises_no_alerts() {
        let deals = vec![deal("d1", "o1", DealStatus::Won, 10.0)];
        let interactions = vec![interaction("i1", "o1", true, 1)];
        let metrics = dashboard(&[org("o1", None)], &interactions, &deals);
        assert!(metrics.alerts.is_empty());
    }

    #[test]
    fn test_quick_stats() {
        let mut quiet = org("o2", None);
        quiet.updated_at = days_ago(30);
        let orgs = vec![org("o1", None), quiet];

        let mut overdue = interaction("i1", "o1", false, 10);
        overdue.follow_up_date = Some(days_ago(1));
        let mut done = interaction("i2", "o1", true, 10);
        done.follow_up_date = Some(days_ago(1));
        let mut upcoming = interaction("i3", "o1", false, 10);
        upcoming.follow_up_date = Some(now() + Duration::days(3));

        let mut hot = deal("d1", "o1", DealStatus::Active, 30_000.0);
        hot.probability = 80.0;
        let mut lukewarm = deal("d2", "o1", DealStatus::Active, 30_000.0);
        lukewarm.probability = 75.0;
        let mut won = deal("d3", "o1", DealStatus::Won, 90_000.0);
        won.probability = 100.0;

        let metrics = dashboard(&orgs, &[overdue, done, upcoming], &[hot, lukewarm, won]);
        assert_eq!(metrics.quick_stats.stale_organizations, 1);
        assert_eq!(metrics.quick_stats.overdue_follow_ups, 1);
        assert_eq!(metrics.quick_stats.hot_deals, 1);
    }

    #[test]
    fn test_previous_year_comparison() {
        let interactions = vec![
            interaction("i1", "o1", true, 1),
            interaction("i2", "o1", true, 2),
            interaction("i3", "o1", true, 366),
        ];
        let options = DashboardOptions {
            period_days: 30,
            compare_with: ComparisonBasis::PreviousYear,
        };
        let metrics =
            compute_executive_dashboard(&[], &[], &interactions, &[], options, now()).unwrap();
        assert_eq!(metrics.trends.interaction_growth, 100.0);
        assert_eq!(metrics.compare_with, ComparisonBasis::PreviousYear);
    }

    #[test]
    fn test_period_past_date_range_is_bad_request() {
        let options = DashboardOptions {
            period_days: 3_000_000_000,
            compare_with: ComparisonBasis::PreviousPeriod,
        };
        let err = compute_executive_dashboard(&[], &[], &[], &[], options, now()).unwrap_err();
        assert!(matches!(err, ReportError::BadRequest(_)));
        assert!(err.public_message().contains("3000000000"));
    }
}
