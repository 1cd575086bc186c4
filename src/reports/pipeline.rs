//! Pipeline health
//!
//! Stage breakdown of the active pipeline, risk counts and a 0-100 health
//! score built from fixed penalty bands.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::records::{Deal, ManagerIndex, Organization};
use super::stats::{days_between, mean, older_than, percent_of, ratio};

pub const STALE_AFTER_DAYS: i64 = 30;
pub const LONG_CYCLE_AFTER_DAYS: i64 = 180;
pub const LOW_PROBABILITY: f64 = 25.0;
pub const HIGH_VALUE: f64 = 50_000.0;

const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineHealth {
    pub pipeline_by_stage: Vec<StageSummary>,
    pub risk_analysis: RiskAnalysis,
    pub metrics: PipelineMetrics,
    pub health_score: u32,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: String,
    pub count: usize,
    pub value: f64,
    pub avg_probability: f64,
    pub weighted_value: f64,
}

/// Independent counts; one deal may be counted under several risks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub stale_deals: usize,
    pub low_probability_high_value: usize,
    pub long_cycle_deals: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub total_pipeline_value: f64,
    pub weighted_pipeline_value: f64,
    pub active_deals: usize,
    pub win_rate: f64,
    pub average_deal_velocity_days: f64,
    pub pipeline_coverage: f64,
}

pub fn compute_pipeline_health(
    orgs: &[Organization],
    deals: &[Deal],
    account_manager: Option<&str>,
    now: DateTime<Utc>,
) -> PipelineHealth {
    let index = ManagerIndex::new(orgs);
    let wanted = account_manager.map(str::trim).filter(|m| !m.is_empty());
    let deals: Vec<&Deal> = deals
        .iter()
        .filter(|d| index.belongs_to(d.organization_id.as_deref(), wanted))
        .collect();
    let active: Vec<&Deal> = deals.iter().copied().filter(|d| d.is_active()).collect();

    let pipeline_by_stage = stage_summaries(&active);

    let risk_analysis = RiskAnalysis {
        stale_deals: active
            .iter()
            .filter(|d| older_than(d.updated_at, now, STALE_AFTER_DAYS))
            .count(),
        low_probability_high_value: deals
            .iter()
            .filter(|d| d.probability < LOW_PROBABILITY && d.amount > HIGH_VALUE)
            .count(),
        long_cycle_deals: active
            .iter()
            .filter(|d| older_than(d.created_at, now, LONG_CYCLE_AFTER_DAYS))
            .count(),
    };

    let won: Vec<&Deal> = deals.iter().copied().filter(|d| d.is_won()).collect();
    let revenue: f64 = won.iter().map(|d| d.amount).sum();
    let total_pipeline_value: f64 = active.iter().map(|d| d.amount).sum();
    let metrics = PipelineMetrics {
        total_pipeline_value,
        weighted_pipeline_value: pipeline_by_stage.iter().map(|s| s.weighted_value).sum(),
        active_deals: active.len(),
        win_rate: percent_of(won.len(), deals.len()),
        average_deal_velocity_days: mean(
            won.iter().map(|d| days_between(d.created_at, d.updated_at)),
        ),
        pipeline_coverage: ratio(total_pipeline_value, revenue),
    };

    let (health_score, recommendations) = score(&metrics, &risk_analysis);

    PipelineHealth {
        pipeline_by_stage,
        risk_analysis,
        metrics,
        health_score,
        recommendations,
    }
}

/// Active deals grouped by stage, in order of first appearance
fn stage_summaries(active: &[&Deal]) -> Vec<StageSummary> {
    let mut stages: Vec<(&str, Vec<&Deal>)> = Vec::new();
    for &deal in active {
        match stages.iter_mut().find(|(stage, _)| *stage == deal.stage) {
            Some((_, deals)) => deals.push(deal),
            None => stages.push((deal.stage.as_str(), vec![deal])),
        }
    }

    stages
        .into_iter()
        .map(|(stage, deals)| StageSummary {
            stage: stage.to_string(),
            count: deals.len(),
            value: deals.iter().map(|d| d.amount).sum(),
            avg_probability: mean(deals.iter().map(|d| d.probability)),
            weighted_value: deals.iter().map(|d| d.amount * d.probability / 100.0).sum(),
        })
        .collect()
}

fn score(metrics: &PipelineMetrics, risks: &RiskAnalysis) -> (u32, Vec<String>) {
    let mut penalty = 0i64;
    let mut recommendations = Vec::new();

    if metrics.win_rate < 20.0 {
        penalty += 30;
        recommendations.push(
            "Win rate is below 20%: review qualification criteria before advancing deals"
                .to_string(),
        );
    } else if metrics.win_rate < 40.0 {
        penalty += 15;
        recommendations
            .push("Win rate is below 40%: focus effort on the strongest opportunities".to_string());
    }

    if metrics.average_deal_velocity_days > 120.0 {
        penalty += 20;
        recommendations.push(
            "Deals take over 120 days to close: look for bottlenecks between stages".to_string(),
        );
    } else if metrics.average_deal_velocity_days > 90.0 {
        penalty += 10;
        recommendations
            .push("Deals take over 90 days to close: tighten follow-up cadence".to_string());
    }

    if metrics.pipeline_coverage < 2.0 {
        penalty += 25;
        recommendations.push(
            "Pipeline covers less than 2x closed revenue: generate new opportunities".to_string(),
        );
    } else if metrics.pipeline_coverage < 3.0 {
        penalty += 10;
        recommendations
            .push("Pipeline covers less than 3x closed revenue: keep prospecting".to_string());
    }

    if risks.stale_deals > 0 {
        recommendations.push(format!(
            "{} active deal(s) not updated in {STALE_AFTER_DAYS} days",
            risks.stale_deals
        ));
    }
    if risks.long_cycle_deals > 0 {
        recommendations.push(format!(
            "{} active deal(s) open for more than {LONG_CYCLE_AFTER_DAYS} days",
            risks.long_cycle_deals
        ));
    }
    if risks.low_probability_high_value > 0 {
        recommendations.push(format!(
            "{} high-value deal(s) with win probability under {LOW_PROBABILITY}%",
            risks.low_probability_high_value
        ));
    }

    penalty += risks.stale_deals as i64 * 2
        + risks.long_cycle_deals as i64 * 3
        + risks.low_probability_high_value as i64 * 5;

    let score = (MAX_SCORE - penalty).clamp(0, MAX_SCORE);
    (score as u32, recommendations)
}
