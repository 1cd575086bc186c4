//! CRM metrics aggregation
//!
//! Pure folds over already-loaded records. Nothing here performs I/O or
//! keeps state between calls; the HTTP layer fetches the records, scopes
//! them to the caller and hands them over.
//!
//! ## Reports
//!
//! - **Dashboard**: headline figures for a trailing window with trends
//! - **Territory performance**: per account manager breakdown and benchmarks
//! - **Pipeline health**: stage breakdown, risk counts and a health score

pub mod dashboard;
pub mod pipeline;
pub mod records;
pub mod stats;
pub mod territory;

pub use dashboard::{
    compute_executive_dashboard, manager_rollups, top_organizations, top_territories, Alert,
    AlertKind, AlertPriority, DashboardMetrics, DashboardOptions, DashboardSummary,
    DashboardTrends, ManagerRollup, OrganizationRevenue, QuickStats, TopPerformers,
};
pub use pipeline::{
    compute_pipeline_health, PipelineHealth, PipelineMetrics, RiskAnalysis, StageSummary,
};
pub use records::{
    Contact, Dataset, Deal, DealStatus, Interaction, ManagerIndex, Organization,
};
pub use stats::{ComparisonBasis, MonthRange, ReportWindow};
pub use territory::{
    compute_territory_performance, Benchmarks, MonthlyPerformance, TerritoryPerformance,
    TerritoryPerformanceReport,
};
