//! Access scope resolver
//!
//! Rewrites list queries so brokers only see records inside their
//! territory, and answers whether a single record is visible to a user.
//! Denial is expressed as data (a filter that matches nothing, or `false`),
//! never as an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

use super::classify::Location;
use super::parse::{parse_tokens, Territory};
use crate::auth::{Role, User};

/// Primary-key filter injected for brokers without any territory
pub const DENY_ALL_KEY: &str = "id";
/// Value no record id can take
pub const DENY_ALL_SENTINEL: &str = "__no_territory_access__";

/// Resource names the resolver knows how to scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Organizations,
    Customers,
    Contacts,
    Interactions,
    Deals,
    Visits,
    Reminders,
    Users,
    /// Any resource without a territory relationship
    Other(String),
}

/// How a resource kind relates to a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPath {
    /// `state`/`city`/`zipCode` live on the record
    Direct,
    /// Location lives on the record's `organization`
    ThroughOrganization,
    /// Records carry their own territory array
    TerritoryOverlap,
    /// No territory relationship
    Unscoped,
}

impl ResourceKind {
    pub fn parse(resource: &str) -> Self {
        match resource {
            "organizations" => Self::Organizations,
            "customers" => Self::Customers,
            "contacts" => Self::Contacts,
            "interactions" => Self::Interactions,
            "deals" => Self::Deals,
            "visits" => Self::Visits,
            "reminders" => Self::Reminders,
            "users" => Self::Users,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Organizations => "organizations",
            Self::Customers => "customers",
            Self::Contacts => "contacts",
            Self::Interactions => "interactions",
            Self::Deals => "deals",
            Self::Visits => "visits",
            Self::Reminders => "reminders",
            Self::Users => "users",
            Self::Other(name) => name,
        }
    }

    pub fn location_path(&self) -> LocationPath {
        match self {
            Self::Organizations | Self::Customers => LocationPath::Direct,
            Self::Contacts | Self::Interactions | Self::Deals | Self::Visits | Self::Reminders => {
                LocationPath::ThroughOrganization
            }
            Self::Users => LocationPath::TerritoryOverlap,
            Self::Other(_) => LocationPath::Unscoped,
        }
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: "id".to_string(),
            order: SortOrder::Asc,
        }
    }
}

/// List query as issued by a list screen: pagination, sort and filter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceQuery {
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub sort: Sort,
    #[serde(default)]
    pub filter: Map<String, Value>,
}

/// Restrict `query` to what `user` may see of `resource`.
///
/// Only `filter` is ever touched; resolver keys overwrite existing keys of
/// the same name.
pub fn apply_territory_filter(
    user: &User,
    resource: &ResourceKind,
    query: ResourceQuery,
) -> ResourceQuery {
    match &user.role {
        Role::Admin | Role::Manager => query,
        Role::Broker => {
            if parse_tokens(&user.territory).is_empty() {
                return deny_all(query);
            }

            let mut query = query;
            query.filter.extend(territory_filter(resource, &user.territory));
            query
        }
        Role::Unrecognized(raw) => {
            // Fail-open kept until product decides what unknown roles mean.
            warn!(
                user_id = %user.id,
                role = %raw,
                resource = %resource,
                "Unrecognized role, query left unscoped"
            );
            query
        }
    }
}

fn deny_all(mut query: ResourceQuery) -> ResourceQuery {
    query
        .filter
        .insert(DENY_ALL_KEY.to_string(), Value::from(DENY_ALL_SENTINEL));
    query
}

/// Filter predicates that restrict `resource` to the territory `tokens`.
///
/// Location fields get one key per non-empty bucket; several buckets are
/// wrapped in one `@or` entry so a record matching any of them is kept.
/// User territories overlap on the trimmed tokens exactly as stored.
pub fn territory_filter<S: AsRef<str>>(
    resource: &ResourceKind,
    tokens: &[S],
) -> Map<String, Value> {
    let prefix = match resource.location_path() {
        LocationPath::Direct => "",
        LocationPath::ThroughOrganization => "organization.",
        LocationPath::TerritoryOverlap => {
            let stored: Vec<&str> = tokens
                .iter()
                .map(|t| t.as_ref().trim())
                .filter(|t| !t.is_empty())
                .collect();
            let mut filter = Map::new();
            filter.insert("territory@ov".to_string(), serde_json::json!(stored));
            return filter;
        }
        LocationPath::Unscoped => return Map::new(),
    };

    let parsed = parse_tokens(tokens);
    let mut predicates = Map::new();
    for (field, values) in [
        ("state", &parsed.states),
        ("city", &parsed.cities),
        ("zipCode", &parsed.zip_codes),
    ] {
        if !values.is_empty() {
            predicates.insert(format!("{prefix}{field}@in"), serde_json::json!(values));
        }
    }

    if predicates.len() > 1 {
        let mut filter = Map::new();
        filter.insert("@or".to_string(), Value::Object(predicates));
        filter
    } else {
        predicates
    }
}

/// Whether `user` may see `record` of kind `resource`
pub fn can_access_record(user: &User, record: &Value, resource: &ResourceKind) -> bool {
    match &user.role {
        Role::Admin | Role::Manager => true,
        Role::Broker => {
            let territory = Territory::from_tokens(&user.territory);
            if territory.is_empty() {
                return false;
            }
            is_record_in_territory(&territory, record, resource)
        }
        Role::Unrecognized(_) => true,
    }
}

/// Whether the record's location (direct or through its organization)
/// matches at least one territory token. Unscoped kinds always pass.
pub fn is_record_in_territory(
    territory: &Territory,
    record: &Value,
    resource: &ResourceKind,
) -> bool {
    let located = match resource.location_path() {
        LocationPath::Direct => record,
        LocationPath::ThroughOrganization => match record.get("organization") {
            Some(org) => org,
            None => return false,
        },
        LocationPath::TerritoryOverlap => {
            let theirs: Vec<&str> = record
                .get("territory")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let theirs = Territory::from_tokens(&theirs);
            return territory
                .tokens()
                .iter()
                .any(|mine| theirs.tokens().iter().any(|t| mine.same_area(t)));
        }
        LocationPath::Unscoped => return true,
    };

    territory.matches(&location_of(located))
}

fn location_of(value: &Value) -> Location<'_> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);
    Location {
        state: field("state"),
        city: field("city"),
        zip_code: field("zipCode").or_else(|| field("zip_code")),
    }
}
