//! Domain records consumed by the aggregator
//!
//! These mirror the rows the CRM store returns. The aggregator only reads
//! them; ownership and persistence stay with the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::auth::User;
use crate::territory::{Location, Territory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_manager: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Account manager, with blank values treated as missing
    pub fn manager(&self) -> Option<&str> {
        self.account_manager
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    pub fn location(&self) -> Location<'_> {
        Location {
            state: self.state.as_deref(),
            city: self.city.as_deref(),
            zip_code: self.zip_code.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Active,
    Won,
    Lost,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub status: DealStatus,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub amount: f64,
    /// Win probability, 0-100
    #[serde(default)]
    pub probability: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn is_won(&self) -> bool {
        self.status == DealStatus::Won
    }

    pub fn is_active(&self) -> bool {
        self.status == DealStatus::Active
    }
}

/// Lookup from organization id to its account manager
pub struct ManagerIndex<'a> {
    by_org: HashMap<&'a str, &'a str>,
}

impl<'a> ManagerIndex<'a> {
    pub fn new(orgs: &'a [Organization]) -> Self {
        Self {
            by_org: orgs
                .iter()
                .filter_map(|org| org.manager().map(|m| (org.id.as_str(), m)))
                .collect(),
        }
    }

    pub fn manager_of(&self, organization_id: Option<&str>) -> Option<&'a str> {
        organization_id.and_then(|id| self.by_org.get(id).copied())
    }

    /// Whether the record's organization is managed by `manager`.
    /// `None` accepts every record.
    pub fn belongs_to(&self, organization_id: Option<&str>, manager: Option<&str>) -> bool {
        match manager {
            None => true,
            Some(wanted) => self.manager_of(organization_id) == Some(wanted),
        }
    }
}

/// Every record the reports are computed over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub deals: Vec<Deal>,
}

impl Dataset {
    /// Narrow the dataset to what `user` may see.
    ///
    /// Brokers keep organizations inside their territory and the contacts,
    /// interactions and deals hanging off them. Same role rules as
    /// [`crate::territory::can_access_record`].
    pub fn visible_to(self, user: &User) -> Dataset {
        if !user.role.is_territory_restricted() {
            return self;
        }

        let territory = Territory::from_tokens(&user.territory);
        if territory.is_empty() {
            return Dataset::default();
        }

        let organizations: Vec<Organization> = self
            .organizations
            .into_iter()
            .filter(|org| territory.matches(&org.location()))
            .collect();
        let visible: HashSet<String> = organizations.iter().map(|org| org.id.clone()).collect();
        let in_scope = |id: &Option<String>| id.as_ref().is_some_and(|id| visible.contains(id));

        Dataset {
            contacts: self
                .contacts
                .into_iter()
                .filter(|c| in_scope(&c.organization_id))
                .collect(),
            interactions: self
                .interactions
                .into_iter()
                .filter(|i| in_scope(&i.organization_id))
                .collect(),
            deals: self
                .deals
                .into_iter()
                .filter(|d| in_scope(&d.organization_id))
                .collect(),
            organizations,
        }
    }

    /// Keep only organizations managed by `manager` and their records
    pub fn managed_by(self, manager: &str) -> Dataset {
        let manager = manager.trim();
        let organizations: Vec<Organization> = self
            .organizations
            .into_iter()
            .filter(|org| org.manager() == Some(manager))
            .collect();
        let ids: HashSet<String> = organizations.iter().map(|org| org.id.clone()).collect();
        let owned = |id: &Option<String>| id.as_ref().is_some_and(|id| ids.contains(id));

        Dataset {
            contacts: self
                .contacts
                .into_iter()
                .filter(|c| owned(&c.organization_id))
                .collect(),
            interactions: self
                .interactions
                .into_iter()
                .filter(|i| owned(&i.organization_id))
                .collect(),
            deals: self
                .deals
                .into_iter()
                .filter(|d| owned(&d.organization_id))
                .collect(),
            organizations,
        }
    }

    pub fn record_count(&self) -> usize {
        self.organizations.len() + self.contacts.len() + self.interactions.len() + self.deals.len()
    }
}
