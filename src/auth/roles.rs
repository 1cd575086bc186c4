//! User roles and the users they describe
//!
//! Only brokers are restricted to a territory. Admins and managers see
//! everything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried by a CRM user
///
/// Role strings outside the known set are preserved as `Unrecognized` so
/// every match over roles has to decide what they mean.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Full access to every record
    Admin,
    /// Full access to every record
    Manager,
    /// Access limited to the assigned territory
    Broker,
    /// Role string not known to this service
    Unrecognized(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Broker => "broker",
            Role::Unrecognized(raw) => raw,
        }
    }

    /// Whether records must be narrowed to the user's territory
    pub fn is_territory_restricted(&self) -> bool {
        matches!(self, Role::Broker)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "broker" => Role::Broker,
            _ => Role::Unrecognized(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed-in CRM user as seen by the access rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: Role,
    /// Territory tokens (state codes, city names, ZIP codes)
    #[serde(default)]
    pub territory: Vec<String>,
    /// Principal/brand names the user represents
    #[serde(default)]
    pub principals: Vec<String>,
}

impl User {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            territory: Vec::new(),
            principals: Vec::new(),
        }
    }

    pub fn with_territory<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.territory = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_principals<I, S>(mut self, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principals = principals.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("manager"), Role::Manager);
        assert_eq!(Role::from("broker"), Role::Broker);
        assert_eq!(
            Role::from("Broker"),
            Role::Unrecognized("Broker".to_string())
        );
    }

    #[test]
    fn test_role_serde_round_trip_keeps_raw_value() {
        let role: Role = serde_json::from_str(r#""auditor""#).unwrap();
        assert_eq!(role, Role::Unrecognized("auditor".into()));
        assert_eq!(serde_json::to_string(&role).unwrap(), r#""auditor""#);
    }

    #[test]
    fn test_only_brokers_are_restricted() {
        assert!(Role::Broker.is_territory_restricted());
        assert!(!Role::Admin.is_territory_restricted());
        assert!(!Role::Manager.is_territory_restricted());
        assert!(!Role::Unrecognized("x".into()).is_territory_restricted());
    }

    #[test]
    fn test_user_deserializes_without_territory() {
        let user: User = serde_json::from_str(r#"{"id":"u1","role":"broker"}"#).unwrap();
        assert_eq!(user.role, Role::Broker);
        assert!(user.territory.is_empty());
        assert!(user.principals.is_empty());
    }
}
