//! Territory rules
//!
//! Brokers are assigned a territory made of state codes, city names and ZIP
//! codes. This module classifies those tokens, validates them, and scopes
//! list queries and single records to them.
//!
//! Dependency order: [`classify`] → [`parse`] → [`scope`].

pub mod classify;
pub mod parse;
pub mod scope;

pub use classify::{classify, Location, TerritoryToken};
pub use parse::{
    format_territory, parse_territory, parse_tokens, validate_territory, ParsedTerritory,
    Territory, TerritoryValidation,
};
pub use scope::{
    apply_territory_filter, can_access_record, is_record_in_territory, territory_filter,
    LocationPath, Pagination, ResourceKind, ResourceQuery, Sort, SortOrder, DENY_ALL_KEY,
    DENY_ALL_SENTINEL,
};
