//! Territory token classification
//!
//! A territory token is one of three kinds, decided once by [`classify`]:
//!
//! - **State**: exactly two ASCII uppercase letters (`CA`)
//! - **ZipCode**: five digits with an optional `-dddd` suffix (`90210-1234`);
//!   only the five digit prefix takes part in matching
//! - **City**: anything else, matched case-insensitively
//!
//! Everything else in this crate consumes the classified form instead of
//! re-inspecting raw strings.

use serde::Serialize;

/// A classified territory token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TerritoryToken {
    State(String),
    /// Five digit prefix of the ZIP code
    ZipCode(String),
    City(String),
}

/// Classify a single token. Total: every string lands in exactly one kind.
///
/// The caller is expected to have trimmed the token already.
pub fn classify(token: &str) -> TerritoryToken {
    if is_state_code(token) {
        TerritoryToken::State(token.to_string())
    } else if let Some(prefix) = zip_prefix(token) {
        TerritoryToken::ZipCode(prefix.to_string())
    } else {
        TerritoryToken::City(token.to_string())
    }
}

/// Exactly two ASCII uppercase letters
pub fn is_state_code(token: &str) -> bool {
    token.len() == 2 && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Five digit prefix of a well-formed ZIP or ZIP+4 code
pub fn zip_prefix(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    let well_formed = match bytes.len() {
        5 => bytes.iter().all(u8::is_ascii_digit),
        10 => {
            bytes[..5].iter().all(u8::is_ascii_digit)
                && bytes[5] == b'-'
                && bytes[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    };
    well_formed.then(|| &token[..5])
}

/// Letters, spaces, apostrophes and hyphens only
pub fn is_city_name(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'' || c == '-')
}

/// Location fields of a record, borrowed for matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location<'a> {
    pub state: Option<&'a str>,
    pub city: Option<&'a str>,
    pub zip_code: Option<&'a str>,
}

impl TerritoryToken {
    /// Raw value as it should appear in filters
    pub fn value(&self) -> &str {
        match self {
            TerritoryToken::State(v) | TerritoryToken::ZipCode(v) | TerritoryToken::City(v) => v,
        }
    }

    /// Whether two tokens name the same area: same kind, with cities
    /// compared case-insensitively
    pub fn same_area(&self, other: &TerritoryToken) -> bool {
        match (self, other) {
            (TerritoryToken::State(a), TerritoryToken::State(b))
            | (TerritoryToken::ZipCode(a), TerritoryToken::ZipCode(b)) => a == b,
            (TerritoryToken::City(a), TerritoryToken::City(b)) => {
                a.to_lowercase() == b.to_lowercase()
            }
            _ => false,
        }
    }

    /// Whether a record located at `location` falls inside this token
    pub fn matches(&self, location: &Location<'_>) -> bool {
        match self {
            TerritoryToken::State(state) => location.state.map(str::trim) == Some(state.as_str()),
            TerritoryToken::ZipCode(prefix) => location
                .zip_code
                .map(str::trim)
                .and_then(|zip| zip.get(..5))
                .is_some_and(|record_prefix| record_prefix == prefix),
            TerritoryToken::City(city) => location
                .city
                .is_some_and(|c| c.trim().to_lowercase() == city.to_lowercase()),
        }
    }
}
