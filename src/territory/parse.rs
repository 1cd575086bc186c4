//! Territory parsing and validation
//!
//! Parsing is lenient: anything that is not a state or ZIP code becomes a
//! city. Validation is strict and reports every malformed token. The two
//! are deliberately not unified; the parser feeds access rules, the
//! validator feeds territory assignment forms.

use serde::Serialize;

use super::classify::{classify, is_city_name, is_state_code, zip_prefix, Location, TerritoryToken};

/// Territory tokens bucketed by kind, input order preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTerritory {
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub zip_codes: Vec<String>,
}

impl ParsedTerritory {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.cities.is_empty() && self.zip_codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len() + self.cities.len() + self.zip_codes.len()
    }

    fn push(&mut self, token: TerritoryToken) {
        match token {
            TerritoryToken::State(v) => self.states.push(v),
            TerritoryToken::ZipCode(v) => self.zip_codes.push(v),
            TerritoryToken::City(v) => self.cities.push(v),
        }
    }
}

/// Parse a comma separated territory string such as `"CA, Los Angeles, 90210"`
pub fn parse_territory(csv: &str) -> ParsedTerritory {
    bucket(csv.split(','))
}

/// Parse an already split list of territory tokens
pub fn parse_tokens<S: AsRef<str>>(tokens: &[S]) -> ParsedTerritory {
    bucket(tokens.iter().map(AsRef::as_ref))
}

fn bucket<'a>(tokens: impl Iterator<Item = &'a str>) -> ParsedTerritory {
    let mut parsed = ParsedTerritory::default();
    for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
        parsed.push(classify(token));
    }
    parsed
}

/// Human readable form, states first, then cities, then ZIP codes
pub fn format_territory(parsed: &ParsedTerritory) -> String {
    parsed
        .states
        .iter()
        .chain(&parsed.cities)
        .chain(&parsed.zip_codes)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of strict territory validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Validate territory tokens, collecting every error
pub fn validate_territory<S: AsRef<str>>(tokens: &[S]) -> TerritoryValidation {
    let mut errors = Vec::new();

    for (index, raw) in tokens.iter().enumerate() {
        let token = raw.as_ref().trim();
        let area = index + 1;

        if token.is_empty() {
            errors.push(format!("Territory area {area} is empty"));
            continue;
        }

        let recognised = is_state_code(token) || zip_prefix(token).is_some() || is_city_name(token);
        if !recognised {
            errors.push(format!(
                "Territory area {area} (\"{token}\") must be a 2-letter state code, \
                 a 5-digit ZIP code, or a city name"
            ));
        }
    }

    TerritoryValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// A user's classified territory, ready for record matching
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Territory {
    tokens: Vec<TerritoryToken>,
}

impl Territory {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| t.as_ref().trim())
                .filter(|t| !t.is_empty())
                .map(classify)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[TerritoryToken] {
        &self.tokens
    }

    /// True iff at least one token matches the location
    pub fn matches(&self, location: &Location<'_>) -> bool {
        self.tokens.iter().any(|token| token.matches(location))
    }
}
