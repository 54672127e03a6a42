// src/models/core.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier returned when no canonical record was found. Never a real id.
pub const NO_MATCH: i64 = 0;

/// The three kinds of canonical records held in the reference store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Institution,
    Investigator,
    FundingSource,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Institution => "institution",
            EntityKind::Investigator => "investigator",
            EntityKind::FundingSource => "funding_source",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope attached to a stored record: the city of an institution or the
/// owning institution of an investigator. Funding sources have none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeKey {
    Institution(i64),
    City(String),
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Institution(id) => write!(f, "institution {}", id),
            ScopeKey::City(city) => write!(f, "city '{}'", city),
        }
    }
}

/// A raw row as handed over by a reference store, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeKey>,
}

impl StoreRow {
    pub fn new(id: i64, name: &str, scope: Option<ScopeKey>) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            scope,
        }
    }
}

/// A validated canonical record owned by a reference index.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub id: i64,
    pub raw_name: String,
    pub normalized_name: String,
    pub scope: Option<ScopeKey>,
}

/// Context accompanying a query name.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchContext {
    City(String),
    Institution(i64),
}

/// A single lookup request. Built per call, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub raw_name: String,
    pub context: Option<MatchContext>,
}

impl MatchQuery {
    pub fn new(raw_name: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            context: None,
        }
    }

    pub fn in_city(raw_name: &str, city: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            context: Some(MatchContext::City(city.to_string())),
        }
    }

    pub fn at_institution(raw_name: &str, institution_id: i64) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            context: Some(MatchContext::Institution(institution_id)),
        }
    }

    /// City context, or "" when absent or of another shape.
    pub fn city(&self) -> &str {
        match &self.context {
            Some(MatchContext::City(city)) => city,
            _ => "",
        }
    }

    /// Owning institution id, or `NO_MATCH` when absent or of another shape.
    pub fn institution_id(&self) -> i64 {
        match self.context {
            Some(MatchContext::Institution(id)) => id,
            _ => NO_MATCH,
        }
    }
}
