// src/matching/index.rs
//! In-memory reference indices built from the reference store.
//!
//! Every index keeps two views of the same records: an insertion-ordered
//! `id -> normalized name` list used for candidate scans, and a
//! `normalized name -> id` map used for exact lookups. On duplicate names the
//! last loaded record wins the exact lookup.

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::HashMap;

use super::error::MatchError;
use super::normalize::normalize;
use crate::models::{CanonicalRecord, EntityKind, ScopeKey, StoreRow};
use crate::store::ReferenceStore;

/// Checks a raw store row and turns it into a canonical record.
pub fn validate_row(kind: EntityKind, row: StoreRow) -> Result<CanonicalRecord, MatchError> {
    let id = row.id;
    let malformed = move |reason| MatchError::MalformedRecord { kind, id, reason };
    if row.id <= 0 {
        return Err(malformed("non-positive id"));
    }
    let raw_name = match &row.name {
        Some(name) => name.clone(),
        None => return Err(malformed("missing name")),
    };
    let normalized_name = normalize(&raw_name);
    if normalized_name.is_empty() {
        return Err(malformed("empty name"));
    }
    if kind == EntityKind::Investigator && !matches!(row.scope, Some(ScopeKey::Institution(_))) {
        return Err(malformed("missing owning institution"));
    }
    Ok(CanonicalRecord {
        id: row.id,
        raw_name,
        normalized_name,
        scope: row.scope,
    })
}

/// Validates rows, logging and dropping the malformed ones.
pub fn validate_rows(kind: EntityKind, rows: Vec<StoreRow>) -> Vec<CanonicalRecord> {
    let total = rows.len();
    let records: Vec<CanonicalRecord> = rows
        .into_iter()
        .filter_map(|row| match validate_row(kind, row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping record: {}", e);
                None
            }
        })
        .collect();
    if records.len() < total {
        info!(
            "Kept {} of {} {} records ({} malformed)",
            records.len(),
            total,
            kind,
            total - records.len()
        );
    }
    records
}

/// Full load of one entity kind. Store failures are fatal.
pub async fn load_records<S: ReferenceStore>(
    store: &S,
    kind: EntityKind,
) -> Result<Vec<CanonicalRecord>, MatchError> {
    let rows = store
        .load_all(kind)
        .await
        .map_err(|e| MatchError::store_unavailable(kind, e))?;
    Ok(validate_rows(kind, rows))
}

/// Scoped load of one entity kind. Store failures are fatal.
pub async fn load_scoped_records<S: ReferenceStore>(
    store: &S,
    kind: EntityKind,
    scope: &ScopeKey,
) -> Result<Vec<CanonicalRecord>, MatchError> {
    let rows = store
        .load_scoped(kind, scope)
        .await
        .map_err(|e| MatchError::store_unavailable(kind, e))?;
    Ok(validate_rows(kind, rows))
}

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_id: IndexMap<i64, String>,
    by_name: HashMap<String, i64>,
}

impl NameIndex {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        let mut index = Self::default();
        for record in records {
            index.insert(record.id, &record.normalized_name);
        }
        index
    }

    /// Re-inserting an id under a new name drops its old name from the
    /// exact lookup, unless another record has since claimed that name.
    pub fn insert(&mut self, id: i64, normalized_name: &str) {
        if let Some(old) = self.by_id.insert(id, normalized_name.to_string()) {
            if old != normalized_name && self.by_name.get(&old) == Some(&id) {
                self.by_name.remove(&old);
            }
        }
        self.by_name.insert(normalized_name.to_string(), id);
    }

    /// Exact lookup of an already normalized name.
    pub fn get(&self, normalized_name: &str) -> Option<i64> {
        self.by_name.get(normalized_name).copied()
    }

    pub fn candidates(&self) -> &IndexMap<i64, String> {
        &self.by_id
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Institutions: primary index plus per-city partitions materialized on
/// first use and kept for the lifetime of the index.
pub struct InstitutionIndex<S> {
    store: S,
    primary: NameIndex,
    by_city: HashMap<String, NameIndex>,
}

impl<S: ReferenceStore> InstitutionIndex<S> {
    pub async fn load(store: S) -> Result<Self, MatchError> {
        let records = load_records(&store, EntityKind::Institution).await?;
        let primary = NameIndex::from_records(&records);
        info!("[INSTITUTION] Indexed {} institution names", primary.len());
        Ok(Self {
            store,
            primary,
            by_city: HashMap::new(),
        })
    }

    pub fn primary(&self) -> &NameIndex {
        &self.primary
    }

    /// Candidates located in `city` (already normalized). The first call for
    /// a city reads the store; a failed read is not cached.
    pub async fn city_partition(&mut self, city: &str) -> Result<&NameIndex, MatchError> {
        if !self.by_city.contains_key(city) {
            let scope = ScopeKey::City(city.to_string());
            let records = load_scoped_records(&self.store, EntityKind::Institution, &scope).await?;
            debug!(
                "[INSTITUTION] Cached {} institutions for city '{}'",
                records.len(),
                city
            );
            self.by_city
                .insert(city.to_string(), NameIndex::from_records(&records));
        }
        Ok(&self.by_city[city])
    }

    pub fn cached_cities(&self) -> usize {
        self.by_city.len()
    }
}

/// Investigators partitioned by owning institution at load time.
#[derive(Debug, Default)]
pub struct InvestigatorIndex {
    rosters: HashMap<i64, NameIndex>,
}

impl InvestigatorIndex {
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut rosters: HashMap<i64, NameIndex> = HashMap::new();
        for record in records {
            if let Some(ScopeKey::Institution(institution_id)) = record.scope {
                rosters
                    .entry(institution_id)
                    .or_default()
                    .insert(record.id, &record.normalized_name);
            }
        }
        Self { rosters }
    }

    pub fn roster(&self, institution_id: i64) -> Option<&NameIndex> {
        self.rosters.get(&institution_id)
    }

    /// Replaces one institution's roster wholesale.
    pub fn replace(&mut self, institution_id: i64, records: &[CanonicalRecord]) {
        self.rosters
            .insert(institution_id, NameIndex::from_records(records));
    }

    pub fn institutions(&self) -> usize {
        self.rosters.len()
    }

    pub fn investigators(&self) -> usize {
        self.rosters.values().map(NameIndex::len).sum()
    }
}
