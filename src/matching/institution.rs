// src/matching/institution.rs
use log::debug;

use super::error::MatchError;
use super::index::InstitutionIndex;
use super::normalize::normalize;
use super::similarity::closest_within;
use crate::models::NO_MATCH;
use crate::store::ReferenceStore;

/// Resolves institution names, optionally helped by the institution's city.
pub struct InstitutionMatcher<S> {
    index: InstitutionIndex<S>,
    cutoff: f64,
}

impl<S: ReferenceStore> InstitutionMatcher<S> {
    pub async fn load(store: S, cutoff: f64) -> Result<Self, MatchError> {
        Ok(Self {
            index: InstitutionIndex::load(store).await?,
            cutoff,
        })
    }

    /// Returns the canonical id for `name`, or `NO_MATCH`.
    ///
    /// Order: exact name, exact `name city`, then the closest institution
    /// located in `city`. Without a city only the exact name is tried.
    pub async fn find_match(&mut self, name: &str, city: &str) -> Result<i64, MatchError> {
        let name = normalize(name);
        if name.is_empty() {
            return Ok(NO_MATCH);
        }
        if let Some(id) = self.index.primary().get(&name) {
            debug!("[INSTITUTION] exact hit '{}' -> {}", name, id);
            return Ok(id);
        }

        let city = normalize(city);
        if city.is_empty() {
            return Ok(NO_MATCH);
        }

        // Many institution names carry their city as a suffix.
        let with_city = format!("{} {}", name, city);
        if let Some(id) = self.index.primary().get(&with_city) {
            debug!("[INSTITUTION] city-suffix hit '{}' -> {}", with_city, id);
            return Ok(id);
        }

        let partition = self.index.city_partition(&city).await?;
        let id = closest_within(&name, partition.candidates(), self.cutoff);
        if id != NO_MATCH {
            debug!("[INSTITUTION] fuzzy hit '{}' in '{}' -> {}", name, city, id);
        }
        Ok(id)
    }

    pub fn index(&self) -> &InstitutionIndex<S> {
        &self.index
    }
}
