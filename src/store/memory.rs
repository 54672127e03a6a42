// src/store/memory.rs
//! In-process reference store backed by a JSON snapshot.
//!
//! Used for offline runs (`--snapshot`) and throughout the test suite. The
//! availability switches and the scoped-load counter let callers observe
//! how the matchers talk to the store.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::{ReferenceStore, StoreError};
use crate::matching::normalize::normalize;
use crate::models::{EntityKind, Project, ScopeKey, StoreRow};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub institutions: Vec<StoreRow>,
    #[serde(default)]
    pub investigators: Vec<StoreRow>,
    #[serde(default)]
    pub funding_sources: Vec<StoreRow>,
    #[serde(default)]
    pub projects: Vec<Project>,
    /// (project id, investigator id) pairs written by the linker.
    #[serde(default)]
    pub investigator_links: Vec<(i64, i64)>,
}

impl Snapshot {
    fn rows(&self, kind: EntityKind) -> &[StoreRow] {
        match kind {
            EntityKind::Institution => &self.institutions,
            EntityKind::Investigator => &self.investigators,
            EntityKind::FundingSource => &self.funding_sources,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Snapshot>>,
    unavailable: Arc<AtomicBool>,
    scoped_loads: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            data: Arc::new(RwLock::new(snapshot)),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        info!(
            "Loaded snapshot {}: {} institutions, {} investigators, {} funding sources",
            path.display(),
            snapshot.institutions.len(),
            snapshot.investigators.len(),
            snapshot.funding_sources.len()
        );
        Ok(Self::new(snapshot))
    }

    /// Writes the current contents back out, including linked projects.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let raw = {
            let data = self.read()?;
            serde_json::to_string_pretty(&*data).context("Failed to serialize snapshot")?
        };
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        info!("Wrote snapshot {}", path.display());
        Ok(())
    }

    /// Makes every subsequent load fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `load_scoped` calls served so far.
    pub fn scoped_loads(&self) -> usize {
        self.scoped_loads.load(Ordering::SeqCst)
    }

    /// Inserts an investigator under the next free id and returns that id.
    pub fn insert_investigator(&self, name: &str, institution_id: i64) -> Result<i64, StoreError> {
        let mut data = self.write()?;
        let next_id = data.investigators.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        data.investigators.push(StoreRow::new(
            next_id,
            name,
            Some(ScopeKey::Institution(institution_id)),
        ));
        Ok(next_id)
    }

    pub fn has_project(&self, project_number: &str, title: &str) -> Result<bool, StoreError> {
        let data = self.read()?;
        Ok(data
            .projects
            .iter()
            .any(|p| p.project_number == project_number && p.title == title))
    }

    /// Stores a project and returns its 1-based position as its id.
    pub fn push_project(&self, project: Project) -> Result<i64, StoreError> {
        let mut data = self.write()?;
        data.projects.push(project);
        Ok(data.projects.len() as i64)
    }

    pub fn push_investigator_link(&self, project_id: i64, investigator_id: i64) -> Result<(), StoreError> {
        self.write()?.investigator_links.push((project_id, investigator_id));
        Ok(())
    }

    pub fn investigator_links(&self) -> Result<Vec<(i64, i64)>, StoreError> {
        Ok(self.read()?.investigator_links.clone())
    }

    pub fn projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.read()?.projects.clone())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Snapshot>, StoreError> {
        self.data
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Snapshot>, StoreError> {
        self.data
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn in_scope(row: &StoreRow, scope: &ScopeKey) -> bool {
    match (row.scope.as_ref(), scope) {
        (Some(ScopeKey::City(city)), ScopeKey::City(wanted)) => normalize(city) == *wanted,
        (Some(ScopeKey::Institution(id)), ScopeKey::Institution(wanted)) => id == wanted,
        _ => false,
    }
}

impl ReferenceStore for MemoryStore {
    async fn load_all(&self, kind: EntityKind) -> Result<Vec<StoreRow>, StoreError> {
        self.check_available()?;
        Ok(self.read()?.rows(kind).to_vec())
    }

    async fn load_scoped(
        &self,
        kind: EntityKind,
        scope: &ScopeKey,
    ) -> Result<Vec<StoreRow>, StoreError> {
        self.check_available()?;
        self.scoped_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()?
            .rows(kind)
            .iter()
            .filter(|row| in_scope(row, scope))
            .cloned()
            .collect())
    }
}
