// src/store/postgres.rs
use log::debug;
use tokio_postgres::Row as PgRow;

use super::{ReferenceStore, StoreError};
use crate::models::{EntityKind, ScopeKey, StoreRow};
use crate::utils::db_connect::PgPool;

// Mirrors `normalize()` closely enough for an equality filter on the city column.
const NORMALIZED_CITY_SQL: &str =
    "btrim(regexp_replace(regexp_replace(lower(institution_city), '[.,-]', '', 'g'), '\\s+', ' ', 'g'))";

/// Reference store reading the research projects database.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        kind: EntityKind,
    ) -> Result<Vec<StoreRow>, StoreError> {
        let conn = self.pool.get().await?;
        let rows = conn.query(sql, params).await?;
        debug!("Fetched {} {} rows", rows.len(), kind);
        Ok(rows.iter().map(|row| to_store_row(row, kind)).collect())
    }
}

fn to_store_row(row: &PgRow, kind: EntityKind) -> StoreRow {
    let scope = match kind {
        EntityKind::Institution => row
            .get::<_, Option<String>>("scope")
            .map(ScopeKey::City),
        EntityKind::Investigator => row
            .get::<_, Option<i64>>("scope")
            .map(ScopeKey::Institution),
        EntityKind::FundingSource => None,
    };
    StoreRow {
        id: row.get("id"),
        name: row.get("name"),
        scope,
    }
}

impl ReferenceStore for PgReferenceStore {
    async fn load_all(&self, kind: EntityKind) -> Result<Vec<StoreRow>, StoreError> {
        let sql = match kind {
            EntityKind::Institution => {
                "SELECT id::bigint AS id, institution_name AS name, institution_city AS scope
                 FROM institution_data ORDER BY id"
            }
            EntityKind::Investigator => {
                "SELECT id::bigint AS id, name, institution::bigint AS scope
                 FROM investigator_data ORDER BY name"
            }
            EntityKind::FundingSource => {
                "SELECT id::bigint AS id, agency_full_name AS name
                 FROM agency_data ORDER BY id"
            }
        };
        self.fetch(sql, &[], kind).await
    }

    async fn load_scoped(
        &self,
        kind: EntityKind,
        scope: &ScopeKey,
    ) -> Result<Vec<StoreRow>, StoreError> {
        match (kind, scope) {
            (EntityKind::Institution, ScopeKey::City(city)) => {
                let sql = format!(
                    "SELECT id::bigint AS id, institution_name AS name, institution_city AS scope
                     FROM institution_data WHERE {} = $1 ORDER BY id",
                    NORMALIZED_CITY_SQL
                );
                self.fetch(&sql, &[city], kind).await
            }
            (EntityKind::Investigator, ScopeKey::Institution(institution_id)) => {
                let sql = "SELECT id::bigint AS id, name, institution::bigint AS scope
                           FROM investigator_data WHERE institution::bigint = $1 ORDER BY name";
                self.fetch(sql, &[institution_id], kind).await
            }
            _ => Err(StoreError::Unavailable(format!(
                "no scoped query for {} records by {}",
                kind, scope
            ))),
        }
    }
}
