// src/linking/writer.rs
use log::{debug, info};

use crate::models::{Project, NO_MATCH};
use crate::store::{MemoryStore, StoreError};
use crate::utils::db_connect::PgPool;

/// Persists linked projects and the investigators they introduce.
#[allow(async_fn_in_trait)]
pub trait ProjectWriter {
    /// True when a project with the same number and title already exists.
    async fn is_duplicate(&self, project: &Project) -> Result<bool, StoreError>;

    /// Inserts the project row with its institution and agency references.
    async fn insert_project(&self, project: &Project) -> Result<i64, StoreError>;

    /// Inserts a new canonical investigator and returns its id.
    async fn insert_investigator(&self, name: &str, institution_id: i64) -> Result<i64, StoreError>;

    async fn link_investigator(&self, project_id: i64, investigator_id: i64) -> Result<(), StoreError>;
}

impl ProjectWriter for MemoryStore {
    async fn is_duplicate(&self, project: &Project) -> Result<bool, StoreError> {
        self.has_project(&project.project_number, &project.title)
    }

    async fn insert_project(&self, project: &Project) -> Result<i64, StoreError> {
        self.push_project(project.clone())
    }

    async fn insert_investigator(&self, name: &str, institution_id: i64) -> Result<i64, StoreError> {
        MemoryStore::insert_investigator(self, name, institution_id)
    }

    async fn link_investigator(&self, project_id: i64, investigator_id: i64) -> Result<(), StoreError> {
        self.push_investigator_link(project_id, investigator_id)
    }
}

/// Writer for the research projects database.
#[derive(Clone)]
pub struct PgProjectWriter {
    pool: PgPool,
    updated_by: String,
}

impl PgProjectWriter {
    pub fn new(pool: PgPool, updated_by: &str) -> Self {
        Self {
            pool,
            updated_by: updated_by.to_string(),
        }
    }

    /// Uses `LINKER_UPDATED_BY` as the audit name, defaulting to the crate name.
    pub fn from_env(pool: PgPool) -> Self {
        let updated_by =
            std::env::var("LINKER_UPDATED_BY").unwrap_or_else(|_| "project_linker".to_string());
        info!("Project rows will be attributed to '{}'", updated_by);
        Self::new(pool, &updated_by)
    }
}

impl ProjectWriter for PgProjectWriter {
    async fn is_duplicate(&self, project: &Project) -> Result<bool, StoreError> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt(
                "SELECT id FROM project WHERE project_number = $1 AND project_title = $2 LIMIT 1",
                &[&project.project_number, &project.title],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn insert_project(&self, project: &Project) -> Result<i64, StoreError> {
        let mut conn = self.pool.get().await?;
        let tx = conn.transaction().await?;

        let row = tx
            .query_one(
                "INSERT INTO project
                 (project_number, project_title, source_url, project_start_date, project_end_date,
                  project_more_info, project_objective, project_accession_number, project_type,
                  activity_status, date_entered, comments, archive, last_update, last_update_by)
                 VALUES ($1, $2, $3, $4::date, $5::date, $6, $7, $8, $9, 1, now(), $10, 1, now(), $11)
                 RETURNING id::bigint AS id",
                &[
                    &project.project_number,
                    &project.title,
                    &project.source_url,
                    &project.start_date,
                    &project.end_date,
                    &project.more_info,
                    &project.objective,
                    &project.accession_number,
                    &project.project_type,
                    &project.comments(),
                    &self.updated_by,
                ],
            )
            .await?;
        let project_id: i64 = row.get("id");

        // Only institutions already in the database are referenced.
        for institution in project.institutions().iter().filter(|i| i.id != NO_MATCH) {
            tx.execute(
                "INSERT INTO institution_index (pid, inst_id) VALUES ($1::bigint, $2::bigint)",
                &[&project_id, &institution.id],
            )
            .await?;
        }
        if let Some(agency_id) = project.funding_source_id.filter(|id| *id != NO_MATCH) {
            tx.execute(
                "INSERT INTO agency_index (pid, aid) VALUES ($1::bigint, $2::bigint)",
                &[&project_id, &agency_id],
            )
            .await?;
        }

        tx.commit().await?;
        debug!("Inserted project {} as id {}", project.project_number, project_id);
        Ok(project_id)
    }

    async fn insert_investigator(&self, name: &str, institution_id: i64) -> Result<i64, StoreError> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_one(
                "INSERT INTO investigator_data (name, institution, date_entered)
                 VALUES ($1, $2::bigint, now())
                 RETURNING id::bigint AS id",
                &[&name, &institution_id],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn link_investigator(&self, project_id: i64, investigator_id: i64) -> Result<(), StoreError> {
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO investigator_index (pid, inv_id) VALUES ($1::bigint, $2::bigint)",
            &[&project_id, &investigator_id],
        )
        .await?;
        Ok(())
    }
}
