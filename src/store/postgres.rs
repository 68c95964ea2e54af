//! # PostgreSQL Case Store
//!
//! `CaseStore` and `SequenceSource` backed by PostgreSQL through SQLx.
//!
//! ## Database Schema
//!
//! See `migrations/`: `caseflow_cases` (one row per case, unique on
//! `case_number`, carrying the unit `version`), `caseflow_workflows` (one row
//! per case), `caseflow_workflow_steps` and `caseflow_case_documents` (child
//! rows keyed by case id). Case numbers draw from `caseflow_case_number_seq`.
//!
//! ## Concurrency
//!
//! - `nextval` gives atomic, gap-tolerant numbering under concurrent creation.
//! - `commit_unit` runs `UPDATE ... WHERE version = $expected` inside a
//!   transaction; zero affected rows means a concurrent writer won and the
//!   transaction is rolled back before any step row is touched.
//! - A partial unique index allows one `IN_PROGRESS` step per case.

use super::{CaseStore, CaseUnit, SequenceSource};
use crate::config::DatabaseConfig;
use crate::error::{CaseflowError, CaseflowResult};
use crate::models::{Case, CasePage, CaseQuery, DocumentEntry, Workflow, WorkflowStep};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const CASE_COLUMNS: &str = "c.case_id, c.case_number, c.title, c.description, c.status, \
     c.initiator_id, c.current_step, c.version, c.created_at, c.updated_at";

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed case store
#[derive(Debug, Clone)]
pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from configuration (`database.url`, else `DATABASE_URL`)
    pub async fn connect(config: &DatabaseConfig) -> CaseflowResult<Self> {
        let url = config.database_url().ok_or_else(|| {
            CaseflowError::ConfigurationError(
                "database.url is not set and DATABASE_URL is missing".to_string(),
            )
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await?;

        info!(max_connections = config.max_connections, "Connected case store pool");
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> CaseflowResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_state<T: FromStr<Err = String>>(raw: &str) -> CaseflowResult<T> {
    raw.parse().map_err(CaseflowError::DatabaseError)
}

fn step_number_from_db(raw: i32) -> CaseflowResult<u32> {
    u32::try_from(raw)
        .map_err(|_| CaseflowError::DatabaseError(format!("Invalid step number in database: {raw}")))
}

fn step_number_to_db(step_number: u32) -> CaseflowResult<i32> {
    i32::try_from(step_number)
        .map_err(|_| CaseflowError::validation(format!("Step number {step_number} is out of range")))
}

fn offset_to_db(query: &CaseQuery) -> CaseflowResult<i64> {
    let offset = query.offset();
    i64::try_from(offset)
        .map_err(|_| CaseflowError::validation(format!("Page offset {offset} is out of range")))
}

fn case_from_row(row: &PgRow) -> CaseflowResult<(Case, i64)> {
    let status: String = row.try_get("status")?;
    let current_step: i32 = row.try_get("current_step")?;

    let case = Case {
        case_id: row.try_get("case_id")?,
        case_number: row.try_get("case_number")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: parse_state(&status)?,
        initiator_id: row.try_get("initiator_id")?,
        current_step: step_number_from_db(current_step)?,
        documents: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };
    Ok((case, row.try_get("version")?))
}

fn step_from_row(row: &PgRow) -> CaseflowResult<WorkflowStep> {
    let status: String = row.try_get("status")?;
    let step_number: i32 = row.try_get("step_number")?;

    Ok(WorkflowStep {
        step_number: step_number_from_db(step_number)?,
        department_id: row.try_get("department_id")?,
        officer_id: row.try_get("officer_id")?,
        status: parse_state(&status)?,
        notes: row.try_get("notes")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn document_from_row(row: &PgRow) -> CaseflowResult<DocumentEntry> {
    Ok(DocumentEntry {
        document_id: row.try_get("document_id")?,
        document_url: row.try_get("document_url")?,
        uploaded_by: row.try_get("uploaded_by")?,
        document_type: row.try_get("document_type")?,
        uploaded_at: row.try_get("uploaded_at")?,
    })
}

/// Escape LIKE metacharacters so search input is matched literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CaseQuery) {
    builder.push(" WHERE TRUE");
    if let Some(status) = query.status {
        builder.push(" AND c.status = ").push_bind(status.as_str());
    }
    if let Some(department_id) = query.department_id {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM caseflow_workflow_steps s \
                 WHERE s.case_id = c.case_id AND s.department_id = ",
            )
            .push_bind(department_id)
            .push(")");
    }
    if let Some(needle) = query.needle() {
        let pattern = format!("%{}%", escape_like(&needle));
        builder
            .push(" AND (LOWER(c.case_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(c.title) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn fetch_documents(
    conn: &mut PgConnection,
    case_ids: &[Uuid],
) -> CaseflowResult<HashMap<Uuid, Vec<DocumentEntry>>> {
    let rows = sqlx::query(
        "SELECT case_id, document_id, document_url, uploaded_by, document_type, uploaded_at \
         FROM caseflow_case_documents WHERE case_id = ANY($1) ORDER BY case_id, position",
    )
    .bind(case_ids.to_vec())
    .fetch_all(&mut *conn)
    .await?;

    let mut by_case: HashMap<Uuid, Vec<DocumentEntry>> = HashMap::new();
    for row in &rows {
        let case_id: Uuid = row.try_get("case_id")?;
        by_case
            .entry(case_id)
            .or_default()
            .push(document_from_row(row)?);
    }
    Ok(by_case)
}

async fn fetch_case(conn: &mut PgConnection, case_id: Uuid) -> CaseflowResult<Option<(Case, i64)>> {
    let row = sqlx::query(&format!(
        "SELECT {CASE_COLUMNS} FROM caseflow_cases c WHERE c.case_id = $1"
    ))
    .bind(case_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let (mut case, version) = case_from_row(&row)?;
    case.documents = fetch_documents(conn, &[case_id])
        .await?
        .remove(&case_id)
        .unwrap_or_default();
    Ok(Some((case, version)))
}

async fn fetch_workflow(conn: &mut PgConnection, case_id: Uuid) -> CaseflowResult<Option<Workflow>> {
    let row = sqlx::query("SELECT created_at, updated_at FROM caseflow_workflows WHERE case_id = $1")
        .bind(case_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let step_rows = sqlx::query(
        "SELECT step_number, department_id, officer_id, status, notes, completed_at \
         FROM caseflow_workflow_steps WHERE case_id = $1 ORDER BY step_number",
    )
    .bind(case_id)
    .fetch_all(&mut *conn)
    .await?;

    let steps = step_rows
        .iter()
        .map(step_from_row)
        .collect::<CaseflowResult<Vec<_>>>()?;

    Ok(Some(Workflow {
        case_id,
        steps,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    }))
}

async fn write_workflow(conn: &mut PgConnection, workflow: &Workflow) -> CaseflowResult<()> {
    sqlx::query(
        "INSERT INTO caseflow_workflows (case_id, created_at, updated_at) VALUES ($1, $2, $3) \
         ON CONFLICT (case_id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
    )
    .bind(workflow.case_id)
    .bind(workflow.created_at)
    .bind(workflow.updated_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM caseflow_workflow_steps WHERE case_id = $1")
        .bind(workflow.case_id)
        .execute(&mut *conn)
        .await?;

    for step in &workflow.steps {
        sqlx::query(
            "INSERT INTO caseflow_workflow_steps \
             (case_id, step_number, department_id, officer_id, status, notes, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(workflow.case_id)
        .bind(step_number_to_db(step.step_number)?)
        .bind(step.department_id)
        .bind(step.officer_id)
        .bind(step.status.as_str())
        .bind(step.notes.as_deref())
        .bind(step.completed_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl SequenceSource for PgCaseStore {
    async fn next_value(&self) -> CaseflowResult<u64> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('caseflow_case_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(value)
            .map_err(|_| CaseflowError::DatabaseError(format!("Negative sequence value {value}")))
    }
}

#[async_trait]
impl CaseStore for PgCaseStore {
    async fn insert_case(&self, case: &Case, workflow: Option<&Workflow>) -> CaseflowResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO caseflow_cases \
             (case_id, case_number, title, description, status, initiator_id, current_step, \
              version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)",
        )
        .bind(case.case_id)
        .bind(&case.case_number)
        .bind(&case.title)
        .bind(&case.description)
        .bind(case.status.as_str())
        .bind(case.initiator_id)
        .bind(step_number_to_db(case.current_step)?)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let duplicate = err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                return Err(CaseflowError::DuplicateCaseNumber(case.case_number.clone()));
            }
            return Err(err.into());
        }

        if let Some(workflow) = workflow {
            write_workflow(&mut tx, workflow).await?;
        }

        tx.commit().await?;
        debug!(case_id = %case.case_id, case_number = %case.case_number, "Inserted case");
        Ok(())
    }

    async fn find_case(&self, case_id: Uuid) -> CaseflowResult<Option<Case>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_case(&mut conn, case_id).await?.map(|(case, _)| case))
    }

    async fn find_workflow(&self, case_id: Uuid) -> CaseflowResult<Option<Workflow>> {
        let mut conn = self.pool.acquire().await?;
        fetch_workflow(&mut conn, case_id).await
    }

    async fn load_unit(&self, case_id: Uuid) -> CaseflowResult<Option<CaseUnit>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some((case, version)) = fetch_case(&mut tx, case_id).await? else {
            return Ok(None);
        };
        let workflow = fetch_workflow(&mut tx, case_id).await?;
        tx.commit().await?;

        Ok(Some(CaseUnit {
            case,
            workflow,
            version,
        }))
    }

    async fn commit_unit(&self, unit: &CaseUnit) -> CaseflowResult<bool> {
        let case_id = unit.case.case_id;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE caseflow_cases \
             SET status = $1, current_step = $2, updated_at = $3, version = version + 1 \
             WHERE case_id = $4 AND version = $5",
        )
        .bind(unit.case.status.as_str())
        .bind(step_number_to_db(unit.case.current_step)?)
        .bind(unit.case.updated_at)
        .bind(case_id)
        .bind(unit.version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(case_id = %case_id, expected = unit.version, "Rejected stale case unit");
            return Ok(false);
        }

        if let Some(workflow) = &unit.workflow {
            write_workflow(&mut tx, workflow).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn append_document(&self, case_id: Uuid, entry: &DocumentEntry) -> CaseflowResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO caseflow_case_documents \
             (document_id, case_id, document_url, uploaded_by, document_type, uploaded_at) \
             SELECT $1, $2, $3, $4, $5, $6 \
             WHERE EXISTS (SELECT 1 FROM caseflow_cases WHERE case_id = $2)",
        )
        .bind(entry.document_id)
        .bind(case_id)
        .bind(&entry.document_url)
        .bind(entry.uploaded_by)
        .bind(&entry.document_type)
        .bind(entry.uploaded_at)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() == 1)
    }

    async fn list_cases(&self, query: &CaseQuery) -> CaseflowResult<CasePage> {
        let (_, limit) = query.normalized();
        let offset = offset_to_db(query)?;
        let mut conn = self.pool.acquire().await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM caseflow_cases c");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CASE_COLUMNS} FROM caseflow_cases c"
        ));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY c.created_at DESC, c.case_number DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = select.build().fetch_all(&mut *conn).await?;

        let mut cases = rows
            .iter()
            .map(|row| case_from_row(row).map(|(case, _)| case))
            .collect::<CaseflowResult<Vec<_>>>()?;

        let ids: Vec<Uuid> = cases.iter().map(|case| case.case_id).collect();
        let mut documents = fetch_documents(&mut conn, &ids).await?;
        for case in &mut cases {
            case.documents = documents.remove(&case.case_id).unwrap_or_default();
        }

        Ok(CasePage::new(cases, total.max(0) as u64, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("file-2026"), "file-2026");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_step_number_conversion() {
        assert_eq!(step_number_from_db(3).unwrap(), 3);
        assert!(step_number_from_db(-1).is_err());
        assert!(step_number_to_db(u32::MAX).is_err());
    }

    #[test]
    fn test_offset_conversion() {
        let query = CaseQuery {
            page: 3,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(offset_to_db(&query).unwrap(), 20);

        let far = CaseQuery {
            page: u32::MAX,
            limit: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            offset_to_db(&far),
            Err(CaseflowError::ValidationError(_))
        ));
    }
}
