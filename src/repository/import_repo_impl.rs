// ==========================================
// 商品目录导入系统 - 导入任务 Repository 实现
// ==========================================
// 职责: 实现导入任务/行数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::import_job::{ImportJob, ImportRow, RowData};
use crate::domain::types::{ImportState, RowState};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_repo::ImportRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<(ImportRow, String)> {
    let data_json: String = row.get(3)?;
    let state_raw: String = row.get(4)?;
    let updated_at: String = row.get(6)?;
    Ok((
        ImportRow {
            id: row.get(0)?,
            import_id: row.get(1)?,
            ordinal: row.get::<_, i64>(2)? as usize,
            data: RowData::new(),
            state: RowState::from_db(&state_raw),
            messages: row.get(5)?,
            updated_at: parse_ts(&updated_at),
        },
        data_json,
    ))
}

// ==========================================
// ImportRepositoryImpl
// ==========================================
pub struct ImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRepositoryImpl {
    /// 基于共享连接创建仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn insert_rows_tx(tx: &Transaction, rows: &[ImportRow]) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO import_row (
                id, import_id, ordinal, data_json, state, messages, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;

        let mut count = 0;
        for row in rows {
            stmt.execute(params![
                row.id,
                row.import_id,
                row.ordinal as i64,
                row.data.to_json(),
                row.state.as_str(),
                row.messages,
                row.updated_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        Ok(count)
    }

    fn query_rows(conn: &Connection, job_id: &str) -> RepositoryResult<Vec<ImportRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, import_id, ordinal, data_json, state, messages, updated_at
            FROM import_row
            WHERE import_id = ?1
            ORDER BY ordinal ASC
            "#,
        )?;

        let raw = stmt
            .query_map(params![job_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (mut row, data_json) in raw {
            row.data = RowData::from_json(&data_json)?;
            rows.push(row);
        }
        Ok(rows)
    }
}

#[async_trait]
impl ImportRepository for ImportRepositoryImpl {
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO import_job (
                id, import_type, file_path, state, messages, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                job.id,
                job.import_type,
                job.file_path,
                job.state.as_str(),
                job.messages,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;
        Self::insert_rows_tx(&tx, &job.rows)?;

        tx.commit()?;
        Ok(())
    }

    async fn find_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>> {
        let conn = self.get_conn()?;

        let job = conn
            .query_row(
                r#"
                SELECT id, import_type, file_path, state, messages, created_at, updated_at
                FROM import_job
                WHERE id = ?1
                "#,
                params![job_id],
                |row| {
                    let state_raw: String = row.get(3)?;
                    let created_at: String = row.get(5)?;
                    let updated_at: String = row.get(6)?;
                    Ok(ImportJob {
                        id: row.get(0)?,
                        import_type: row.get(1)?,
                        file_path: row.get(2)?,
                        state: ImportState::from_db(&state_raw),
                        messages: row.get(4)?,
                        rows: Vec::new(),
                        created_at: parse_ts(&created_at),
                        updated_at: parse_ts(&updated_at),
                    })
                },
            )
            .optional()?;

        match job {
            Some(mut job) => {
                job.rows = Self::query_rows(&conn, job_id)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    async fn list_rows(&self, job_id: &str) -> RepositoryResult<Vec<ImportRow>> {
        let conn = self.get_conn()?;
        Self::query_rows(&conn, job_id)
    }

    async fn replace_rows(&self, job_id: &str, rows: &[ImportRow]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM import_row WHERE import_id = ?1", params![job_id])?;
        let count = Self::insert_rows_tx(&tx, rows)?;

        tx.commit()?;
        Ok(count)
    }

    async fn update_row(&self, row: &ImportRow) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE import_row
            SET state = ?2, messages = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![
                row.id,
                row.state.as_str(),
                row.messages,
                row.updated_at.to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportRow".to_string(),
                id: row.id.clone(),
            });
        }
        Ok(())
    }

    async fn update_job_state(
        &self,
        job_id: &str,
        state: ImportState,
        messages: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE import_job
            SET state = ?2, messages = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![job_id, state.as_str(), messages, Utc::now().to_rfc3339()],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                id: job_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> ImportRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ImportRepositoryImpl::new(Arc::new(Mutex::new(conn)))
    }

    fn row_data(email: &str) -> RowData {
        vec![("email", email), ("first_name", "Ada")].into_iter().collect()
    }

    #[tokio::test]
    async fn test_insert_and_find_job_with_rows() {
        let repo = setup_repo();
        let job = ImportJob::new("customers", "customers.csv")
            .with_row(row_data("a@example.com"))
            .with_row(row_data("b@example.com"));

        repo.insert_job(&job).await.unwrap();

        let found = repo.find_job(&job.id).await.unwrap().expect("任务应存在");
        assert_eq!(found.import_type, "customers");
        assert_eq!(found.state, ImportState::Created);
        assert_eq!(found.rows.len(), 2);
        assert_eq!(found.rows[1].data.get("email"), Some("b@example.com"));

        assert!(repo.find_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_and_update_rows() {
        let repo = setup_repo();
        let job = ImportJob::new("customers", "customers.csv").with_row(row_data("a@example.com"));
        repo.insert_job(&job).await.unwrap();

        let mut fresh = vec![
            ImportRow::new(&job.id, 0, row_data("x@example.com")),
            ImportRow::new(&job.id, 1, row_data("y@example.com")),
        ];
        assert_eq!(repo.replace_rows(&job.id, &fresh).await.unwrap(), 2);

        fresh[1].state = RowState::Failed;
        fresh[1].messages = Some("email 格式错误".to_string());
        repo.update_row(&fresh[1]).await.unwrap();

        let rows = repo.list_rows(&job.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].data.get("email"), Some("x@example.com"));
        assert_eq!(rows[1].state, RowState::Failed);
        assert_eq!(rows[1].messages.as_deref(), Some("email 格式错误"));
    }

    #[tokio::test]
    async fn test_update_job_state_missing_job() {
        let repo = setup_repo();
        let result = repo
            .update_job_state("missing", ImportState::Failed, Some("x"))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }
}
