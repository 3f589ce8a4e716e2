// ==========================================
// 商品目录导入系统 - 导入日志仓储
// ==========================================
// 职责: import_log_entry 表的追加写入与查询
// 红线: 日志仅追加，不提供更新/删除
// ==========================================

use crate::domain::log_entry::ImportLogEntry;
use crate::domain::types::{LogAction, RowState};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_repo_impl::parse_ts;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

const INSERT_SQL: &str = r#"
    INSERT INTO import_log_entry (
        id, import_id, row_id, ordinal, state, action, message, details_json, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

// ==========================================
// ImportLogRepository - 导入日志仓储
// ==========================================
pub struct ImportLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入一条日志
    ///
    /// # 返回
    /// - `Ok(id)`: 日志 ID
    pub fn insert(&self, entry: &ImportLogEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            INSERT_SQL,
            params![
                entry.id,
                entry.import_id,
                entry.row_id,
                entry.ordinal as i64,
                entry.state.as_str(),
                entry.action.as_str(),
                entry.message,
                entry.details_json.as_ref().map(|v| v.to_string()),
                entry.created_at.to_rfc3339(),
            ],
        )?;

        Ok(entry.id.clone())
    }

    /// 查询任务的全部日志（按写入顺序）
    pub fn find_by_import(&self, import_id: &str) -> RepositoryResult<Vec<ImportLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, import_id, row_id, ordinal, state, action, message, details_json, created_at
            FROM import_log_entry
            WHERE import_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;

        let entries = stmt
            .query_map(params![import_id], |row| {
                let state: String = row.get(4)?;
                let action: String = row.get(5)?;
                let details: Option<String> = row.get(7)?;
                let created_at: String = row.get(8)?;
                Ok(ImportLogEntry {
                    id: row.get(0)?,
                    import_id: row.get(1)?,
                    row_id: row.get(2)?,
                    ordinal: row.get::<_, i64>(3)? as usize,
                    state: RowState::from_db(&state),
                    action: if action == LogAction::Skipped.as_str() {
                        LogAction::Skipped
                    } else {
                        LogAction::Processed
                    },
                    message: row.get(6)?,
                    details_json: details.and_then(|raw| serde_json::from_str(&raw).ok()),
                    created_at: parse_ts(&created_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// 统计任务的日志条数
    pub fn count_by_import(&self, import_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM import_log_entry WHERE import_id = ?1",
            params![import_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
