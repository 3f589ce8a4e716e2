// ==========================================
// 商品目录导入系统 - 行结果日志
// ==========================================
// 职责: 每个被访问的行输出一条审计记录
// 实现:
// - SqliteOutcomeLogger: 写入 import_log_entry 表
// - TracingOutcomeLogger: 输出到 tracing
// ==========================================

use crate::domain::log_entry::ImportLogEntry;
use crate::domain::types::RowState;
use crate::repository::error::RepositoryResult;
use crate::repository::log_entry_repo::ImportLogRepository;
use tracing::{info, warn};

// ==========================================
// OutcomeLogger Trait
// ==========================================
pub trait OutcomeLogger: Send + Sync {
    fn log(&self, entry: &ImportLogEntry) -> RepositoryResult<()>;
}

// ==========================================
// SqliteOutcomeLogger
// ==========================================
pub struct SqliteOutcomeLogger {
    repo: ImportLogRepository,
}

impl SqliteOutcomeLogger {
    pub fn new(repo: ImportLogRepository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &ImportLogRepository {
        &self.repo
    }
}

impl OutcomeLogger for SqliteOutcomeLogger {
    fn log(&self, entry: &ImportLogEntry) -> RepositoryResult<()> {
        self.repo.insert(entry)?;
        Ok(())
    }
}

// ==========================================
// TracingOutcomeLogger
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutcomeLogger;

impl OutcomeLogger for TracingOutcomeLogger {
    fn log(&self, entry: &ImportLogEntry) -> RepositoryResult<()> {
        match entry.state {
            RowState::Failed => warn!(
                import_id = %entry.import_id,
                ordinal = entry.ordinal,
                action = %entry.action,
                message = entry.message.as_deref().unwrap_or(""),
                "导入行失败"
            ),
            _ => info!(
                import_id = %entry.import_id,
                ordinal = entry.ordinal,
                action = %entry.action,
                state = %entry.state,
                "导入行"
            ),
        }
        Ok(())
    }
}
