// ==========================================
// 商品目录导入系统 - 导入任务 Repository Trait
// ==========================================
// 职责: 定义导入任务/导入行数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::import_job::{ImportJob, ImportRow};
use crate::domain::types::ImportState;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportRepository Trait
// ==========================================
// 用途: 导入任务与行的持久化
// 实现者: ImportRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ImportRepository: Send + Sync {
    /// 插入导入任务（连同已附加的行）
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()>;

    /// 按 ID 加载导入任务（含按 ordinal 排序的行）
    ///
    /// # 返回
    /// - Ok(None): 任务不存在
    async fn find_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>>;

    /// 查询任务的全部行（按 ordinal 升序）
    async fn list_rows(&self, job_id: &str) -> RepositoryResult<Vec<ImportRow>>;

    /// 用新的行集合整体替换任务的行（事务化）
    ///
    /// # 返回
    /// - Ok(usize): 写入的行数
    async fn replace_rows(&self, job_id: &str, rows: &[ImportRow]) -> RepositoryResult<usize>;

    /// 回写单行状态与诊断信息
    async fn update_row(&self, row: &ImportRow) -> RepositoryResult<()>;

    /// 更新任务状态与结构性失败信息
    async fn update_job_state(
        &self,
        job_id: &str,
        state: ImportState,
        messages: Option<&str>,
    ) -> RepositoryResult<()>;
}
