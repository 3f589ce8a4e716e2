// ==========================================
// 商品目录导入系统 - 行处理器
// ==========================================
// 职责: 按策略执行行处理阶段，并控制事务边界
// 红线: process 永不返回错误，所有失败折叠为 RowOutcome::failed
// 提交策略:
// - PerStage: 每阶段一个 SAVEPOINT，失败阶段回滚，已完成阶段保留
// - Atomic: 整行一个 SAVEPOINT，任一阶段失败整行回滚
// ==========================================

use crate::domain::import_job::{ImportRow, RowOutcome};
use crate::domain::types::RowCommitPolicy;
use crate::importer::error::RowError;
use crate::importer::processors::{run_stage, RowContext, RowDefaults};
use crate::importer::registry::{RowStage, RowStrategy};
use crate::repository::catalog_repo::CatalogRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const ROW_SCOPE: &str = "import_row";

// ==========================================
// RowProcessor Trait
// ==========================================
#[async_trait]
pub trait RowProcessor: Send + Sync {
    /// 处理单行，返回结果（不修改 row）
    async fn process(&self, row: &ImportRow) -> RowOutcome;
}

// ==========================================
// ProcessRow - 基于目录仓储的行处理器
// ==========================================
pub struct ProcessRow {
    strategy: RowStrategy,
    catalog: Arc<dyn CatalogRepository>,
    policy: RowCommitPolicy,
    defaults: RowDefaults,
}

impl ProcessRow {
    pub fn new(
        strategy: RowStrategy,
        catalog: Arc<dyn CatalogRepository>,
        policy: RowCommitPolicy,
        defaults: RowDefaults,
    ) -> Self {
        Self {
            strategy,
            catalog,
            policy,
            defaults,
        }
    }

    /// 在独立 SAVEPOINT 中执行单个阶段
    async fn run_scoped_stage(
        &self,
        stage: RowStage,
        ctx: &mut RowContext<'_>,
    ) -> Result<(), RowError> {
        let scope = stage.scope_name();
        self.catalog.begin_scope(scope).await?;

        let recorded = ctx.entities.len();
        let result = match run_stage(stage, self.catalog.as_ref(), ctx).await {
            Ok(()) => self.release_or_rollback(scope).await,
            Err(err) => {
                self.rollback(scope).await;
                Err(err)
            }
        };
        if result.is_err() {
            ctx.entities.truncate(recorded);
        }
        result
    }

    /// 提交事务边界；提交失败时回滚，避免事务悬挂在连接上
    async fn release_or_rollback(&self, scope: &str) -> Result<(), RowError> {
        match self.catalog.release_scope(scope).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.rollback(scope).await;
                Err(err.into())
            }
        }
    }

    async fn rollback(&self, scope: &str) {
        if let Err(err) = self.catalog.rollback_scope(scope).await {
            warn!(scope, error = %err, "事务回滚失败");
        }
    }

    async fn process_per_stage(&self, ctx: &mut RowContext<'_>) -> Result<(), RowError> {
        for stage in self.strategy.stages() {
            self.run_scoped_stage(*stage, ctx).await?;
        }
        Ok(())
    }

    async fn process_atomic(&self, ctx: &mut RowContext<'_>) -> Result<(), RowError> {
        self.catalog.begin_scope(ROW_SCOPE).await?;

        let mut result = Ok(());
        for stage in self.strategy.stages() {
            if let Err(err) = run_stage(*stage, self.catalog.as_ref(), ctx).await {
                result = Err(err);
                break;
            }
        }

        let result = match result {
            Ok(()) => self.release_or_rollback(ROW_SCOPE).await,
            Err(err) => {
                self.rollback(ROW_SCOPE).await;
                Err(err)
            }
        };
        if result.is_err() {
            ctx.entities.clear();
        }
        result
    }
}

#[async_trait]
impl RowProcessor for ProcessRow {
    async fn process(&self, row: &ImportRow) -> RowOutcome {
        let mut ctx = RowContext::new(&row.data, &self.defaults);

        let result = match self.policy {
            RowCommitPolicy::PerStage => self.process_per_stage(&mut ctx).await,
            RowCommitPolicy::Atomic => self.process_atomic(&mut ctx).await,
        };

        match result {
            Ok(()) => {
                debug!(ordinal = row.ordinal, entities = ctx.entities.len(), "行处理完成");
                RowOutcome::completed(ctx.entities)
            }
            Err(err) => {
                debug!(ordinal = row.ordinal, error = %err, "行处理失败");
                RowOutcome::failed(err.to_string(), ctx.entities)
            }
        }
    }
}
