// ==========================================
// 商品目录导入系统 - 导入任务控制器
// ==========================================
// 职责: 驱动一次导入任务的处理
// 流程: 完成态守卫 → 解析类型 → (按需)扫描源文件 → 逐行处理 → 汇总任务状态
// 红线:
// - 已完成行永不重复处理
// - 行失败不中止循环，只有结构性/配置/存储错误中止
// - 每个被处理的行恰好输出一条日志
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import_job::{ImportJob, ImportRow, ProcessReport, RowData};
use crate::domain::log_entry::ImportLogEntry;
use crate::domain::types::{ImportState, RowState};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::outcome_logger::OutcomeLogger;
use crate::importer::processors::RowDefaults;
use crate::importer::registry::{EntityKindRegistry, RowStrategy};
use crate::importer::row_processor::{ProcessRow, RowProcessor};
use crate::importer::row_reader::{CsvRowReader, RowReader};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::import_repo::ImportRepository;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// ProcessOptions
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// 即使任务已有行也重新解析源文件
    pub force_scan: bool,
}

impl ProcessOptions {
    pub fn force_scan() -> Self {
        Self { force_scan: true }
    }
}

// ==========================================
// ProcessImport - 导入任务控制器
// ==========================================
pub struct ProcessImport<C>
where
    C: ImportConfigReader,
{
    import_repo: Arc<dyn ImportRepository>,
    catalog: Arc<dyn CatalogRepository>,
    config: C,
    logger: Arc<dyn OutcomeLogger>,

    // 可替换组件（未设置时按配置构造默认实现）
    row_reader: Option<Arc<dyn RowReader>>,
    row_processor: Option<Arc<dyn RowProcessor>>,
}

impl<C> ProcessImport<C>
where
    C: ImportConfigReader,
{
    pub fn new(
        import_repo: Arc<dyn ImportRepository>,
        catalog: Arc<dyn CatalogRepository>,
        config: C,
        logger: Arc<dyn OutcomeLogger>,
    ) -> Self {
        Self {
            import_repo,
            catalog,
            config,
            logger,
            row_reader: None,
            row_processor: None,
        }
    }

    /// 使用指定的源文件读取器（默认: 按配置分隔符的 CsvRowReader）
    pub fn with_row_reader(mut self, reader: Arc<dyn RowReader>) -> Self {
        self.row_reader = Some(reader);
        self
    }

    /// 使用指定的行处理器（默认: 按任务类型构造 ProcessRow）
    pub fn with_row_processor(mut self, processor: Arc<dyn RowProcessor>) -> Self {
        self.row_processor = Some(processor);
        self
    }

    /// 按任务 ID 加载并处理
    pub async fn process_by_id(
        &self,
        job_id: &str,
        options: ProcessOptions,
    ) -> ImportResult<ProcessReport> {
        let mut job = self
            .import_repo
            .find_job(job_id)
            .await?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;
        self.process(&mut job, options).await
    }

    /// 处理导入任务
    ///
    /// # 返回
    /// - Ok(ProcessReport): 本次调用汇总（任务可能为 completed 或 failed）
    /// - Err: 结构性错误（任务已标记 failed）、配置错误或存储错误
    #[instrument(skip(self, job), fields(job_id = %job.id, import_type = %job.import_type))]
    pub async fn process(
        &self,
        job: &mut ImportJob,
        options: ProcessOptions,
    ) -> ImportResult<ProcessReport> {
        let started = Instant::now();

        // 1. 完成态守卫
        if job.state == ImportState::Completed {
            info!("任务已完成，跳过处理");
            return Ok(self.report(job, false, 0, 0, started));
        }

        // 2. 解析导入类型
        let strategy = match EntityKindRegistry::resolve(&job.import_type) {
            Ok(strategy) => strategy,
            Err(err) => return Err(self.fail_job(job, err).await),
        };

        let policy = self.config.get_row_commit_policy().await?;
        let log_skipped = self.config.get_log_skipped_rows().await?;

        // 3. 按需扫描源文件
        let scanned = options.force_scan || job.rows.is_empty();
        if scanned {
            let records = match self.scan(job, strategy).await {
                Ok(records) => records,
                Err(err) if err.is_structural() => return Err(self.fail_job(job, err).await),
                Err(err) => return Err(err),
            };
            let rows = reconcile_rows(job, records);
            self.import_repo.replace_rows(&job.id, &rows).await?;
            info!(rows = rows.len(), force_scan = options.force_scan, "源文件扫描完成");
            job.rows = rows;
        }

        // 4. 逐行处理
        let processor: Arc<dyn RowProcessor> = match &self.row_processor {
            Some(processor) => processor.clone(),
            None => Arc::new(ProcessRow::new(
                strategy,
                self.catalog.clone(),
                policy,
                RowDefaults {
                    default_store_code: self.config.get_default_store_code().await?,
                    default_currency: self.config.get_default_currency().await?,
                },
            )),
        };

        let mut visited = 0;
        let mut skipped = 0;
        for row in job.rows.iter_mut() {
            if row.state == RowState::Completed {
                skipped += 1;
                if log_skipped {
                    self.emit(&ImportLogEntry::skipped(row));
                }
                continue;
            }

            let outcome = processor.process(row).await;
            visited += 1;

            row.apply_outcome(&outcome);
            self.import_repo.update_row(row).await?;
            self.emit(&ImportLogEntry::processed(row, &outcome));

            debug!(ordinal = row.ordinal, state = %row.state, "行已回写");
        }

        // 5. 汇总任务状态
        let state = if job.all_rows_completed() {
            ImportState::Completed
        } else {
            ImportState::Failed
        };
        job.state = state;
        job.messages = None;
        job.updated_at = Utc::now();
        self.import_repo
            .update_job_state(&job.id, state, None)
            .await?;

        let report = self.report(job, scanned, visited, skipped, started);
        info!(
            state = %report.state,
            rows_total = report.rows_total,
            rows_visited = report.rows_visited,
            rows_skipped = report.rows_skipped,
            rows_failed = report.rows_failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "导入任务处理结束"
        );
        Ok(report)
    }

    /// 解析源文件并校验必需列
    async fn scan(&self, job: &ImportJob, strategy: RowStrategy) -> ImportResult<Vec<RowData>> {
        let reader: Arc<dyn RowReader> = match &self.row_reader {
            Some(reader) => reader.clone(),
            None => Arc::new(CsvRowReader::new(self.config.get_csv_delimiter().await?)),
        };

        let table = reader.read(Path::new(&job.file_path))?;

        let missing = table.missing_columns(strategy.required_columns());
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }
        Ok(table.records)
    }

    /// 标记任务失败并返回原错误
    async fn fail_job(&self, job: &mut ImportJob, err: ImportError) -> ImportError {
        warn!(error = %err, "导入任务结构性失败");

        let message = err.to_string();
        job.state = ImportState::Failed;
        job.messages = Some(message.clone());
        job.updated_at = Utc::now();

        if let Err(repo_err) = self
            .import_repo
            .update_job_state(&job.id, ImportState::Failed, Some(&message))
            .await
        {
            warn!(error = %repo_err, "任务失败状态写入失败");
        }
        err
    }

    /// 写日志（失败不中止任务）
    fn emit(&self, entry: &ImportLogEntry) {
        if let Err(err) = self.logger.log(entry) {
            warn!(ordinal = entry.ordinal, error = %err, "导入日志写入失败");
        }
    }

    fn report(
        &self,
        job: &ImportJob,
        scanned: bool,
        visited: usize,
        skipped: usize,
        started: Instant,
    ) -> ProcessReport {
        ProcessReport {
            job_id: job.id.clone(),
            state: job.state,
            scanned,
            rows_total: job.rows.len(),
            rows_visited: visited,
            rows_skipped: skipped,
            rows_completed: job.count_rows(RowState::Completed),
            rows_failed: job.count_rows(RowState::Failed),
            elapsed: started.elapsed(),
        }
    }
}

/// 扫描结果 → 任务行
///
/// 序号与数据均未变化的已完成行保留原行（ID + completed 状态），其余按 created 重建。
fn reconcile_rows(job: &ImportJob, records: Vec<RowData>) -> Vec<ImportRow> {
    records
        .into_iter()
        .enumerate()
        .map(|(ordinal, data)| {
            job.rows
                .iter()
                .find(|r| r.ordinal == ordinal && r.state == RowState::Completed && r.data == data)
                .cloned()
                .unwrap_or_else(|| ImportRow::new(&job.id, ordinal, data))
        })
        .collect()
}
