// ==========================================
// 商品目录导入系统 - 应用状态
// ==========================================
// 职责: 基于单个数据库文件装配仓储、配置与导入控制器
// 说明: 每个 AppState 持有一条独立连接；并发处理多个任务时应各自创建
// ==========================================

use crate::config::ConfigManager;
use crate::db::{open_shared_connection, read_schema_version};
use crate::importer::outcome_logger::SqliteOutcomeLogger;
use crate::importer::process_import::ProcessImport;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    CatalogRepositoryImpl, ImportLogRepository, ImportRepositoryImpl,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 导入任务仓储
    pub import_repo: Arc<ImportRepositoryImpl>,

    /// 目录实体仓储
    pub catalog_repo: Arc<CatalogRepositoryImpl>,

    /// 导入日志仓储
    pub log_repo: Arc<ImportLogRepository>,

    /// 共享连接
    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// 打开（必要时创建）数据库并装配仓储
    pub fn new(db_path: String) -> RepositoryResult<Self> {
        tracing::info!(db_path = %db_path, "初始化 AppState");

        let conn = open_shared_connection(&db_path)?;

        Ok(Self {
            db_path,
            import_repo: Arc::new(ImportRepositoryImpl::new(conn.clone())),
            catalog_repo: Arc::new(CatalogRepositoryImpl::new(conn.clone())),
            log_repo: Arc::new(ImportLogRepository::new(conn.clone())),
            conn,
        })
    }

    /// 基于 config_kv 的配置管理器
    pub fn config_manager(&self) -> ConfigManager {
        ConfigManager::from_connection(self.conn.clone())
    }

    /// 当前数据库的 schema_version
    pub fn schema_version(&self) -> RepositoryResult<Option<i64>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(read_schema_version(&conn)?)
    }

    /// 装配导入控制器（配置来自 config_kv，日志写入 import_log_entry）
    pub fn process_import(&self) -> ProcessImport<ConfigManager> {
        ProcessImport::new(
            self.import_repo.clone(),
            self.catalog_repo.clone(),
            self.config_manager(),
            Arc::new(SqliteOutcomeLogger::new(ImportLogRepository::new(
                self.conn.clone(),
            ))),
        )
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 CATALOG_IMPORTER_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("CATALOG_IMPORTER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalog_importer.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("catalog-importer");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("catalog_importer.db");
        }
    }

    path.to_string_lossy().to_string()
}
