// ==========================================
// 商品目录导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + CSV
// 系统定位: 客户/商品/订单批量导入引擎（可恢复、行级容错）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 源文件解析与行处理
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 宿主辅助（默认路径等）
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ImportState, ImportType, RowCommitPolicy, RowState};

// 领域实体
pub use domain::{ImportJob, ImportLogEntry, ImportRow, ProcessReport, RowData, RowOutcome};

// 导入引擎
pub use importer::{
    CsvRowReader, EntityKindRegistry, ImportError, ImportResult, OutcomeLogger, ProcessImport,
    ProcessOptions, ProcessRow, RowProcessor, RowReader, SqliteOutcomeLogger,
    TracingOutcomeLogger,
};

// 配置
pub use config::{ConfigManager, ImportConfigReader, ImportSettings};

// 仓储
pub use repository::{
    CatalogRepository, CatalogRepositoryImpl, ImportLogRepository, ImportRepository,
    ImportRepositoryImpl,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "商品目录导入系统";
