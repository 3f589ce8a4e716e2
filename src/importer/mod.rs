// ==========================================
// 商品目录导入系统 - 导入层
// ==========================================
// 职责: 表格源文件 → 导入行 → 目录实体
// 支持: CSV（客户 / 商品 / 订单）
// ==========================================

pub mod error;
pub mod field_reader;
pub mod outcome_logger;
pub mod process_import;
pub mod processors;
pub mod registry;
pub mod row_processor;
pub mod row_reader;

// 重导出核心类型
pub use error::{ImportError, ImportResult, RowError};
pub use outcome_logger::{OutcomeLogger, SqliteOutcomeLogger, TracingOutcomeLogger};
pub use process_import::{ProcessImport, ProcessOptions};
pub use processors::RowDefaults;
pub use registry::{EntityKindRegistry, RowStage, RowStrategy};
pub use row_processor::{ProcessRow, RowProcessor};
pub use row_reader::{CsvRowReader, ParsedTable, RowReader};
