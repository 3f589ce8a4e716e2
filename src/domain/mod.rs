// ==========================================
// 商品目录导入系统 - 领域模型层
// ==========================================
// 职责: 定义导入任务、行、目录实体与枚举类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod import_job;
pub mod log_entry;
pub mod types;

// 重导出核心类型
pub use catalog::{
    Customer, LineItem, NewAddress, NewCustomer, NewOrder, Order, Product, ProductUpsert,
    ShippingCategory, Store, Upserted, Variant,
};
pub use import_job::{EntityChange, ImportJob, ImportRow, ProcessReport, RowData, RowOutcome};
pub use log_entry::ImportLogEntry;
pub use types::{EntityKind, ImportState, ImportType, LogAction, RowCommitPolicy, RowState};
