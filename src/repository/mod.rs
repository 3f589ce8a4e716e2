// ==========================================
// 商品目录导入系统 - 数据仓储层
// ==========================================
// 职责: 数据访问抽象，不含业务逻辑
// ==========================================

pub mod catalog_repo;
pub mod catalog_repo_impl;
pub mod error;
pub mod import_repo;
pub mod import_repo_impl;
pub mod log_entry_repo;

pub use catalog_repo::{CatalogRepository, CatalogTable};
pub use catalog_repo_impl::CatalogRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use import_repo::ImportRepository;
pub use import_repo_impl::ImportRepositoryImpl;
pub use log_entry_repo::ImportLogRepository;
