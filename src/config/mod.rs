// ==========================================
// 商品目录导入系统 - 配置层
// ==========================================
// 职责: 导入引擎配置读取
// 存储: config_kv 表 / 内存配置
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod import_settings;

pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::ImportConfigReader;
pub use import_settings::ImportSettings;
