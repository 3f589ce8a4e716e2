// ==========================================
// 商品目录导入系统 - 应用层
// ==========================================
// 职责: 宿主进程装配（共享连接 + 仓储 + 控制器）
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
