// ==========================================
// 商品目录导入系统 - 导入日志领域模型
// ==========================================
// 用途: 每个被访问的行写入一条审计记录（仅追加）
// 对齐: import_log_entry 表
// ==========================================

use crate::domain::import_job::{ImportRow, RowOutcome};
use crate::domain::types::{LogAction, RowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// ImportLogEntry - 行级审计日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub id: String,
    pub import_id: String,
    pub row_id: String,
    pub ordinal: usize,
    pub state: RowState,                 // 本次调用后的行状态
    pub action: LogAction,
    pub message: Option<String>,         // 失败诊断
    pub details_json: Option<JsonValue>, // 涉及实体列表
    pub created_at: DateTime<Utc>,
}

impl ImportLogEntry {
    /// 行处理后的日志记录
    pub fn processed(row: &ImportRow, outcome: &RowOutcome) -> Self {
        let details = if outcome.entities.is_empty() {
            None
        } else {
            serde_json::to_value(&outcome.entities).ok()
        };

        Self {
            id: Uuid::new_v4().to_string(),
            import_id: row.import_id.clone(),
            row_id: row.id.clone(),
            ordinal: row.ordinal,
            state: outcome.state,
            action: LogAction::Processed,
            message: outcome.message.clone(),
            details_json: details,
            created_at: Utc::now(),
        }
    }

    /// 已完成行被跳过时的日志记录
    pub fn skipped(row: &ImportRow) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            import_id: row.import_id.clone(),
            row_id: row.id.clone(),
            ordinal: row.ordinal,
            state: row.state,
            action: LogAction::Skipped,
            message: None,
            details_json: None,
            created_at: Utc::now(),
        }
    }
}
