// ==========================================
// 商品目录导入系统 - 导入任务领域模型
// ==========================================
// 职责: ImportJob / ImportRow / RowOutcome / ProcessReport
// 对齐: import_job / import_row 表
// ==========================================

use crate::domain::types::{EntityKind, ImportState, RowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

// ==========================================
// ImportJob - 导入任务
// ==========================================
// 由外部创建（state = created），仅由 ProcessImport 修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: String,
    pub import_type: String,       // 原始类型字符串（未知值在注册表解析时拒绝）
    pub file_path: String,         // 源文件路径
    pub state: ImportState,
    pub messages: Option<String>,  // 结构性失败描述
    pub rows: Vec<ImportRow>,      // 按 ordinal 排序
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// 创建新的导入任务（state = created, 无行）
    pub fn new(import_type: impl Into<String>, file_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            import_type: import_type.into(),
            file_path: file_path.into(),
            state: ImportState::Created,
            messages: None,
            rows: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 附加一行（预置行场景）
    pub fn with_row(mut self, data: RowData) -> Self {
        let ordinal = self.rows.len();
        self.rows.push(ImportRow::new(&self.id, ordinal, data));
        self
    }

    /// 全部行已完成
    pub fn all_rows_completed(&self) -> bool {
        self.rows.iter().all(|r| r.state == RowState::Completed)
    }

    pub fn count_rows(&self, state: RowState) -> usize {
        self.rows.iter().filter(|r| r.state == state).count()
    }
}

// ==========================================
// ImportRow - 导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub id: String,
    pub import_id: String,
    pub ordinal: usize,            // 源文件中的顺序（0 起）
    pub data: RowData,
    pub state: RowState,
    pub messages: Option<String>,  // 失败诊断信息
    pub updated_at: DateTime<Utc>,
}

impl ImportRow {
    pub fn new(import_id: &str, ordinal: usize, data: RowData) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            import_id: import_id.to_string(),
            ordinal,
            data,
            state: RowState::Created,
            messages: None,
            updated_at: Utc::now(),
        }
    }

    /// 回写行处理结果
    pub fn apply_outcome(&mut self, outcome: &RowOutcome) {
        self.state = outcome.state;
        self.messages = outcome.message.clone();
        self.updated_at = Utc::now();
    }
}

// ==========================================
// RowData - 有序字段集（列名 → 值）
// ==========================================
// 依赖 serde_json preserve_order，保持源文件列顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowData(Map<String, Value>);

impl RowData {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), Value::String(value.into()));
    }

    /// 读取字段值（非字符串值按 JSON 文本返回 None）
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(|v| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RowData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = RowData::new();
        for (k, v) in iter {
            data.insert(k, v);
        }
        data
    }
}

// ==========================================
// EntityChange - 行处理涉及的领域实体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChange {
    pub kind: EntityKind,
    pub id: String,
    pub created: bool, // true=新建, false=更新
}

// ==========================================
// RowOutcome - 行处理结果（瞬态）
// ==========================================
// 不变式: message 当且仅当 state = failed 时存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub state: RowState,
    pub message: Option<String>,
    pub entities: Vec<EntityChange>,
}

impl RowOutcome {
    pub fn completed(entities: Vec<EntityChange>) -> Self {
        Self {
            state: RowState::Completed,
            message: None,
            entities,
        }
    }

    pub fn failed(message: impl Into<String>, entities: Vec<EntityChange>) -> Self {
        Self {
            state: RowState::Failed,
            message: Some(message.into()),
            entities,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == RowState::Completed
    }
}

// ==========================================
// ProcessReport - 单次 process 调用汇总
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub job_id: String,
    pub state: ImportState,
    pub scanned: bool,        // 本次是否重新解析源文件
    pub rows_total: usize,
    pub rows_visited: usize,  // 实际调用行处理器的行数
    pub rows_skipped: usize,  // 已完成而跳过的行数
    pub rows_completed: usize,
    pub rows_failed: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}
