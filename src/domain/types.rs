// ==========================================
// 商品目录导入系统 - 领域类型定义
// ==========================================
// 职责: 导入类型 / 任务状态 / 行状态 / 提交策略等枚举
// 序列化格式: 与数据库 TEXT 列保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入类型 (Import Type / Subject Kind)
// ==========================================
// 封闭集合: customers / products / orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    Customers, // 客户
    Products,  // 商品（含规格）
    Orders,    // 订单（含明细）
}

impl ImportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::Customers => "customers",
            ImportType::Products => "products",
            ImportType::Orders => "orders",
        }
    }

    /// 全部已知类型（按注册顺序）
    pub fn all() -> [ImportType; 3] {
        [ImportType::Customers, ImportType::Products, ImportType::Orders]
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = String;

    /// 接受复数与单数写法（customer / customers），大小写不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customers" | "customer" => Ok(ImportType::Customers),
            "products" | "product" => Ok(ImportType::Products),
            "orders" | "order" => Ok(ImportType::Orders),
            other => Err(other.to_string()),
        }
    }
}

// ==========================================
// 导入任务状态 (Import State)
// ==========================================
// created → completed | failed
// failed 任务可再次 process（仅重试未完成行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportState {
    Created,
    Completed,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::Created => "created",
            ImportState::Completed => "completed",
            ImportState::Failed => "failed",
        }
    }

    /// 从数据库字符串解析（未知值按 created 处理）
    pub fn from_db(raw: &str) -> Self {
        match raw.trim() {
            "completed" => ImportState::Completed,
            "failed" => ImportState::Failed,
            _ => ImportState::Created,
        }
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行状态 (Row State)
// ==========================================
// completed 行永不重复处理; failed 行可重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    Created,
    Completed,
    Failed,
}

impl RowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowState::Created => "created",
            RowState::Completed => "completed",
            RowState::Failed => "failed",
        }
    }

    pub fn from_db(raw: &str) -> Self {
        match raw.trim() {
            "completed" => RowState::Completed,
            "failed" => RowState::Failed,
            _ => RowState::Created,
        }
    }
}

impl fmt::Display for RowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 行提交策略 (Row Commit Policy)
// ==========================================
// PER_STAGE: 每个处理阶段独立事务，前序阶段的写入在后续失败时保留
// ATOMIC: 整行一个事务，任一阶段失败整行回滚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowCommitPolicy {
    #[default]
    PerStage,
    Atomic,
}

impl fmt::Display for RowCommitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowCommitPolicy::PerStage => write!(f, "PER_STAGE"),
            RowCommitPolicy::Atomic => write!(f, "ATOMIC"),
        }
    }
}

impl FromStr for RowCommitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PER_STAGE" => Ok(RowCommitPolicy::PerStage),
            "ATOMIC" => Ok(RowCommitPolicy::Atomic),
            other => Err(other.to_string()),
        }
    }
}

// ==========================================
// 日志动作 (Log Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAction {
    Processed, // 本次调用实际处理
    Skipped,   // 已完成行被跳过（需开启 log_skipped_rows）
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Processed => "PROCESSED",
            LogAction::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 实体类型 (Entity Kind) - 行处理产生的领域实体
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    CustomerAddress,
    Product,
    Variant,
    Order,
    LineItem,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Customer => "customer",
            EntityKind::CustomerAddress => "customer_address",
            EntityKind::Product => "product",
            EntityKind::Variant => "variant",
            EntityKind::Order => "order",
            EntityKind::LineItem => "line_item",
        };
        write!(f, "{}", s)
    }
}
