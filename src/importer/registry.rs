// ==========================================
// 商品目录导入系统 - 导入类型注册表
// ==========================================
// 职责: 导入类型字符串 → 行处理策略
// 封闭集合: customers / products / orders（单数写法作为别名）
// ==========================================

use crate::domain::types::ImportType;
use crate::importer::error::{ImportError, ImportResult};

// ==========================================
// RowStage - 行处理阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStage {
    Customer,
    CustomerAddress,
    Product,
    Variants,
    ShippingCategory,
    Order,
    LineItem,
}

impl RowStage {
    /// SAVEPOINT 名称
    pub fn scope_name(&self) -> &'static str {
        match self {
            RowStage::Customer => "stage_customer",
            RowStage::CustomerAddress => "stage_customer_address",
            RowStage::Product => "stage_product",
            RowStage::Variants => "stage_variants",
            RowStage::ShippingCategory => "stage_shipping_category",
            RowStage::Order => "stage_order",
            RowStage::LineItem => "stage_line_item",
        }
    }
}

// ==========================================
// RowStrategy - 行处理策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStrategy {
    Customers,
    Products,
    Orders,
}

impl RowStrategy {
    /// 源文件必需列
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            RowStrategy::Customers => &["email"],
            RowStrategy::Products => &["handle"],
            RowStrategy::Orders => &["number"],
        }
    }

    /// 按执行顺序排列的处理阶段
    pub fn stages(&self) -> &'static [RowStage] {
        match self {
            RowStrategy::Customers => &[RowStage::Customer, RowStage::CustomerAddress],
            RowStrategy::Products => &[
                RowStage::Product,
                RowStage::Variants,
                RowStage::ShippingCategory,
            ],
            RowStrategy::Orders => &[RowStage::Order, RowStage::LineItem],
        }
    }
}

impl From<ImportType> for RowStrategy {
    fn from(import_type: ImportType) -> Self {
        match import_type {
            ImportType::Customers => RowStrategy::Customers,
            ImportType::Products => RowStrategy::Products,
            ImportType::Orders => RowStrategy::Orders,
        }
    }
}

// ==========================================
// EntityKindRegistry
// ==========================================
pub struct EntityKindRegistry;

impl EntityKindRegistry {
    /// 解析导入类型
    ///
    /// # 返回
    /// - Err(UnsupportedKind): 未注册的类型
    pub fn resolve(raw_kind: &str) -> ImportResult<RowStrategy> {
        raw_kind
            .parse::<ImportType>()
            .map(RowStrategy::from)
            .map_err(|_| ImportError::UnsupportedKind(raw_kind.to_string()))
    }

    /// 全部已注册类型
    pub fn supported() -> Vec<&'static str> {
        ImportType::all().iter().map(|t| t.as_str()).collect()
    }
}
