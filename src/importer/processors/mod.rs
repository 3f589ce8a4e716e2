// ==========================================
// 商品目录导入系统 - 行处理阶段实现
// ==========================================
// 职责: 各导入类型的分阶段写入逻辑
// 约定:
// - 阶段函数只通过 CatalogRepository 读写
// - 阶段不适用（如无 address1）时直接返回 Ok
// - 事务边界由 ProcessRow 控制
// ==========================================

pub mod customer;
pub mod order;
pub mod product;

use crate::domain::import_job::{EntityChange, RowData};
use crate::domain::types::EntityKind;
use crate::importer::error::RowError;
use crate::importer::field_reader::FieldReader;
use crate::importer::registry::RowStage;
use crate::repository::catalog_repo::CatalogRepository;

/// 订单阶段使用的默认值（来自配置）
#[derive(Debug, Clone)]
pub struct RowDefaults {
    pub default_store_code: Option<String>,
    pub default_currency: String,
}

impl Default for RowDefaults {
    fn default() -> Self {
        Self {
            default_store_code: None,
            default_currency: "USD".to_string(),
        }
    }
}

// ==========================================
// RowContext - 单行处理上下文
// ==========================================
// 在阶段之间传递已解析的实体 ID
pub struct RowContext<'a> {
    pub fields: FieldReader<'a>,
    pub defaults: &'a RowDefaults,
    pub entities: Vec<EntityChange>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
}

impl<'a> RowContext<'a> {
    pub fn new(data: &'a RowData, defaults: &'a RowDefaults) -> Self {
        Self {
            fields: FieldReader::new(data),
            defaults,
            entities: Vec::new(),
            customer_id: None,
            product_id: None,
            order_id: None,
        }
    }

    pub fn record(&mut self, kind: EntityKind, id: &str, created: bool) {
        self.entities.push(EntityChange {
            kind,
            id: id.to_string(),
            created,
        });
    }
}

/// 执行单个阶段
pub async fn run_stage(
    stage: RowStage,
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    match stage {
        RowStage::Customer => customer::customer_stage(catalog, ctx).await,
        RowStage::CustomerAddress => customer::address_stage(catalog, ctx).await,
        RowStage::Product => product::product_stage(catalog, ctx).await,
        RowStage::Variants => product::variants_stage(catalog, ctx).await,
        RowStage::ShippingCategory => product::shipping_category_stage(catalog, ctx).await,
        RowStage::Order => order::order_stage(catalog, ctx).await,
        RowStage::LineItem => order::line_item_stage(catalog, ctx).await,
    }
}
