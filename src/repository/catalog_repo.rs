// ==========================================
// 商品目录导入系统 - 目录 Repository Trait
// ==========================================
// 职责: 行处理策略所需的领域实体读写 + 行级事务边界
// 红线: Repository 不含业务规则（校验/解析在 processors 中完成）
// ==========================================

use crate::domain::catalog::{
    Customer, NewAddress, NewCustomer, NewOrder, Order, Product, ProductUpsert, ShippingCategory,
    Store, Upserted, Variant,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CatalogRepository Trait
// ==========================================
// 实现者: CatalogRepositoryImpl（rusqlite, 事务边界使用 SAVEPOINT）
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ===== 事务边界 =====

    /// 开启命名事务边界（可嵌套）
    async fn begin_scope(&self, name: &str) -> RepositoryResult<()>;

    /// 提交命名事务边界
    async fn release_scope(&self, name: &str) -> RepositoryResult<()>;

    /// 回滚并关闭命名事务边界
    async fn rollback_scope(&self, name: &str) -> RepositoryResult<()>;

    // ===== 客户 =====

    async fn find_customer_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>>;

    /// 按 email upsert 客户
    async fn upsert_customer(&self, customer: &NewCustomer) -> RepositoryResult<Upserted>;

    /// 为客户添加地址（相同地址重复导入时返回已有记录）
    async fn upsert_customer_address(
        &self,
        customer_id: &str,
        address: &NewAddress,
    ) -> RepositoryResult<Upserted>;

    // ===== 商品 =====

    async fn find_product_by_slug(&self, slug: &str) -> RepositoryResult<Option<Product>>;

    /// 按 slug upsert 商品
    ///
    /// 说明: 新建时 name/price_cents 必须由调用方保证存在
    async fn upsert_product(&self, product: &ProductUpsert) -> RepositoryResult<Upserted>;

    async fn find_variant_by_sku(&self, sku: &str) -> RepositoryResult<Option<Variant>>;

    /// 按 sku upsert 规格（sku 已归属其他商品时由调用方拦截）
    async fn upsert_variant(
        &self,
        product_id: &str,
        sku: &str,
        price_cents: i64,
    ) -> RepositoryResult<Upserted>;

    async fn find_shipping_category_by_name(
        &self,
        name: &str,
    ) -> RepositoryResult<Option<ShippingCategory>>;

    async fn set_product_shipping_category(
        &self,
        product_id: &str,
        shipping_category_id: &str,
    ) -> RepositoryResult<()>;

    // ===== 订单 =====

    async fn find_store_by_code(&self, code: &str) -> RepositoryResult<Option<Store>>;

    async fn find_order_by_number(&self, number: &str) -> RepositoryResult<Option<Order>>;

    /// 按 number upsert 订单
    async fn upsert_order(&self, order: &NewOrder) -> RepositoryResult<Upserted>;

    /// 按 (order, variant) upsert 明细，并重算订单商品总额
    async fn upsert_line_item(
        &self,
        order_id: &str,
        variant_id: &str,
        quantity: i64,
        price_cents: i64,
    ) -> RepositoryResult<Upserted>;

    // ===== 引用数据维护（宿主/测试预置） =====

    async fn create_shipping_category(&self, name: &str) -> RepositoryResult<ShippingCategory>;

    async fn create_store(&self, code: &str, name: &str, currency: &str) -> RepositoryResult<Store>;

    // ===== 统计 =====

    /// 统计指定实体表记录数（customer/product/variant/orders/line_item/customer_address）
    async fn count(&self, table: CatalogTable) -> RepositoryResult<usize>;
}

// ==========================================
// CatalogTable - 可统计的目录表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogTable {
    Customer,
    CustomerAddress,
    Product,
    Variant,
    Order,
    LineItem,
}

impl CatalogTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            CatalogTable::Customer => "customer",
            CatalogTable::CustomerAddress => "customer_address",
            CatalogTable::Product => "product",
            CatalogTable::Variant => "variant",
            CatalogTable::Order => "orders",
            CatalogTable::LineItem => "line_item",
        }
    }
}
