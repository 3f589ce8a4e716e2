// ==========================================
// 商品目录导入系统 - 目录领域模型
// ==========================================
// 职责: 行处理策略写入的领域实体（客户/商品/规格/订单）
// 说明: 仅保留导入所需字段，完整模型属于宿主系统
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Customer - 客户
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: String, // 唯一
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub accepts_marketing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 客户写入参数（按 email upsert）
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub accepts_marketing: bool,
}

/// 客户地址写入参数
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub zipcode: Option<String>,
    pub country_code: String,
    pub phone: Option<String>,
}

// ==========================================
// ShippingCategory / Store - 引用数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub code: String,
    pub name: String,
    pub default_currency: String,
}

// ==========================================
// Product / Variant - 商品与规格
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub slug: String, // 唯一（源列 handle）
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub shipping_category_id: Option<String>,
}

/// 商品写入参数（按 slug upsert；None 字段在更新时保留原值）
#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub sku: String, // 唯一
    pub price_cents: i64,
}

// ==========================================
// Order / LineItem - 订单与明细
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub number: String, // 唯一
    pub email: String,
    pub store_id: String,
    pub currency: String,
    pub item_total_cents: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 订单写入参数（按 number upsert）
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number: String,
    pub email: String,
    pub store_id: String,
    pub currency: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub order_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub price_cents: i64,
}

// ==========================================
// Upserted - upsert 结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub id: String,
    pub created: bool,
}

impl Upserted {
    pub fn created(id: String) -> Self {
        Self { id, created: true }
    }

    pub fn updated(id: String) -> Self {
        Self { id, created: false }
    }
}
