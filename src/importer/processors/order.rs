// ==========================================
// 商品目录导入系统 - 订单行处理
// ==========================================
// 阶段: Order → LineItem
// ==========================================

use crate::domain::catalog::NewOrder;
use crate::domain::types::EntityKind;
use crate::importer::error::RowError;
use crate::importer::processors::RowContext;
use crate::repository::catalog_repo::CatalogRepository;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 解析完成时间（RFC3339 / "YYYY-MM-DD HH:MM:SS" / "YYYY-MM-DD"，按 UTC）
fn parse_completed_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// 按 number upsert 订单
pub async fn order_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let number = ctx.fields.required("number")?.to_string();
    let email = ctx.fields.required("email")?.to_lowercase();

    let store_code = match ctx.fields.optional("store") {
        Some(code) => code.to_string(),
        None => ctx
            .defaults
            .default_store_code
            .clone()
            .ok_or_else(|| RowError::missing("store"))?,
    };
    let store = catalog
        .find_store_by_code(&store_code)
        .await?
        .ok_or_else(|| RowError::unresolved("store", &store_code))?;

    let currency = ctx
        .fields
        .optional("currency")
        .map(str::to_uppercase)
        .unwrap_or_else(|| ctx.defaults.default_currency.clone());

    let completed_at = match ctx.fields.optional("completed_at") {
        Some(raw) => Some(parse_completed_at(raw).ok_or_else(|| {
            RowError::validation("completed_at", format!("无法解析时间 '{}'", raw))
        })?),
        None => None,
    };

    let order = NewOrder {
        number,
        email,
        store_id: store.id,
        currency,
        completed_at,
    };

    let upserted = catalog.upsert_order(&order).await?;
    ctx.record(EntityKind::Order, &upserted.id, upserted.created);
    ctx.order_id = Some(upserted.id);
    Ok(())
}

/// 订单明细（仅当 sku 存在）
pub async fn line_item_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let sku = match ctx.fields.optional("sku") {
        Some(sku) => sku,
        None => return Ok(()),
    };

    let variant = catalog
        .find_variant_by_sku(sku)
        .await?
        .ok_or_else(|| RowError::unresolved("sku", sku))?;

    let quantity = ctx.fields.positive_int_or("quantity", 1)?;
    let price_cents = ctx.fields.cents("price")?.unwrap_or(variant.price_cents);

    let order_id = ctx
        .order_id
        .clone()
        .ok_or_else(|| RowError::validation("sku", "明细缺少所属订单"))?;

    let upserted = catalog
        .upsert_line_item(&order_id, &variant.id, quantity, price_cents)
        .await?;
    ctx.record(EntityKind::LineItem, &upserted.id, upserted.created);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completed_at_formats() {
        assert!(parse_completed_at("2024-03-01T10:00:00+08:00").is_some());
        assert!(parse_completed_at("2024-03-01 10:00:00").is_some());
        assert_eq!(
            parse_completed_at("2024-03-01").map(|d| d.to_rfc3339()),
            Some("2024-03-01T00:00:00+00:00".to_string())
        );
        assert!(parse_completed_at("yesterday").is_none());
    }
}
