// ==========================================
// 商品目录导入系统 - 商品行处理
// ==========================================
// 阶段: Product → Variants → ShippingCategory
// 说明: 运费类别最后分配，分阶段提交时前序写入可独立保留
// ==========================================

use crate::domain::catalog::ProductUpsert;
use crate::domain::types::EntityKind;
use crate::importer::error::RowError;
use crate::importer::processors::RowContext;
use crate::repository::catalog_repo::CatalogRepository;

/// 按 slug（源列 handle）upsert 商品
pub async fn product_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let slug = ctx.fields.required("handle")?.to_string();
    let existing = catalog.find_product_by_slug(&slug).await?;

    let name = ctx.fields.optional_string("title");
    let price_cents = ctx.fields.cents("price")?;

    if existing.is_none() {
        if name.is_none() {
            return Err(RowError::missing("title"));
        }
        if price_cents.is_none() {
            return Err(RowError::missing("price"));
        }
    }

    let upsert = ProductUpsert {
        slug,
        name,
        description: ctx.fields.optional_string("body"),
        price_cents,
    };

    let upserted = catalog.upsert_product(&upsert).await?;
    ctx.record(EntityKind::Product, &upserted.id, upserted.created);
    ctx.product_id = Some(upserted.id);
    Ok(())
}

/// 规格（variant_skus 以分号分隔，价格取行价格或商品价格）
pub async fn variants_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let skus = ctx.fields.list("variant_skus");
    if skus.is_empty() {
        return Ok(());
    }

    let product_id = ctx
        .product_id
        .clone()
        .ok_or_else(|| RowError::validation("variant_skus", "规格缺少所属商品"))?;

    let price_cents = match ctx.fields.cents("price")? {
        Some(price) => price,
        None => {
            let handle = ctx.fields.required("handle")?;
            catalog
                .find_product_by_slug(handle)
                .await?
                .map(|p| p.price_cents)
                .ok_or_else(|| RowError::unresolved("handle", handle))?
        }
    };

    for sku in skus {
        if let Some(variant) = catalog.find_variant_by_sku(sku).await? {
            if variant.product_id != product_id {
                return Err(RowError::validation(
                    "variant_skus",
                    format!("SKU '{}' 已属于其他商品", sku),
                ));
            }
        }
        let upserted = catalog.upsert_variant(&product_id, sku, price_cents).await?;
        ctx.record(EntityKind::Variant, &upserted.id, upserted.created);
    }
    Ok(())
}

/// 运费类别（必填且必须存在）
pub async fn shipping_category_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let name = ctx.fields.required("shipping_category")?;
    let category = catalog
        .find_shipping_category_by_name(name)
        .await?
        .ok_or_else(|| RowError::unresolved("shipping_category", name))?;

    let product_id = ctx
        .product_id
        .clone()
        .ok_or_else(|| RowError::validation("shipping_category", "运费类别缺少所属商品"))?;

    catalog
        .set_product_shipping_category(&product_id, &category.id)
        .await?;
    Ok(())
}
