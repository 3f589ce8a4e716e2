// ==========================================
// 商品目录导入系统 - 客户行处理
// ==========================================
// 阶段: Customer → CustomerAddress
// ==========================================

use crate::domain::catalog::{NewAddress, NewCustomer};
use crate::domain::types::EntityKind;
use crate::importer::error::RowError;
use crate::importer::processors::RowContext;
use crate::repository::catalog_repo::CatalogRepository;

/// 按 email upsert 客户
pub async fn customer_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let email = ctx.fields.required("email")?.to_lowercase();
    if !email.contains('@') {
        return Err(RowError::validation("email", format!("格式无效 '{}'", email)));
    }

    let customer = NewCustomer {
        email,
        first_name: ctx.fields.optional_string("first_name"),
        last_name: ctx.fields.optional_string("last_name"),
        accepts_marketing: ctx.fields.bool_or("accepts_marketing", false)?,
    };

    let upserted = catalog.upsert_customer(&customer).await?;
    ctx.record(EntityKind::Customer, &upserted.id, upserted.created);
    ctx.customer_id = Some(upserted.id);
    Ok(())
}

/// 客户地址（仅当 address1 存在）
pub async fn address_stage(
    catalog: &dyn CatalogRepository,
    ctx: &mut RowContext<'_>,
) -> Result<(), RowError> {
    let address1 = match ctx.fields.optional("address1") {
        Some(v) => v.to_string(),
        None => return Ok(()),
    };

    let customer_id = ctx
        .customer_id
        .clone()
        .ok_or_else(|| RowError::validation("address1", "地址缺少所属客户"))?;

    let address = NewAddress {
        address1,
        address2: ctx.fields.optional_string("address2"),
        city: ctx.fields.required("city")?.to_string(),
        zipcode: ctx.fields.optional_string("zipcode"),
        country_code: ctx.fields.required("country_code")?.to_uppercase(),
        phone: ctx.fields.optional_string("phone"),
    };

    let upserted = catalog.upsert_customer_address(&customer_id, &address).await?;
    ctx.record(EntityKind::CustomerAddress, &upserted.id, upserted.created);
    Ok(())
}
