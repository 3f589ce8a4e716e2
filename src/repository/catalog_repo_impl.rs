// ==========================================
// 商品目录导入系统 - 目录 Repository 实现
// ==========================================
// 职责: 实现目录实体读写（使用 rusqlite）
// 事务: 最外层 scope 使用 BEGIN IMMEDIATE（先拿写锁，避免多连接并发时
//       读锁升级失败直接返回 SQLITE_BUSY），内层 scope 使用 SAVEPOINT
// ==========================================

use crate::domain::catalog::{
    Customer, NewAddress, NewCustomer, NewOrder, Order, Product, ProductUpsert, ShippingCategory,
    Store, Upserted, Variant,
};
use crate::repository::catalog_repo::{CatalogRepository, CatalogTable};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_repo_impl::parse_ts;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// SAVEPOINT 名称只允许字母/数字/下划线
fn checked_scope_name(name: &str) -> RepositoryResult<&str> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(RepositoryError::FieldValueError {
            field: "scope".to_string(),
            message: format!("非法的事务边界名称: {}", name),
        })
    }
}

// ==========================================
// CatalogRepositoryImpl
// ==========================================
pub struct CatalogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
    // 持有最外层事务的 scope 名称
    outer_scope: Mutex<Option<String>>,
}

impl CatalogRepositoryImpl {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            outer_scope: Mutex::new(None),
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn get_outer_scope(&self) -> RepositoryResult<MutexGuard<'_, Option<String>>> {
        self.outer_scope
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_variant(conn: &Connection, sku: &str) -> RepositoryResult<Option<Variant>> {
        let variant = conn
            .query_row(
                "SELECT id, product_id, sku, price_cents FROM variant WHERE sku = ?1",
                params![sku],
                |row| {
                    Ok(Variant {
                        id: row.get(0)?,
                        product_id: row.get(1)?,
                        sku: row.get(2)?,
                        price_cents: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(variant)
    }

    fn query_order(conn: &Connection, number: &str) -> RepositoryResult<Option<Order>> {
        let order = conn
            .query_row(
                r#"
                SELECT id, number, email, store_id, currency, item_total_cents, completed_at
                FROM orders WHERE number = ?1
                "#,
                params![number],
                |row| {
                    let completed_at: Option<String> = row.get(6)?;
                    Ok(Order {
                        id: row.get(0)?,
                        number: row.get(1)?,
                        email: row.get(2)?,
                        store_id: row.get(3)?,
                        currency: row.get(4)?,
                        item_total_cents: row.get(5)?,
                        completed_at: completed_at.as_deref().map(parse_ts),
                    })
                },
            )
            .optional()?;
        Ok(order)
    }
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    // ===== 事务边界 =====

    async fn begin_scope(&self, name: &str) -> RepositoryResult<()> {
        let name = checked_scope_name(name)?;
        let conn = self.get_conn()?;
        let mut outer = self.get_outer_scope()?;

        if conn.is_autocommit() {
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            *outer = Some(name.to_string());
            return Ok(());
        }

        conn.execute_batch(&format!("SAVEPOINT {}", name))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    async fn release_scope(&self, name: &str) -> RepositoryResult<()> {
        let name = checked_scope_name(name)?;
        let conn = self.get_conn()?;
        let mut outer = self.get_outer_scope()?;

        if outer.as_deref() == Some(name) {
            // COMMIT 失败时事务仍然打开，outer 保留，由 rollback_scope 收尾
            conn.execute_batch("COMMIT")
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            *outer = None;
            return Ok(());
        }

        conn.execute_batch(&format!("RELEASE SAVEPOINT {}", name))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    async fn rollback_scope(&self, name: &str) -> RepositoryResult<()> {
        let name = checked_scope_name(name)?;
        let conn = self.get_conn()?;
        let mut outer = self.get_outer_scope()?;

        if outer.as_deref() == Some(name) {
            *outer = None;
            if conn.is_autocommit() {
                return Ok(());
            }
            return conn
                .execute_batch("ROLLBACK")
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()));
        }

        // ROLLBACK TO 不会关闭 savepoint，需要再 RELEASE
        conn.execute_batch(&format!(
            "ROLLBACK TO SAVEPOINT {0}; RELEASE SAVEPOINT {0};",
            name
        ))
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    // ===== 客户 =====

    async fn find_customer_by_email(&self, email: &str) -> RepositoryResult<Option<Customer>> {
        let conn = self.get_conn()?;
        let customer = conn
            .query_row(
                r#"
                SELECT id, email, first_name, last_name, accepts_marketing, created_at, updated_at
                FROM customer WHERE email = ?1
                "#,
                params![email],
                |row| {
                    let created_at: String = row.get(5)?;
                    let updated_at: String = row.get(6)?;
                    Ok(Customer {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        accepts_marketing: row.get::<_, i64>(4)? != 0,
                        created_at: parse_ts(&created_at),
                        updated_at: parse_ts(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(customer)
    }

    async fn upsert_customer(&self, customer: &NewCustomer) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM customer WHERE email = ?1",
                params![customer.email],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    r#"
                    UPDATE customer
                    SET first_name = COALESCE(?2, first_name),
                        last_name = COALESCE(?3, last_name),
                        accepts_marketing = ?4,
                        updated_at = ?5
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        customer.first_name,
                        customer.last_name,
                        customer.accepts_marketing as i32,
                        now,
                    ],
                )?;
                Ok(Upserted::updated(id))
            }
            None => {
                let id = new_id();
                conn.execute(
                    r#"
                    INSERT INTO customer (
                        id, email, first_name, last_name, accepts_marketing, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                    "#,
                    params![
                        id,
                        customer.email,
                        customer.first_name,
                        customer.last_name,
                        customer.accepts_marketing as i32,
                        now,
                    ],
                )?;
                Ok(Upserted::created(id))
            }
        }
    }

    async fn upsert_customer_address(
        &self,
        customer_id: &str,
        address: &NewAddress,
    ) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;

        let existing: Option<String> = conn
            .query_row(
                r#"
                SELECT id FROM customer_address
                WHERE customer_id = ?1 AND address1 = ?2 AND city = ?3 AND country_code = ?4
                "#,
                params![customer_id, address.address1, address.city, address.country_code],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    r#"
                    UPDATE customer_address
                    SET address2 = ?2, zipcode = ?3, phone = ?4
                    WHERE id = ?1
                    "#,
                    params![id, address.address2, address.zipcode, address.phone],
                )?;
                Ok(Upserted::updated(id))
            }
            None => {
                let id = new_id();
                conn.execute(
                    r#"
                    INSERT INTO customer_address (
                        id, customer_id, address1, address2, city, zipcode, country_code, phone
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        id,
                        customer_id,
                        address.address1,
                        address.address2,
                        address.city,
                        address.zipcode,
                        address.country_code,
                        address.phone,
                    ],
                )?;
                Ok(Upserted::created(id))
            }
        }
    }

    // ===== 商品 =====

    async fn find_product_by_slug(&self, slug: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let product = conn
            .query_row(
                r#"
                SELECT id, slug, name, description, price_cents, shipping_category_id
                FROM product WHERE slug = ?1
                "#,
                params![slug],
                |row| {
                    Ok(Product {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        price_cents: row.get(4)?,
                        shipping_category_id: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(product)
    }

    async fn upsert_product(&self, product: &ProductUpsert) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM product WHERE slug = ?1",
                params![product.slug],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    r#"
                    UPDATE product
                    SET name = COALESCE(?2, name),
                        description = COALESCE(?3, description),
                        price_cents = COALESCE(?4, price_cents),
                        updated_at = ?5
                    WHERE id = ?1
                    "#,
                    params![id, product.name, product.description, product.price_cents, now],
                )?;
                Ok(Upserted::updated(id))
            }
            None => {
                let (name, price_cents) = match (&product.name, product.price_cents) {
                    (Some(name), Some(price)) => (name.clone(), price),
                    _ => {
                        return Err(RepositoryError::FieldValueError {
                            field: "product".to_string(),
                            message: format!("新建商品 {} 缺少名称或价格", product.slug),
                        })
                    }
                };
                let id = new_id();
                conn.execute(
                    r#"
                    INSERT INTO product (
                        id, slug, name, description, price_cents, shipping_category_id,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)
                    "#,
                    params![id, product.slug, name, product.description, price_cents, now],
                )?;
                Ok(Upserted::created(id))
            }
        }
    }

    async fn find_variant_by_sku(&self, sku: &str) -> RepositoryResult<Option<Variant>> {
        let conn = self.get_conn()?;
        Self::query_variant(&conn, sku)
    }

    async fn upsert_variant(
        &self,
        product_id: &str,
        sku: &str,
        price_cents: i64,
    ) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;

        match Self::query_variant(&conn, sku)? {
            Some(variant) => {
                conn.execute(
                    "UPDATE variant SET price_cents = ?2 WHERE id = ?1",
                    params![variant.id, price_cents],
                )?;
                Ok(Upserted::updated(variant.id))
            }
            None => {
                let id = new_id();
                conn.execute(
                    "INSERT INTO variant (id, product_id, sku, price_cents) VALUES (?1, ?2, ?3, ?4)",
                    params![id, product_id, sku, price_cents],
                )?;
                Ok(Upserted::created(id))
            }
        }
    }

    async fn find_shipping_category_by_name(
        &self,
        name: &str,
    ) -> RepositoryResult<Option<ShippingCategory>> {
        let conn = self.get_conn()?;
        let category = conn
            .query_row(
                "SELECT id, name FROM shipping_category WHERE name = ?1",
                params![name],
                |row| {
                    Ok(ShippingCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    async fn set_product_shipping_category(
        &self,
        product_id: &str,
        shipping_category_id: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE product SET shipping_category_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![product_id, shipping_category_id, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            });
        }
        Ok(())
    }

    // ===== 订单 =====

    async fn find_store_by_code(&self, code: &str) -> RepositoryResult<Option<Store>> {
        let conn = self.get_conn()?;
        let store = conn
            .query_row(
                "SELECT id, code, name, default_currency FROM store WHERE code = ?1",
                params![code],
                |row| {
                    Ok(Store {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                        default_currency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(store)
    }

    async fn find_order_by_number(&self, number: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::query_order(&conn, number)
    }

    async fn upsert_order(&self, order: &NewOrder) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();
        let completed_at = order.completed_at.map(|dt| dt.to_rfc3339());

        match Self::query_order(&conn, &order.number)? {
            Some(existing) => {
                conn.execute(
                    r#"
                    UPDATE orders
                    SET email = ?2, store_id = ?3, currency = ?4,
                        completed_at = COALESCE(?5, completed_at), updated_at = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        existing.id,
                        order.email,
                        order.store_id,
                        order.currency,
                        completed_at,
                        now
                    ],
                )?;
                Ok(Upserted::updated(existing.id))
            }
            None => {
                let id = new_id();
                conn.execute(
                    r#"
                    INSERT INTO orders (
                        id, number, email, store_id, currency, item_total_cents,
                        completed_at, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?7)
                    "#,
                    params![
                        id,
                        order.number,
                        order.email,
                        order.store_id,
                        order.currency,
                        completed_at,
                        now
                    ],
                )?;
                Ok(Upserted::created(id))
            }
        }
    }

    async fn upsert_line_item(
        &self,
        order_id: &str,
        variant_id: &str,
        quantity: i64,
        price_cents: i64,
    ) -> RepositoryResult<Upserted> {
        let conn = self.get_conn()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM line_item WHERE order_id = ?1 AND variant_id = ?2",
                params![order_id, variant_id],
                |row| row.get(0),
            )
            .optional()?;

        let result = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE line_item SET quantity = ?2, price_cents = ?3 WHERE id = ?1",
                    params![id, quantity, price_cents],
                )?;
                Upserted::updated(id)
            }
            None => {
                let id = new_id();
                conn.execute(
                    r#"
                    INSERT INTO line_item (id, order_id, variant_id, quantity, price_cents)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![id, order_id, variant_id, quantity, price_cents],
                )?;
                Upserted::created(id)
            }
        };

        // 重算订单商品总额
        conn.execute(
            r#"
            UPDATE orders
            SET item_total_cents = (
                SELECT COALESCE(SUM(quantity * price_cents), 0)
                FROM line_item WHERE order_id = ?1
            ),
            updated_at = ?2
            WHERE id = ?1
            "#,
            params![order_id, Utc::now().to_rfc3339()],
        )?;

        Ok(result)
    }

    // ===== 引用数据维护 =====

    async fn create_shipping_category(&self, name: &str) -> RepositoryResult<ShippingCategory> {
        let conn = self.get_conn()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO shipping_category (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(ShippingCategory {
            id,
            name: name.to_string(),
        })
    }

    async fn create_store(&self, code: &str, name: &str, currency: &str) -> RepositoryResult<Store> {
        let conn = self.get_conn()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO store (id, code, name, default_currency) VALUES (?1, ?2, ?3, ?4)",
            params![id, code, name, currency],
        )?;
        Ok(Store {
            id,
            code: code.to_string(),
            name: name.to_string(),
            default_currency: currency.to_string(),
        })
    }

    // ===== 统计 =====

    async fn count(&self, table: CatalogTable) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> CatalogRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        CatalogRepositoryImpl::new(Arc::new(Mutex::new(conn)))
    }

    fn customer(email: &str, first_name: Option<&str>) -> NewCustomer {
        NewCustomer {
            email: email.to_string(),
            first_name: first_name.map(str::to_string),
            last_name: None,
            accepts_marketing: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_customer_by_email() {
        let repo = setup_repo();

        let first = repo.upsert_customer(&customer("ada@example.com", Some("Ada"))).await.unwrap();
        assert!(first.created);

        let second = repo.upsert_customer(&customer("ada@example.com", None)).await.unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let stored = repo.find_customer_by_email("ada@example.com").await.unwrap().unwrap();
        // None 字段不覆盖已有值
        assert_eq!(stored.first_name.as_deref(), Some("Ada"));
        assert_eq!(repo.count(CatalogTable::Customer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scope_rollback_discards_writes() {
        let repo = setup_repo();

        repo.begin_scope("import_row").await.unwrap();
        repo.upsert_customer(&customer("kept@example.com", None)).await.unwrap();

        repo.begin_scope("import_stage").await.unwrap();
        repo.upsert_customer(&customer("dropped@example.com", None)).await.unwrap();
        repo.rollback_scope("import_stage").await.unwrap();

        repo.release_scope("import_row").await.unwrap();

        assert!(repo.find_customer_by_email("kept@example.com").await.unwrap().is_some());
        assert!(repo.find_customer_by_email("dropped@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_outer_scope_rollback_ends_transaction() {
        let repo = setup_repo();

        repo.begin_scope("stage_customer").await.unwrap();
        repo.upsert_customer(&customer("dropped@example.com", None)).await.unwrap();
        repo.rollback_scope("stage_customer").await.unwrap();

        assert!(repo.get_conn().unwrap().is_autocommit());
        assert_eq!(repo.count(CatalogTable::Customer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outer_scope_holds_write_lock() {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let db_path = db_file.path().to_str().unwrap();
        let repo = CatalogRepositoryImpl::new(crate::db::open_shared_connection(db_path).unwrap());

        let other = crate::db::open_sqlite_connection(db_path).unwrap();
        other.busy_timeout(std::time::Duration::from_millis(0)).unwrap();

        repo.begin_scope("stage_customer").await.unwrap();
        // 写锁在 scope 开启时即已持有，而不是第一次写入时
        assert!(other.execute_batch("BEGIN IMMEDIATE").is_err());

        repo.upsert_customer(&customer("ada@example.com", None)).await.unwrap();
        repo.release_scope("stage_customer").await.unwrap();

        other.execute_batch("BEGIN IMMEDIATE; ROLLBACK;").unwrap();
        let visible: i64 = other
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))
            .unwrap();
        assert_eq!(visible, 1);
    }

    #[tokio::test]
    async fn test_invalid_scope_name_rejected() {
        let repo = setup_repo();
        assert!(repo.begin_scope("x; DROP TABLE customer").await.is_err());
    }

    #[tokio::test]
    async fn test_line_items_recalculate_order_total() {
        let repo = setup_repo();
        let store = repo.create_store("main", "Main Store", "USD").await.unwrap();
        let product = repo
            .upsert_product(&ProductUpsert {
                slug: "tee".to_string(),
                name: Some("Tee".to_string()),
                description: None,
                price_cents: Some(1500),
            })
            .await
            .unwrap();
        let variant = repo.upsert_variant(&product.id, "TEE-S", 1500).await.unwrap();

        let order = repo
            .upsert_order(&NewOrder {
                number: "R100".to_string(),
                email: "ada@example.com".to_string(),
                store_id: store.id.clone(),
                currency: "USD".to_string(),
                completed_at: None,
            })
            .await
            .unwrap();

        repo.upsert_line_item(&order.id, &variant.id, 2, 1500).await.unwrap();
        let again = repo.upsert_line_item(&order.id, &variant.id, 3, 1500).await.unwrap();
        assert!(!again.created);

        let stored = repo.find_order_by_number("R100").await.unwrap().unwrap();
        assert_eq!(stored.item_total_cents, 4500);
        assert_eq!(repo.count(CatalogTable::LineItem).await.unwrap(), 1);
    }
}
