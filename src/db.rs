// ==========================================
// 商品目录导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 统一建表入口，测试与宿主程序共用同一份 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开连接、建表，并包装为仓储共享的句柄
///
/// 说明：并发处理多个导入任务时，每个任务应使用独立连接（行事务基于 SAVEPOINT）。
pub fn open_shared_connection(db_path: &str) -> rusqlite::Result<Arc<Mutex<Connection>>> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化全部表结构（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        -- ===== 导入任务 =====
        CREATE TABLE IF NOT EXISTS import_job (
            id TEXT PRIMARY KEY,
            import_type TEXT NOT NULL,
            file_path TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'created',
            messages TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_row (
            id TEXT PRIMARY KEY,
            import_id TEXT NOT NULL REFERENCES import_job(id) ON DELETE CASCADE,
            ordinal INTEGER NOT NULL,
            data_json TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'created',
            messages TEXT,
            updated_at TEXT NOT NULL,
            UNIQUE(import_id, ordinal)
        );

        CREATE TABLE IF NOT EXISTS import_log_entry (
            id TEXT PRIMARY KEY,
            import_id TEXT NOT NULL,
            row_id TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            state TEXT NOT NULL,
            action TEXT NOT NULL,
            message TEXT,
            details_json TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_import_log_entry_import
            ON import_log_entry(import_id, created_at);

        -- ===== 目录实体 =====
        CREATE TABLE IF NOT EXISTS customer (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT,
            last_name TEXT,
            accepts_marketing INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS customer_address (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL REFERENCES customer(id) ON DELETE CASCADE,
            address1 TEXT NOT NULL,
            address2 TEXT,
            city TEXT NOT NULL,
            zipcode TEXT,
            country_code TEXT NOT NULL,
            phone TEXT,
            UNIQUE(customer_id, address1, city, country_code)
        );

        CREATE TABLE IF NOT EXISTS shipping_category (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS product (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            price_cents INTEGER NOT NULL,
            shipping_category_id TEXT REFERENCES shipping_category(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variant (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES product(id) ON DELETE CASCADE,
            sku TEXT NOT NULL UNIQUE,
            price_cents INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS store (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            default_currency TEXT NOT NULL DEFAULT 'USD'
        );

        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            number TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            store_id TEXT NOT NULL REFERENCES store(id),
            currency TEXT NOT NULL,
            item_total_cents INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS line_item (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            variant_id TEXT NOT NULL REFERENCES variant(id),
            quantity INTEGER NOT NULL,
            price_cents INTEGER NOT NULL,
            UNIQUE(order_id, variant_id)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
