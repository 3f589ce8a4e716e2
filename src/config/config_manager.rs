// ==========================================
// 商品目录导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::RowCommitPolicy;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 打开数据库文件创建 ConfigManager
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// global scope 全部配置快照（按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

fn value_error(key: &str, value: &str, message: &str) -> ImportError {
    ImportError::ConfigValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

/// 解析布尔配置（true/false/1/0/yes/no）
pub(crate) fn parse_bool_config(key: &str, value: &str) -> ImportResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(value_error(key, value, "期望布尔值")),
    }
}

/// 解析分隔符配置（单个 ASCII 字符，支持 \t）
pub(crate) fn parse_delimiter_config(key: &str, value: &str) -> ImportResult<u8> {
    let raw = if value == "\\t" { "\t" } else { value };
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(value_error(key, value, "期望单个 ASCII 字符")),
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_row_commit_policy(&self) -> ImportResult<RowCommitPolicy> {
        let value = self.get_config_or_default(config_keys::ROW_COMMIT_POLICY, "PER_STAGE")?;
        value.parse::<RowCommitPolicy>().map_err(|_| {
            value_error(
                config_keys::ROW_COMMIT_POLICY,
                &value,
                "期望 PER_STAGE 或 ATOMIC",
            )
        })
    }

    async fn get_log_skipped_rows(&self) -> ImportResult<bool> {
        let value = self.get_config_or_default(config_keys::LOG_SKIPPED_ROWS, "false")?;
        parse_bool_config(config_keys::LOG_SKIPPED_ROWS, &value)
    }

    async fn get_csv_delimiter(&self) -> ImportResult<u8> {
        let value = self.get_config_or_default(config_keys::CSV_DELIMITER, ",")?;
        parse_delimiter_config(config_keys::CSV_DELIMITER, &value)
    }

    async fn get_default_store_code(&self) -> ImportResult<Option<String>> {
        let value = self.get_global_config_value(config_keys::DEFAULT_STORE_CODE)?;
        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn get_default_currency(&self) -> ImportResult<String> {
        let value = self.get_config_or_default(config_keys::DEFAULT_CURRENCY, "USD")?;
        let value = value.trim().to_uppercase();
        if value.is_empty() {
            return Err(value_error(config_keys::DEFAULT_CURRENCY, &value, "币种不能为空"));
        }
        Ok(value)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 行处理
    pub const ROW_COMMIT_POLICY: &str = "import.row_commit_policy";
    pub const LOG_SKIPPED_ROWS: &str = "import.log_skipped_rows";

    // 源文件
    pub const CSV_DELIMITER: &str = "import.csv_delimiter";

    // 订单默认值
    pub const DEFAULT_STORE_CODE: &str = "import.default_store_code";
    pub const DEFAULT_CURRENCY: &str = "import.default_currency";

    /// 全部已知配置键
    pub const ALL: [&str; 5] = [
        ROW_COMMIT_POLICY,
        LOG_SKIPPED_ROWS,
        CSV_DELIMITER,
        DEFAULT_STORE_CODE,
        DEFAULT_CURRENCY,
    ];
}
