// ==========================================
// 商品目录导入系统 - 内存导入配置
// ==========================================
// 用途: 不依赖 config_kv 的 ImportConfigReader 实现（宿主直接构造/测试）
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::domain::types::RowCommitPolicy;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub row_commit_policy: RowCommitPolicy,
    pub log_skipped_rows: bool,
    pub csv_delimiter: u8,
    pub default_store_code: Option<String>,
    pub default_currency: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            row_commit_policy: RowCommitPolicy::PerStage,
            log_skipped_rows: false,
            csv_delimiter: b',',
            default_store_code: None,
            default_currency: "USD".to_string(),
        }
    }
}

impl ImportSettings {
    pub fn with_commit_policy(mut self, policy: RowCommitPolicy) -> Self {
        self.row_commit_policy = policy;
        self
    }

    pub fn with_log_skipped_rows(mut self, enabled: bool) -> Self {
        self.log_skipped_rows = enabled;
        self
    }

    pub fn with_default_store(mut self, code: impl Into<String>) -> Self {
        self.default_store_code = Some(code.into());
        self
    }
}

#[async_trait]
impl ImportConfigReader for ImportSettings {
    async fn get_row_commit_policy(&self) -> ImportResult<RowCommitPolicy> {
        Ok(self.row_commit_policy)
    }

    async fn get_log_skipped_rows(&self) -> ImportResult<bool> {
        Ok(self.log_skipped_rows)
    }

    async fn get_csv_delimiter(&self) -> ImportResult<u8> {
        Ok(self.csv_delimiter)
    }

    async fn get_default_store_code(&self) -> ImportResult<Option<String>> {
        Ok(self.default_store_code.clone())
    }

    async fn get_default_currency(&self) -> ImportResult<String> {
        Ok(self.default_currency.clone())
    }
}
