// ==========================================
// 商品目录导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::RowCommitPolicy;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者:
// - ConfigManager（从 config_kv 表读取）
// - ImportSettings（内存配置，宿主/测试使用）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 行提交策略
    ///
    /// # 默认值
    /// - PER_STAGE
    async fn get_row_commit_policy(&self) -> ImportResult<RowCommitPolicy>;

    /// 已完成行被跳过时是否写日志
    ///
    /// # 默认值
    /// - false
    async fn get_log_skipped_rows(&self) -> ImportResult<bool>;

    /// CSV 分隔符（单个 ASCII 字符）
    ///
    /// # 默认值
    /// - ','
    async fn get_csv_delimiter(&self) -> ImportResult<u8>;

    /// 订单行未填写 store 列时使用的店铺代码
    ///
    /// # 默认值
    /// - None（store 列必填）
    async fn get_default_store_code(&self) -> ImportResult<Option<String>>;

    /// 订单币种默认值
    ///
    /// # 默认值
    /// - USD
    async fn get_default_currency(&self) -> ImportResult<String>;
}
