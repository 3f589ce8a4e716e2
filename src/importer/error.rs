// ==========================================
// 商品目录导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层:
// - ImportError: 结构性/配置错误，中止 process 调用
// - RowError: 行级错误，写入行结果，永不向上传播
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("源文件缺少表头: {0}")]
    EmptySource(String),

    #[error("缺少必需列: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    // ===== 任务相关错误 =====
    #[error("不支持的导入类型: {0}")]
    UnsupportedKind(String),

    #[error("导入任务不存在: {0}")]
    JobNotFound(String),

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl ImportError {
    /// 结构性错误（源文件/任务类型问题），任务应标记为 failed
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::FileReadError(_)
                | ImportError::CsvParseError(_)
                | ImportError::EmptySource(_)
                | ImportError::MissingColumns(_)
                | ImportError::UnsupportedKind(_)
        )
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{field}: 未找到 '{value}'")]
    UnresolvedReference { field: String, value: String },

    #[error("持久化失败: {0}")]
    Persistence(String),
}

impl RowError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        RowError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::validation(field, "不能为空")
    }

    pub fn unresolved(field: &str, value: &str) -> Self {
        RowError::UnresolvedReference {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<RepositoryError> for RowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::FieldValueError { field, message } => {
                RowError::Validation { field, message }
            }
            other => RowError::Persistence(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = ImportError::MissingColumns(vec!["email".to_string(), "sku".to_string()]);
        assert_eq!(err.to_string(), "缺少必需列: email, sku");
        assert!(err.is_structural());
        assert!(!ImportError::JobNotFound("x".to_string()).is_structural());
    }

    #[test]
    fn test_row_error_from_repository() {
        let err: RowError = RepositoryError::UniqueConstraintViolation("variant.sku".to_string()).into();
        assert!(matches!(err, RowError::Persistence(_)));

        let err: RowError = RepositoryError::FieldValueError {
            field: "product".to_string(),
            message: "缺少名称".to_string(),
        }
        .into();
        assert_eq!(err, RowError::validation("product", "缺少名称"));
    }
}
