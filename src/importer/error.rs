// ==========================================
// 实体导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误 =====
    #[error("目标表不存在: {0}")]
    TableNotFound(String),

    #[error("合并模式未配置标识字段")]
    MissingMergeIdentifiers,

    #[error("未知的导入模式: {0}")]
    UnknownImportMode(String),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("导入配置不存在: {0}")]
    ConfigNotFound(String),

    // ===== 结构不一致 =====
    #[error("目标表 {table} 不存在以下列: {}", columns.join(", "))]
    SchemaMismatch { table: String, columns: Vec<String> },

    // ===== 数据映射错误 =====
    #[error("源字段缺失 (记录 {row}): {field}")]
    MissingSourceField { row: usize, field: String },

    // ===== 数据源错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.json）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    #[error("远程数据拉取失败: {0}")]
    HttpError(String),

    // ===== 存储错误 =====
    #[error(transparent)]
    Store(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否属于配置类错误（目标表缺失 / 合并标识缺失 / 模式未知 / 配置无效或不存在）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ImportError::TableNotFound(_)
                | ImportError::MissingMergeIdentifiers
                | ImportError::UnknownImportMode(_)
                | ImportError::InvalidConfig(_)
                | ImportError::ConfigNotFound(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::HttpError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::JsonParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>（经由仓储层分类）
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Store(RepositoryError::from(err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
