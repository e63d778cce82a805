// ==========================================
// 实体导入系统 - 领域类型定义
// ==========================================
// 职责: 导入模式 / 排序模式 / 清空范围 等枚举
// 序列化格式: snake_case (与配置 JSON 一致)
// ==========================================

use crate::importer::error::ImportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入模式 (Import Mode)
// ==========================================
// Insert: 每条记录都新增一行
// Merge: 按标识字段查找已有行，命中则更新，否则新增
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    #[default]
    Insert,
    Merge,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Insert => "insert",
            ImportMode::Merge => "merge",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(ImportMode::Insert),
            "merge" => Ok(ImportMode::Merge),
            other => Err(ImportError::UnknownImportMode(other.to_string())),
        }
    }
}

// ==========================================
// 排序模式 (Sorting Mode)
// ==========================================
// SourceOrder: 按源记录顺序写入排序值（间隔 128）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortingMode {
    #[default]
    None,
    SourceOrder,
}

impl fmt::Display for SortingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortingMode::None => write!(f, "none"),
            SortingMode::SourceOrder => write!(f, "source_order"),
        }
    }
}

// ==========================================
// 清空范围 (Purge Scope)
// ==========================================
// 清空总是在第一条记录处理之前执行一次；
// 这里只决定它是否受导入模式限制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeScope {
    /// 仅 Insert 模式执行清空
    #[default]
    InsertModeOnly,
    /// 任意模式都执行清空
    AllModes,
}

impl PurgeScope {
    /// 在给定导入模式下是否执行清空
    pub fn applies_to(&self, mode: ImportMode) -> bool {
        match self {
            PurgeScope::InsertModeOnly => mode == ImportMode::Insert,
            PurgeScope::AllModes => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_mode_from_str() {
        assert_eq!("insert".parse::<ImportMode>().unwrap(), ImportMode::Insert);
        assert_eq!(" Merge ".parse::<ImportMode>().unwrap(), ImportMode::Merge);
    }

    #[test]
    fn test_import_mode_unknown() {
        let err = "upsert".parse::<ImportMode>().unwrap_err();
        assert!(matches!(err, ImportError::UnknownImportMode(ref m) if m == "upsert"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_purge_scope_applies_to() {
        assert!(PurgeScope::InsertModeOnly.applies_to(ImportMode::Insert));
        assert!(!PurgeScope::InsertModeOnly.applies_to(ImportMode::Merge));
        assert!(PurgeScope::AllModes.applies_to(ImportMode::Merge));
    }

    #[test]
    fn test_serde_snake_case() {
        let mode: SortingMode = serde_json::from_str("\"source_order\"").unwrap();
        assert_eq!(mode, SortingMode::SourceOrder);
        assert_eq!(serde_json::to_string(&ImportMode::Merge).unwrap(), "\"merge\"");
    }
}
