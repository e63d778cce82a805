// ==========================================
// 实体导入系统 - 导入配置模型
// ==========================================
// 职责: 一次导入运行所需的全部配置（目标表 / 字段映射 / 合并标识 / 派生字段）
// 存储: JSON（文件或 entity_import_config 表）
// ==========================================

use crate::domain::predicate::Predicate;
use crate::domain::types::{ImportMode, PurgeScope, SortingMode};
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认排序字段
pub const DEFAULT_SORTING_FIELD: &str = "sorting";

// ==========================================
// FieldMappingRule - 字段映射规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappingRule {
    /// 目标列名
    pub column_name: String,
    #[serde(flatten)]
    pub value: MappingValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", rename_all = "snake_case")]
pub enum MappingValue {
    /// 取源记录字段值
    SourceValue { source_field: String },
    /// 静态值（可含替换标记）
    StaticValue { static_value: String },
}

impl FieldMappingRule {
    pub fn source(column_name: impl Into<String>, source_field: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            value: MappingValue::SourceValue {
                source_field: source_field.into(),
            },
        }
    }

    pub fn static_value(column_name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            value: MappingValue::StaticValue {
                static_value: template.into(),
            },
        }
    }
}

// ==========================================
// MergeIdentifier - 合并标识字段对
// ==========================================
// source: 映射后记录中的列名；target: 目标表中的列名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeIdentifier {
    pub source: String,
    pub target: String,
}

impl MergeIdentifier {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub target_table: String,
    pub import_mode: ImportMode,
    pub field_mapping: Vec<FieldMappingRule>,

    // ===== 导入前清空 =====
    pub purge_before_import: bool,
    pub purge_filter: Option<Predicate>,
    pub purge_scope: PurgeScope,

    // ===== 合并 =====
    pub merge_identifier_fields: Vec<MergeIdentifier>,

    // ===== 派生字段 =====
    pub set_date_added: bool,
    pub date_added_field: Option<String>,
    pub set_tstamp: bool,
    pub tstamp_field: Option<String>,
    pub generate_alias: bool,
    pub alias_field: Option<String>,
    pub alias_pattern: Option<String>,
    pub sorting_mode: SortingMode,
    pub sorting_field: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            target_table: String::new(),
            import_mode: ImportMode::Insert,
            field_mapping: Vec::new(),
            purge_before_import: false,
            purge_filter: None,
            purge_scope: PurgeScope::InsertModeOnly,
            merge_identifier_fields: Vec::new(),
            set_date_added: false,
            date_added_field: None,
            set_tstamp: false,
            tstamp_field: None,
            generate_alias: false,
            alias_field: None,
            alias_pattern: None,
            sorting_mode: SortingMode::None,
            sorting_field: None,
        }
    }
}

impl ImportConfig {
    pub fn new(target_table: impl Into<String>, import_mode: ImportMode) -> Self {
        Self {
            target_table: target_table.into(),
            import_mode,
            ..Self::default()
        }
    }

    /// 从 JSON 文本解析
    ///
    /// import_mode 按 `ImportMode::from_str` 规范化（忽略大小写与首尾空白）；
    /// 未知模式报 `UnknownImportMode`，其余格式问题报 `InvalidConfig`。
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let mut value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ImportError::InvalidConfig(e.to_string()))?;

        let mode = match value.get("import_mode").and_then(|m| m.as_str()) {
            Some(raw) => Some(raw.parse::<ImportMode>()?),
            None => None,
        };
        if let Some(mode) = mode {
            value["import_mode"] = serde_json::Value::from(mode.as_str());
        }

        serde_json::from_value(value).map_err(|e| ImportError::InvalidConfig(e.to_string()))
    }

    /// 从 JSON 文件解析
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> ImportResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ImportError::InvalidConfig(e.to_string()))
    }

    /// 配置自检（不访问数据库）
    ///
    /// - 目标表非空
    /// - Merge 模式至少一个标识字段对
    /// - 标识字段的 source 必须是映射产出的列
    pub fn validate(&self) -> ImportResult<()> {
        if self.target_table.trim().is_empty() {
            return Err(ImportError::InvalidConfig("target_table 为空".to_string()));
        }

        if self.import_mode == ImportMode::Merge {
            if self.merge_identifier_fields.is_empty() {
                return Err(ImportError::MissingMergeIdentifiers);
            }
            for identifier in &self.merge_identifier_fields {
                if !self
                    .field_mapping
                    .iter()
                    .any(|rule| rule.column_name == identifier.source)
                {
                    return Err(ImportError::InvalidConfig(format!(
                        "合并标识字段 {} 不在字段映射中",
                        identifier.source
                    )));
                }
            }
        }

        Ok(())
    }

    /// 字段映射产出的目标列（去重，保持首次出现顺序）
    pub fn mapped_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for rule in &self.field_mapping {
            if !columns.contains(&rule.column_name.as_str()) {
                columns.push(rule.column_name.as_str());
            }
        }
        columns
    }

    /// 生效的排序字段
    pub fn effective_sorting_field(&self) -> &str {
        self.sorting_field
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_SORTING_FIELD)
    }

    /// 导入前清空是否生效
    pub fn purge_applies(&self) -> bool {
        self.purge_before_import && self.purge_scope.applies_to(self.import_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "target_table": "tl_member",
        "import_mode": "merge",
        "field_mapping": [
            {"column_name": "email", "value_type": "source_value", "source_field": "mail"},
            {"column_name": "groups", "value_type": "static_value", "static_value": "{{group}}"}
        ],
        "merge_identifier_fields": [{"source": "email", "target": "email"}],
        "set_tstamp": true,
        "tstamp_field": "tstamp",
        "sorting_mode": "source_order"
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = ImportConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.target_table, "tl_member");
        assert_eq!(config.import_mode, ImportMode::Merge);
        assert_eq!(config.field_mapping[0], FieldMappingRule::source("email", "mail"));
        assert_eq!(
            config.field_mapping[1],
            FieldMappingRule::static_value("groups", "{{group}}")
        );
        assert_eq!(config.sorting_mode, SortingMode::SourceOrder);
        assert_eq!(config.effective_sorting_field(), "sorting");
        assert!(!config.purge_before_import);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_text_is_normalized() {
        let config =
            ImportConfig::from_json_str(r#"{"target_table": "t", "import_mode": " Merge "}"#)
                .unwrap();
        assert_eq!(config.import_mode, ImportMode::Merge);
    }

    #[test]
    fn test_unknown_mode_is_reported() {
        let err = ImportConfig::from_json_str(r#"{"target_table": "t", "import_mode": "replace"}"#)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownImportMode(_)));
    }

    #[test]
    fn test_merge_requires_identifiers() {
        let config = ImportConfig::new("t", ImportMode::Merge);
        assert!(matches!(
            config.validate(),
            Err(ImportError::MissingMergeIdentifiers)
        ));
    }

    #[test]
    fn test_merge_identifier_must_be_mapped() {
        let mut config = ImportConfig::new("t", ImportMode::Merge);
        config.merge_identifier_fields = vec![MergeIdentifier::new("email", "email")];
        config.field_mapping = vec![FieldMappingRule::source("name", "name")];
        assert!(matches!(config.validate(), Err(ImportError::InvalidConfig(_))));
    }

    #[test]
    fn test_purge_applies() {
        let mut config = ImportConfig::new("t", ImportMode::Merge);
        config.purge_before_import = true;
        assert!(!config.purge_applies());
        config.purge_scope = PurgeScope::AllModes;
        assert!(config.purge_applies());
    }

    #[test]
    fn test_mapped_columns_dedup() {
        let mut config = ImportConfig::new("t", ImportMode::Insert);
        config.field_mapping = vec![
            FieldMappingRule::source("a", "x"),
            FieldMappingRule::source("b", "y"),
            FieldMappingRule::static_value("a", "z"),
        ];
        assert_eq!(config.mapped_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_json_roundtrip_keeps_rules() {
        let config = ImportConfig::from_json_str(SAMPLE).unwrap();
        let again = ImportConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, again);
    }
}
