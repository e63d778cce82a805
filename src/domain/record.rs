// ==========================================
// 实体导入系统 - 记录模型
// ==========================================
// RawRecord: 源记录（只读，单条处理周期内有效）
// MappedRecord: 字段映射后的目标记录（列名 → 值）
// PersistedRecord: 目标表中已落库的行（按 id 引用）
// ==========================================

use crate::domain::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ==========================================
// SourceKey - 源字段标识
// ==========================================
// 有表头的 CSV / JSON → Name；无表头的 CSV → Index（从 0 开始）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::Name(name) => f.write_str(name),
            SourceKey::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

impl From<&str> for SourceKey {
    fn from(s: &str) -> Self {
        SourceKey::Name(s.to_string())
    }
}

impl From<String> for SourceKey {
    fn from(s: String) -> Self {
        SourceKey::Name(s)
    }
}

impl From<usize> for SourceKey {
    fn from(idx: usize) -> Self {
        SourceKey::Index(idx)
    }
}

// ==========================================
// RawRecord - 源记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    values: HashMap<SourceKey, FieldValue>,
}

impl RawRecord {
    pub fn new(values: HashMap<SourceKey, FieldValue>) -> Self {
        Self { values }
    }

    /// 由 (字段名, 值) 列表构建
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<SourceKey>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 按配置中的源字段标识查找
    ///
    /// 先按字段名匹配；未命中时把去空白后的标识解析为位置索引
    /// （无表头 CSV 的映射选项形如 " 0"）。
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        if let Some(v) = self.values.get(&SourceKey::Name(field.to_string())) {
            return Some(v);
        }
        field
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| self.values.get(&SourceKey::Index(idx)))
    }

    pub fn get_key(&self, key: &SourceKey) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SourceKey> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceKey, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 所有值均为空
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| match v {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        })
    }
}

// ==========================================
// MappedRecord - 映射后的目标记录
// ==========================================
// BTreeMap 保证生成 SQL 时列顺序稳定
pub type MappedRecord = BTreeMap<String, FieldValue>;

// ==========================================
// PersistedRecord - 已落库记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    pub values: BTreeMap<String, FieldValue>,
}

impl PersistedRecord {
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    pub fn set(&mut self, column: &str, value: FieldValue) {
        self.values.insert(column.to_string(), value);
    }

    /// id 是否有效（自增主键从 1 开始）
    pub fn has_valid_id(&self) -> bool {
        self.id > 0
    }
}
