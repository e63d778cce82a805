// ==========================================
// 实体导入系统 - 领域模型层
// ==========================================
// 职责: 定义记录、配置、查询条件等核心类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import_config;
pub mod predicate;
pub mod record;
pub mod types;
pub mod value;

// 重导出核心类型
pub use import_config::{FieldMappingRule, ImportConfig, MappingValue, MergeIdentifier};
pub use predicate::{Condition, Predicate};
pub use record::{MappedRecord, PersistedRecord, RawRecord, SourceKey};
pub use types::{ImportMode, PurgeScope, SortingMode};
pub use value::FieldValue;
