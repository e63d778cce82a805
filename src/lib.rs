// ==========================================
// 实体导入系统 - 核心库
// ==========================================
// 功能: CSV/JSON 记录导入关系表
// 技术栈: Rust + SQLite
// 能力: 字段映射 / 新增或合并 / 派生字段 / 试运行 / 生命周期钩子
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与配置
pub mod domain;

// 数据仓储层 - 目标表访问
pub mod repository;

// 导入层 - 数据源与导入流程
pub mod importer;

// 配置层 - 命名导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigManager, ImportConfigReader};
pub use domain::{
    FieldMappingRule, FieldValue, ImportConfig, ImportMode, MappingValue, MergeIdentifier,
    PersistedRecord, Predicate, PurgeScope, RawRecord, SortingMode,
};
pub use importer::{
    CsvSource, ImportError, ImportHook, ImportResult, ImportRunner, JsonSource, MemorySource,
    RunResult, RunStatus, RunSummary, Source,
};
pub use repository::{EntityStore, SqliteEntityStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "实体导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
