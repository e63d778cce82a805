// ==========================================
// 实体导入系统 - 配置层
// ==========================================
// 职责: 命名导入配置的持久化与读取
// 存储: entity_import_config 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::ConfigManager;
pub use import_config_trait::ImportConfigReader;
