// ==========================================
// 实体导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义运行器按 ID 读取配置的接口（不包含实现）
// 红线: 不包含配置写入、不包含导入逻辑
// ==========================================

use crate::domain::ImportConfig;
use crate::importer::error::ImportResult;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 entity_import_config 表读取）
pub trait ImportConfigReader: Send + Sync {
    /// 读取指定 ID 的导入配置
    ///
    /// # 返回
    /// - Err(ConfigNotFound): 配置不存在
    /// - Err(InvalidConfig): 存储的 JSON 无法解析
    fn import_config(&self, config_id: &str) -> ImportResult<ImportConfig>;

    /// 已保存的配置 ID 列表（升序）
    fn config_ids(&self) -> ImportResult<Vec<String>>;
}
