// ==========================================
// 实体导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供目标表访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化,防止 SQL 注入
// ==========================================

pub mod entity_store;
pub mod error;
pub mod sqlite_store;

// 重导出核心仓储
pub use entity_store::EntityStore;
pub use error::{RepositoryError, RepositoryResult};
pub use sqlite_store::{SqliteEntityStore, PRIMARY_KEY};
