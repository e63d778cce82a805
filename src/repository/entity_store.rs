// ==========================================
// 实体导入系统 - 目标表存储 Trait
// ==========================================
// 职责: 定义导入引擎所需的关系存储接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 表名/列名来自配置；值必须参数化绑定
// ==========================================

use crate::domain::{MappedRecord, PersistedRecord, Predicate};
use crate::repository::error::RepositoryResult;
use std::collections::BTreeSet;

// ==========================================
// EntityStore Trait
// ==========================================
// 用途: 目标表的结构查询与读写
// 实现者: SqliteEntityStore（使用 rusqlite）
pub trait EntityStore {
    /// 目标表是否存在
    fn table_exists(&self, table: &str) -> RepositoryResult<bool>;

    /// 目标表的列名集合
    ///
    /// # 返回
    /// - 表不存在时返回空集合
    fn column_names(&self, table: &str) -> RepositoryResult<BTreeSet<String>>;

    /// 插入一行
    ///
    /// # 返回
    /// - Ok(i64): 新生成的主键 id
    fn insert(&self, table: &str, record: &MappedRecord) -> RepositoryResult<i64>;

    /// 按条件更新
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数
    fn update(
        &self,
        table: &str,
        record: &MappedRecord,
        predicate: &Predicate,
    ) -> RepositoryResult<usize>;

    /// 查找第一条匹配行（按主键升序）
    fn find_one(&self, table: &str, predicate: &Predicate)
        -> RepositoryResult<Option<PersistedRecord>>;

    /// 查找全部匹配行（按主键升序）
    fn find_many(&self, table: &str, predicate: &Predicate)
        -> RepositoryResult<Vec<PersistedRecord>>;

    /// 按条件删除
    ///
    /// # 返回
    /// - Ok(usize): 删除行数
    fn delete(&self, table: &str, predicate: &Predicate) -> RepositoryResult<usize>;
}

// 引用同样可作为存储使用（便于测试中共享同一存储）
impl<S: EntityStore + ?Sized> EntityStore for &S {
    fn table_exists(&self, table: &str) -> RepositoryResult<bool> {
        (**self).table_exists(table)
    }

    fn column_names(&self, table: &str) -> RepositoryResult<BTreeSet<String>> {
        (**self).column_names(table)
    }

    fn insert(&self, table: &str, record: &MappedRecord) -> RepositoryResult<i64> {
        (**self).insert(table, record)
    }

    fn update(
        &self,
        table: &str,
        record: &MappedRecord,
        predicate: &Predicate,
    ) -> RepositoryResult<usize> {
        (**self).update(table, record, predicate)
    }

    fn find_one(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> RepositoryResult<Option<PersistedRecord>> {
        (**self).find_one(table, predicate)
    }

    fn find_many(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> RepositoryResult<Vec<PersistedRecord>> {
        (**self).find_many(table, predicate)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> RepositoryResult<usize> {
        (**self).delete(table, predicate)
    }
}
