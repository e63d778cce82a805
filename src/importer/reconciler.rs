// ==========================================
// 实体导入系统 - 新增/合并判定器
// ==========================================
// 职责: 校验目标列 → 按导入模式决定 INSERT 或 UPDATE → 落库
// 合并: 标识字段对 AND 连接，取第一条匹配行
// 试运行: 查找照常执行，不提交任何写入
// ==========================================

use crate::domain::{
    ImportMode, MappedRecord, MergeIdentifier, PersistedRecord, Predicate,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{EntityStore, RepositoryError};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// 单条记录的落库结果
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// 落库后的记录（试运行中新增路径为 None）
    pub record: Option<PersistedRecord>,
    /// true: 新增；false: 更新已有行
    pub was_insert: bool,
}

pub struct Reconciler<'s, S: EntityStore + ?Sized> {
    store: &'s S,
    table: String,
    columns: BTreeSet<String>,
}

impl<'s, S: EntityStore + ?Sized> Reconciler<'s, S> {
    /// 绑定目标表（表不存在报 TableNotFound）
    pub fn for_table(store: &'s S, table: &str) -> ImportResult<Self> {
        if !store.table_exists(table)? {
            return Err(ImportError::TableNotFound(table.to_string()));
        }
        let columns = store.column_names(table)?;

        Ok(Self {
            store,
            table: table.to_string(),
            columns,
        })
    }

    /// 校验列名均存在于目标表
    pub fn validate_columns<'c, I>(&self, columns: I) -> ImportResult<()>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let missing: Vec<String> = columns
            .into_iter()
            .filter(|c| !self.columns.contains(*c))
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::SchemaMismatch {
                table: self.table.clone(),
                columns: missing,
            })
        }
    }

    /// 导入前清空（单次批量删除）
    ///
    /// # 返回
    /// - Ok(usize): 删除行数；试运行恒为 0
    pub fn purge(&self, filter: Option<&Predicate>, dry_run: bool) -> ImportResult<usize> {
        if dry_run {
            debug!(table = %self.table, "试运行: 跳过导入前清空");
            return Ok(0);
        }
        let predicate = filter.cloned().unwrap_or_default();
        let deleted = self.store.delete(&self.table, &predicate)?;
        info!(table = %self.table, deleted = deleted, "导入前清空完成");
        Ok(deleted)
    }

    /// 落库一条映射后的记录
    ///
    /// # 参数
    /// - mode: Insert / Merge
    /// - mapped: 映射后的记录
    /// - identifiers: 合并标识字段对（Merge 模式必须非空）
    /// - dry_run: 试运行（只查不写）
    pub fn reconcile(
        &self,
        mode: ImportMode,
        mapped: &MappedRecord,
        identifiers: &[MergeIdentifier],
        dry_run: bool,
    ) -> ImportResult<Reconciliation> {
        self.validate_columns(mapped.keys().map(|k| k.as_str()))?;

        match mode {
            ImportMode::Insert => self.insert(mapped, dry_run),
            ImportMode::Merge => {
                // 标识值为 NULL 时等值查找不可能命中，直接新增
                let Some(predicate) = self.merge_predicate(mapped, identifiers)? else {
                    debug!(table = %self.table, "合并: 标识值为空，按新增处理");
                    return self.insert(mapped, dry_run);
                };
                match self.store.find_one(&self.table, &predicate)? {
                    Some(existing) => {
                        if dry_run {
                            return Ok(Reconciliation {
                                record: Some(existing),
                                was_insert: false,
                            });
                        }
                        let by_id = Predicate::by_id(existing.id);
                        self.store.update(&self.table, mapped, &by_id)?;
                        debug!(table = %self.table, id = existing.id, "合并: 更新已有行");
                        let record = self.fetch(existing.id)?;
                        Ok(Reconciliation {
                            record: Some(record),
                            was_insert: false,
                        })
                    }
                    None => self.insert(mapped, dry_run),
                }
            }
        }
    }

    fn insert(&self, mapped: &MappedRecord, dry_run: bool) -> ImportResult<Reconciliation> {
        if dry_run {
            return Ok(Reconciliation {
                record: None,
                was_insert: true,
            });
        }

        let id = self.store.insert(&self.table, mapped)?;
        debug!(table = %self.table, id = id, "新增行");
        let record = self.fetch(id)?;
        Ok(Reconciliation {
            record: Some(record),
            was_insert: true,
        })
    }

    /// 按主键回读（取得自动生成的 id 与默认值）
    fn fetch(&self, id: i64) -> ImportResult<PersistedRecord> {
        self.store
            .find_one(&self.table, &Predicate::by_id(id))?
            .ok_or_else(|| {
                ImportError::Store(RepositoryError::NotFound {
                    entity: self.table.clone(),
                    id: id.to_string(),
                })
            })
    }

    /// 合并查找条件: target.targetColumn = mapped[sourceColumn]（AND 连接）
    ///
    /// # 返回
    /// - None: 某个标识值为 NULL（SQL 等值比较对 NULL 不成立，视为未命中）
    fn merge_predicate(
        &self,
        mapped: &MappedRecord,
        identifiers: &[MergeIdentifier],
    ) -> ImportResult<Option<Predicate>> {
        if identifiers.is_empty() {
            return Err(ImportError::MissingMergeIdentifiers);
        }

        let mut predicate = Predicate::All;
        for identifier in identifiers {
            let value = mapped.get(&identifier.source).ok_or_else(|| {
                ImportError::InvalidConfig(format!(
                    "合并标识字段 {} 不在映射结果中",
                    identifier.source
                ))
            })?;
            if value.is_null() {
                return Ok(None);
            }
            predicate = predicate.and(identifier.target.clone(), value.clone());
        }
        Ok(Some(predicate))
    }
}
