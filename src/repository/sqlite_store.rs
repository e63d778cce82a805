// ==========================================
// 实体导入系统 - SQLite 目标表存储实现
// ==========================================
// 职责: 实现 EntityStore（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约定: 主键列为 id（INTEGER PRIMARY KEY）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::predicate::quote_ident;
use crate::domain::{FieldValue, MappedRecord, PersistedRecord, Predicate};
use crate::repository::entity_store::EntityStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// 主键列名
pub const PRIMARY_KEY: &str = "id";

// ==========================================
// SqliteEntityStore
// ==========================================
pub struct SqliteEntityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityStore {
    /// 创建新的存储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（多个组件共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接句柄
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn select(
        &self,
        table: &str,
        predicate: &Predicate,
        limit: Option<usize>,
    ) -> RepositoryResult<Vec<PersistedRecord>> {
        let conn = self.lock()?;
        let (where_sql, values) = predicate.to_sql(table);
        let mut sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {} ASC",
            quote_ident(table),
            where_sql,
            quote_ident(PRIMARY_KEY)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        trace!(sql = %sql, "select");

        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let mut record_values = BTreeMap::new();
            for (idx, name) in columns.iter().enumerate() {
                record_values.insert(name.clone(), row.get::<_, FieldValue>(idx)?);
            }
            Ok(record_values)
        })?;

        let mut records = Vec::new();
        for row in rows {
            let values = row?;
            let id = values
                .get(PRIMARY_KEY)
                .and_then(FieldValue::as_i64)
                .ok_or_else(|| RepositoryError::FieldValueError {
                    field: PRIMARY_KEY.to_string(),
                    message: format!("表 {} 缺少整数主键", table),
                })?;
            records.push(PersistedRecord { id, values });
        }

        Ok(records)
    }
}

impl EntityStore for SqliteEntityStore {
    fn table_exists(&self, table: &str) -> RepositoryResult<bool> {
        let conn = self.lock()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
                params![table],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn column_names(&self, table: &str) -> RepositoryResult<BTreeSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(names)
    }

    fn insert(&self, table: &str, record: &MappedRecord) -> RepositoryResult<i64> {
        let conn = self.lock()?;

        if record.is_empty() {
            conn.execute(
                &format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
                [],
            )?;
            return Ok(conn.last_insert_rowid());
        }

        let columns: Vec<String> = record.keys().map(|c| quote_ident(c)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders
        );
        trace!(sql = %sql, "insert");

        conn.execute(&sql, params_from_iter(record.values()))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(
        &self,
        table: &str,
        record: &MappedRecord,
        predicate: &Predicate,
    ) -> RepositoryResult<usize> {
        if record.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let assignments: Vec<String> = record
            .keys()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .collect();
        let (where_sql, where_values) = predicate.to_sql(table);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote_ident(table),
            assignments.join(", "),
            where_sql
        );
        trace!(sql = %sql, "update");

        let params: Vec<&FieldValue> = record.values().chain(where_values.iter()).collect();
        let affected = conn.execute(&sql, params_from_iter(params))?;
        Ok(affected)
    }

    fn find_one(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> RepositoryResult<Option<PersistedRecord>> {
        Ok(self.select(table, predicate, Some(1))?.into_iter().next())
    }

    fn find_many(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> RepositoryResult<Vec<PersistedRecord>> {
        self.select(table, predicate, None)
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let (where_sql, values) = predicate.to_sql(table);
        let sql = format!("DELETE FROM {} WHERE {}", quote_ident(table), where_sql);
        trace!(sql = %sql, "delete");
        let affected = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteEntityStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE tl_news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tstamp INTEGER NOT NULL DEFAULT 0,
                headline TEXT,
                alias TEXT
            );
            "#,
        )
        .unwrap();
        SqliteEntityStore::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn record(pairs: &[(&str, FieldValue)]) -> MappedRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_table_exists_and_columns() {
        let store = setup();
        assert!(store.table_exists("tl_news").unwrap());
        assert!(!store.table_exists("tl_missing").unwrap());

        let columns = store.column_names("tl_news").unwrap();
        let expected: BTreeSet<String> = ["id", "tstamp", "headline", "alias"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(columns, expected);
        assert!(store.column_names("tl_missing").unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_find() {
        let store = setup();
        let id = store
            .insert("tl_news", &record(&[("headline", "Hello".into())]))
            .unwrap();
        assert_eq!(id, 1);

        let found = store
            .find_one("tl_news", &Predicate::by_id(id))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(found.get("headline"), Some(&FieldValue::from("Hello")));
        assert_eq!(found.get("tstamp"), Some(&FieldValue::Integer(0)));
        assert_eq!(found.get("alias"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_update_by_predicate() {
        let store = setup();
        let id = store
            .insert("tl_news", &record(&[("headline", "A".into())]))
            .unwrap();
        let affected = store
            .update(
                "tl_news",
                &record(&[("headline", "B".into()), ("tstamp", FieldValue::Integer(5))]),
                &Predicate::by_id(id),
            )
            .unwrap();
        assert_eq!(affected, 1);

        let found = store.find_one("tl_news", &Predicate::by_id(id)).unwrap().unwrap();
        assert_eq!(found.get("headline"), Some(&FieldValue::from("B")));
        assert_eq!(found.get("tstamp"), Some(&FieldValue::Integer(5)));
    }

    #[test]
    fn test_find_one_returns_first_by_id() {
        let store = setup();
        store.insert("tl_news", &record(&[("headline", "dup".into())])).unwrap();
        store.insert("tl_news", &record(&[("headline", "dup".into())])).unwrap();

        let found = store
            .find_one("tl_news", &Predicate::eq("headline", "dup"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(
            store
                .find_many("tl_news", &Predicate::eq("headline", "dup"))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_delete_with_raw_filter() {
        let store = setup();
        store.insert("tl_news", &record(&[("tstamp", FieldValue::Integer(1))])).unwrap();
        store.insert("tl_news", &record(&[("tstamp", FieldValue::Integer(9))])).unwrap();

        let deleted = store
            .delete("tl_news", &Predicate::Raw("tstamp < 5".to_string()))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.find_many("tl_news", &Predicate::All).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_unknown_column_fails() {
        let store = setup();
        let result = store.insert("tl_news", &record(&[("nope", "x".into())]));
        assert!(matches!(result, Err(RepositoryError::DatabaseQueryError(_))));
    }
}
