// ==========================================
// 实体导入系统 - 配置管理器
// ==========================================
// 职责: 导入配置的保存、加载、列举
// 存储: entity_import_config 表 (config_id → JSON)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::{configure_sqlite_connection, open_sqlite_connection};
use crate::domain::ImportConfig;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::RepositoryError;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entity_import_config (
    config_id TEXT PRIMARY KEY,
    config_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        conn.execute_batch(CREATE_TABLE_SQL)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）并确保配置表存在。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            guard.execute_batch(CREATE_TABLE_SQL)?;
        }

        Ok(Self { conn })
    }

    fn lock(&self) -> ImportResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    /// 保存（覆盖）导入配置
    pub fn save_import_config(&self, config_id: &str, config: &ImportConfig) -> ImportResult<()> {
        let id = config_id.trim();
        if id.is_empty() {
            return Err(ImportError::InvalidConfig("配置 ID 为空".to_string()));
        }

        let json = config.to_json()?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO entity_import_config (config_id, config_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(config_id) DO UPDATE SET
                config_json = excluded.config_json,
                updated_at = excluded.updated_at
            "#,
            params![id, json, Utc::now().to_rfc3339()],
        )?;

        info!(config_id = %id, table = %config.target_table, "导入配置已保存");
        Ok(())
    }

    /// 加载导入配置
    ///
    /// # 返回
    /// - Ok(None): 配置不存在
    pub fn load_import_config(&self, config_id: &str) -> ImportResult<Option<ImportConfig>> {
        let json = {
            let conn = self.lock()?;
            let result = conn.query_row(
                "SELECT config_json FROM entity_import_config WHERE config_id = ?1",
                params![config_id.trim()],
                |row| row.get::<_, String>(0),
            );

            match result {
                Ok(json) => json,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        };

        ImportConfig::from_json_str(&json).map(Some)
    }

    /// 列出全部配置 ID（升序）
    pub fn list_config_ids(&self) -> ImportResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT config_id FROM entity_import_config ORDER BY config_id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 删除导入配置
    ///
    /// # 返回
    /// - Ok(false): 配置不存在
    pub fn delete_import_config(&self, config_id: &str) -> ImportResult<bool> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM entity_import_config WHERE config_id = ?1",
            params![config_id.trim()],
        )?;
        Ok(affected > 0)
    }
}

impl ImportConfigReader for ConfigManager {
    fn import_config(&self, config_id: &str) -> ImportResult<ImportConfig> {
        self.load_import_config(config_id)?
            .ok_or_else(|| ImportError::ConfigNotFound(config_id.to_string()))
    }

    fn config_ids(&self) -> ImportResult<Vec<String>> {
        self.list_config_ids()
    }
}
