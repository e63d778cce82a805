// ==========================================
// 实体导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// ==========================================

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "ENTITY_IMPORT_DB_PATH";

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径（只计算路径，不创建目录）
///
/// 优先级: ENTITY_IMPORT_DB_PATH → 用户数据目录/entity-import/entity_import.db → ./entity_import.db
pub fn default_db_path() -> String {
    resolve_db_path(std::env::var(DB_PATH_ENV).ok(), dirs::data_dir())
}

fn resolve_db_path(env_value: Option<String>, data_dir: Option<PathBuf>) -> String {
    if let Some(path) = env_value {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let path = match data_dir {
        Some(data_dir) => data_dir.join("entity-import").join("entity_import.db"),
        None => PathBuf::from("./entity_import.db"),
    };
    path.to_string_lossy().to_string()
}

/// 创建数据库文件所在目录（打开文件数据库之前调用）
pub fn ensure_parent_dir(db_path: &str) -> std::io::Result<()> {
    match Path::new(db_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
