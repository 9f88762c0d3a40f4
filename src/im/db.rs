//! SQLite 数据库工具：统一创建连接池并建表
//!
//! 表结构放在 crate 根目录 `migrations/0001_local_store.sql`，编译期嵌入。
//! 所有语句都是 `CREATE TABLE IF NOT EXISTS`，重复执行不会报错，也不会改变已有表。

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// 本地存储表结构 DDL
pub const LOCAL_STORE_SCHEMA: &str = include_str!("../../migrations/0001_local_store.sql");

/// 默认连接池大小（与 SDK 中各 DAO 建池时一致）
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// 本地存储配置
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 数据库路径（SQLite），可以是：
    /// - 相对路径：如 "openim.db" 会转换为 "sqlite://openim.db"
    /// - 绝对路径：如 "/path/to/db.db" 会转换为 "sqlite:///path/to/db.db"
    /// - 内存库：":memory:"
    /// - 完整URL：如 "sqlite://openim.db" 直接使用
    pub db_path: String,
    /// 连接池最大连接数（内存库固定为 1）
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    /// 转换为 sqlx 可识别的连接 URL
    pub fn db_url(&self) -> String {
        let path = self.db_path.trim();
        if path.starts_with("sqlite:") {
            path.to_string()
        } else if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}", path)
        }
    }

    /// 是否为内存库
    ///
    /// 内存库每个连接都是一个独立的数据库，连接池只能保留一个常驻连接。
    pub fn is_memory(&self) -> bool {
        let url = self.db_url();
        url == "sqlite::memory:" || url.contains(":memory:") || url.contains("mode=memory")
    }
}

/// `sqlite_master` 中的一条表结构记录
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SchemaObject {
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub sql: Option<String>,
}

/// 创建 SQLite 连接池（文件不存在时自动创建）
pub async fn create_sqlite_pool(config: &StoreConfig) -> Result<Pool<Sqlite>> {
    let db_url = config.db_url();
    let options = SqliteConnectOptions::from_str(&db_url)
        .with_context(|| format!("无效的 SQLite 连接地址: {}", db_url))?
        .create_if_missing(true);

    let pool = if config.is_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
    }
    .with_context(|| format!("连接SQLite数据库失败: {}", db_url))?;

    info!("[DB] 已连接 SQLite 数据库: {}", db_url);
    Ok(pool)
}

/// 执行建表语句（幂等）
pub async fn apply_schema(db: &Pool<Sqlite>) -> Result<()> {
    debug!("[DB] 执行本地表结构 DDL");
    sqlx::raw_sql(LOCAL_STORE_SCHEMA)
        .execute(db)
        .await
        .context("执行本地表结构 DDL 失败")?;
    info!("[DB] 本地表结构已就绪");
    Ok(())
}

/// 创建连接池并建表
pub async fn create_sqlite_pool_with_schema(config: &StoreConfig) -> Result<Pool<Sqlite>> {
    let pool = create_sqlite_pool(config).await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

/// 读取当前数据库中的表结构（不含 SQLite 内部对象），按名称排序
pub async fn schema_snapshot(db: &Pool<Sqlite>) -> Result<Vec<SchemaObject>> {
    let objects = sqlx::query_as::<_, SchemaObject>(
        r#"
        SELECT type, name, sql
        FROM sqlite_master
        WHERE name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
    )
    .fetch_all(db)
    .await
    .context("读取表结构失败")?;
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_url_from_relative_path() {
        assert_eq!(StoreConfig::new("openim.db").db_url(), "sqlite://openim.db");
    }

    #[test]
    fn db_url_from_absolute_path() {
        assert_eq!(
            StoreConfig::new("/tmp/openim.db").db_url(),
            "sqlite:///tmp/openim.db"
        );
    }

    #[test]
    fn full_url_is_kept() {
        let config = StoreConfig::new("sqlite://openim.db?mode=rwc");
        assert_eq!(config.db_url(), "sqlite://openim.db?mode=rwc");
        assert!(!config.is_memory());
    }

    #[test]
    fn memory_detection() {
        assert!(StoreConfig::in_memory().is_memory());
        assert!(StoreConfig::new("sqlite::memory:").is_memory());
        assert!(StoreConfig::new("sqlite://shared?mode=memory&cache=shared").is_memory());
        assert!(!StoreConfig::new("local.db").is_memory());
    }

    #[test]
    fn schema_only_creates_if_missing() {
        let creates = LOCAL_STORE_SCHEMA.matches("CREATE TABLE").count();
        let guarded = LOCAL_STORE_SCHEMA.matches("CREATE TABLE IF NOT EXISTS").count();
        assert_eq!(creates, 3);
        assert_eq!(creates, guarded);
    }
}
