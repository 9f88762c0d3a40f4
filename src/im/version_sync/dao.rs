//! 版本同步数据访问层（DAO）

use crate::im::version_sync::models::LocalVersionSync;
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite, SqliteExecutor};
use tracing::debug;

/// 版本同步 DAO（基于 sqlx）
#[derive(Clone)]
pub struct VersionSyncDao {
    db: Pool<Sqlite>,
}

impl VersionSyncDao {
    /// 创建新的版本同步 DAO
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 查询版本同步信息，没有记录时返回 None（不会返回 0 版本的占位行）
    pub async fn get_version(
        &self,
        table_name: &str,
        entity_id: &str,
    ) -> Result<Option<LocalVersionSync>> {
        Self::get_with(&self.db, table_name, entity_id).await
    }

    pub(crate) async fn get_with<'e, E>(
        executor: E,
        table_name: &str,
        entity_id: &str,
    ) -> Result<Option<LocalVersionSync>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, LocalVersionSync>(
            r#"
            SELECT table_name, entity_id, version, version_id
            FROM local_version_sync
            WHERE table_name = ? AND entity_id = ?
            "#,
        )
        .bind(table_name)
        .bind(entity_id)
        .fetch_optional(executor)
        .await
        .context("查询版本同步信息失败")
    }

    /// 写入版本同步信息（按 table_name + entity_id 覆盖）
    pub async fn set_version(
        &self,
        table_name: &str,
        entity_id: &str,
        version: u64,
        version_id: &str,
    ) -> Result<()> {
        let version_sync = LocalVersionSync::new(table_name, entity_id, version, version_id);
        self.save_version_sync(&version_sync).await
    }

    /// 保存版本同步信息到数据库
    pub async fn save_version_sync(&self, version_sync: &LocalVersionSync) -> Result<()> {
        Self::save_with(&self.db, version_sync).await?;
        debug!(
            "[VersionDAO] 保存版本 {}/{} -> {} ({})",
            version_sync.table_name,
            version_sync.entity_id,
            version_sync.version,
            version_sync.version_id
        );
        Ok(())
    }

    pub(crate) async fn save_with<'e, E>(executor: E, version_sync: &LocalVersionSync) -> Result<()>
    where
        E: SqliteExecutor<'e>,
    {
        let version = i64::try_from(version_sync.version)
            .with_context(|| format!("版本号超出范围: {}", version_sync.version))?;

        let sql = r#"
            INSERT INTO local_version_sync (
                table_name, entity_id, version, version_id
            ) VALUES (?, ?, ?, ?)
            ON CONFLICT(table_name, entity_id) DO UPDATE SET
                version = excluded.version,
                version_id = excluded.version_id
        "#;

        sqlx::query(sql)
            .bind(&version_sync.table_name)
            .bind(&version_sync.entity_id)
            .bind(version)
            .bind(&version_sync.version_id)
            .execute(executor)
            .await
            .context("保存版本同步信息失败")?;
        Ok(())
    }

    /// 删除版本同步信息，返回记录是否存在
    pub async fn delete_version(&self, table_name: &str, entity_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM local_version_sync WHERE table_name = ? AND entity_id = ?
            "#,
        )
        .bind(table_name)
        .bind(entity_id)
        .execute(&self.db)
        .await
        .context("删除版本同步信息失败")?;
        Ok(result.rows_affected() > 0)
    }

    /// 列出某张表下的所有版本记录
    pub async fn list_versions(&self, table_name: &str) -> Result<Vec<LocalVersionSync>> {
        sqlx::query_as::<_, LocalVersionSync>(
            r#"
            SELECT table_name, entity_id, version, version_id
            FROM local_version_sync
            WHERE table_name = ?
            ORDER BY entity_id
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.db)
        .await
        .context("查询版本同步列表失败")
    }
}
