//! 好友数据访问层（DAO）
//!
//! 负责 `local_friends` 表的读写。读取与删除都限定在当前登录用户（owner）名下。

use crate::im::friend::models::LocalFriend;
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite, SqliteExecutor};
use tracing::{debug, info};

/// 好友 DAO（基于 sqlx）
#[derive(Clone)]
pub struct FriendDao {
    db: Pool<Sqlite>,
    user_id: String,
}

impl FriendDao {
    /// 创建新的好友 DAO
    pub fn new(db: Pool<Sqlite>, user_id: String) -> Self {
        Self { db, user_id }
    }

    pub fn owner_user_id(&self) -> &str {
        &self.user_id
    }

    /// 从数据库获取所有好友
    pub async fn get_all_friends(&self) -> Result<Vec<LocalFriend>> {
        let friends = sqlx::query_as::<_, LocalFriend>(
            r#"
            SELECT * FROM local_friends
            WHERE owner_user_id = ?
            ORDER BY friend_user_id
            "#,
        )
        .bind(&self.user_id)
        .fetch_all(&self.db)
        .await
        .context("查询好友列表失败")?;

        debug!(
            "[FriendDAO] 获取本地好友列表，共 {} 个好友",
            friends.len()
        );
        Ok(friends)
    }

    /// 获取本地所有好友的 userID 列表
    pub async fn get_all_friend_ids(&self) -> Result<Vec<String>> {
        let ids = Self::all_ids_with(&self.db, &self.user_id).await?;
        debug!("[FriendDAO] 获取本地好友ID列表，共 {} 个", ids.len());
        Ok(ids)
    }

    pub(crate) async fn all_ids_with<'e, E>(executor: E, owner_user_id: &str) -> Result<Vec<String>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT friend_user_id FROM local_friends
            WHERE owner_user_id = ?
            ORDER BY friend_user_id
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(executor)
        .await
        .context("查询好友ID列表失败")
    }

    /// 查询单个好友
    pub async fn get_friend(&self, friend_user_id: &str) -> Result<Option<LocalFriend>> {
        sqlx::query_as::<_, LocalFriend>(
            r#"
            SELECT * FROM local_friends
            WHERE owner_user_id = ? AND friend_user_id = ?
            "#,
        )
        .bind(&self.user_id)
        .bind(friend_user_id)
        .fetch_optional(&self.db)
        .await
        .context("查询单个好友失败")
    }

    /// 插入或更新好友到数据库（按 owner_user_id + friend_user_id 整行覆盖）
    pub async fn upsert_friend(&self, f: &LocalFriend) -> Result<()> {
        Self::upsert_with(&self.db, f).await?;
        debug!(
            "[FriendDAO] 写入好友: {} -> {}",
            f.owner_user_id, f.friend_user_id
        );
        Ok(())
    }

    pub(crate) async fn upsert_with<'e, E>(executor: E, f: &LocalFriend) -> Result<()>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = r#"
            INSERT INTO local_friends (
                owner_user_id,
                friend_user_id,
                remark,
                create_time,
                add_source,
                operator_user_id,
                nickname,
                face_url,
                ex,
                attached_info,
                is_pinned
            ) VALUES (
                ?,?,?,?,?,?,?,?,?,?,?
            )
            ON CONFLICT(owner_user_id, friend_user_id) DO UPDATE SET
                remark = excluded.remark,
                create_time = excluded.create_time,
                add_source = excluded.add_source,
                operator_user_id = excluded.operator_user_id,
                nickname = excluded.nickname,
                face_url = excluded.face_url,
                ex = excluded.ex,
                attached_info = excluded.attached_info,
                is_pinned = excluded.is_pinned
        "#;

        sqlx::query(sql)
            .bind(&f.owner_user_id)
            .bind(&f.friend_user_id)
            .bind(&f.remark)
            .bind(f.create_time)
            .bind(f.add_source)
            .bind(&f.operator_user_id)
            .bind(&f.nickname)
            .bind(&f.face_url)
            .bind(&f.ex)
            .bind(&f.attached_info)
            .bind(f.is_pinned)
            .execute(executor)
            .await
            .with_context(|| {
                format!(
                    "插入或更新好友失败: {} -> {}",
                    f.owner_user_id, f.friend_user_id
                )
            })?;
        Ok(())
    }

    /// 从数据库删除好友，返回该好友是否存在
    pub async fn delete_friend(&self, friend_user_id: &str) -> Result<bool> {
        let deleted = Self::delete_with(&self.db, &self.user_id, friend_user_id).await?;
        if deleted {
            info!("[FriendDAO] 删除好友: {}", friend_user_id);
        }
        Ok(deleted)
    }

    pub(crate) async fn delete_with<'e, E>(
        executor: E,
        owner_user_id: &str,
        friend_user_id: &str,
    ) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM local_friends
            WHERE owner_user_id = ? AND friend_user_id = ?
            "#,
        )
        .bind(owner_user_id)
        .bind(friend_user_id)
        .execute(executor)
        .await
        .context("删除好友失败")?;
        Ok(result.rows_affected() > 0)
    }
}
