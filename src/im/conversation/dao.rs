//! 会话数据访问层（DAO）
//!
//! 负责 `local_conversations` 表的读写。写操作同时提供基于任意 executor 的版本，
//! 供 `LocalStore` 在事务中批量落地增量数据。

use crate::im::conversation::models::LocalConversation;
use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite, SqliteExecutor};
use tracing::{debug, info};

/// 会话 DAO（基于 sqlx）
#[derive(Clone)]
pub struct ConversationDao {
    db: Pool<Sqlite>,
}

impl ConversationDao {
    /// 创建新的会话 DAO
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 从数据库获取所有本地会话
    pub async fn get_all_conversations(&self) -> Result<Vec<LocalConversation>> {
        let conversations = sqlx::query_as::<_, LocalConversation>(
            r#"
            SELECT * FROM local_conversations ORDER BY conversation_id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("查询会话列表失败")?;

        debug!(
            "[ConvDAO] 获取本地会话列表，共 {} 个会话",
            conversations.len()
        );
        Ok(conversations)
    }

    /// 从数据库获取所有会话 ID
    pub async fn get_all_conversation_ids(&self) -> Result<Vec<String>> {
        let ids = Self::all_ids_with(&self.db).await?;
        debug!("[ConvDAO] 获取本地会话ID列表，共 {} 个", ids.len());
        Ok(ids)
    }

    pub(crate) async fn all_ids_with<'e, E>(executor: E) -> Result<Vec<String>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT conversation_id FROM local_conversations ORDER BY conversation_id
            "#,
        )
        .fetch_all(executor)
        .await
        .context("查询会话ID列表失败")
    }

    /// 根据会话ID查询单个会话
    pub async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<LocalConversation>> {
        Self::get_with(&self.db, conversation_id).await
    }

    pub(crate) async fn get_with<'e, E>(
        executor: E,
        conversation_id: &str,
    ) -> Result<Option<LocalConversation>>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, LocalConversation>(
            r#"
            SELECT * FROM local_conversations WHERE conversation_id = ?
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(executor)
        .await
        .with_context(|| format!("查询单个会话失败: {}", conversation_id))
    }

    /// 插入或更新会话到数据库（按 conversation_id 整行覆盖）
    pub async fn upsert_conversation(&self, conv: &LocalConversation) -> Result<()> {
        Self::upsert_with(&self.db, conv).await?;
        debug!("[ConvDAO] 写入会话: {}", conv.conversation_id);
        Ok(())
    }

    pub(crate) async fn upsert_with<'e, E>(executor: E, conv: &LocalConversation) -> Result<()>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = r#"
            INSERT INTO local_conversations (
                conversation_id,
                conversation_type,
                user_id,
                group_id,
                show_name,
                face_url,
                latest_msg,
                latest_msg_send_time,
                unread_count,
                recv_msg_opt,
                is_pinned,
                is_private_chat,
                burn_duration,
                group_at_type,
                is_not_in_group,
                update_unread_count_time,
                attached_info,
                ex,
                draft_text,
                draft_text_time,
                max_seq,
                min_seq,
                is_msg_destruct,
                msg_destruct_time
            ) VALUES (
                ?,?,?,?,?,?,
                ?,?,?,?,?,?,
                ?,?,?,?,?,?,
                ?,?,?,?,?,?
            )
            ON CONFLICT(conversation_id) DO UPDATE SET
                conversation_type = excluded.conversation_type,
                user_id = excluded.user_id,
                group_id = excluded.group_id,
                show_name = excluded.show_name,
                face_url = excluded.face_url,
                latest_msg = excluded.latest_msg,
                latest_msg_send_time = excluded.latest_msg_send_time,
                unread_count = excluded.unread_count,
                recv_msg_opt = excluded.recv_msg_opt,
                is_pinned = excluded.is_pinned,
                is_private_chat = excluded.is_private_chat,
                burn_duration = excluded.burn_duration,
                group_at_type = excluded.group_at_type,
                is_not_in_group = excluded.is_not_in_group,
                update_unread_count_time = excluded.update_unread_count_time,
                attached_info = excluded.attached_info,
                ex = excluded.ex,
                draft_text = excluded.draft_text,
                draft_text_time = excluded.draft_text_time,
                max_seq = excluded.max_seq,
                min_seq = excluded.min_seq,
                is_msg_destruct = excluded.is_msg_destruct,
                msg_destruct_time = excluded.msg_destruct_time
        "#;

        sqlx::query(sql)
            .bind(&conv.conversation_id)
            .bind(conv.conversation_type)
            .bind(&conv.user_id)
            .bind(&conv.group_id)
            .bind(&conv.show_name)
            .bind(&conv.face_url)
            .bind(&conv.latest_msg)
            .bind(conv.latest_msg_send_time)
            .bind(conv.unread_count)
            .bind(conv.recv_msg_opt)
            .bind(conv.is_pinned)
            .bind(conv.is_private_chat)
            .bind(conv.burn_duration)
            .bind(conv.group_at_type)
            .bind(conv.is_not_in_group)
            .bind(conv.update_unread_count_time)
            .bind(&conv.attached_info)
            .bind(&conv.ex)
            .bind(&conv.draft_text)
            .bind(conv.draft_text_time)
            .bind(conv.max_seq)
            .bind(conv.min_seq)
            .bind(conv.is_msg_destruct)
            .bind(conv.msg_destruct_time)
            .execute(executor)
            .await
            .with_context(|| format!("插入或更新会话失败: {}", conv.conversation_id))?;

        Ok(())
    }

    /// 从数据库删除会话，返回该会话是否存在
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<bool> {
        let deleted = Self::delete_with(&self.db, conversation_id).await?;
        if deleted {
            info!("[ConvDAO] 删除会话: {}", conversation_id);
        }
        Ok(deleted)
    }

    pub(crate) async fn delete_with<'e, E>(executor: E, conversation_id: &str) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM local_conversations WHERE conversation_id = ?
            "#,
        )
        .bind(conversation_id)
        .execute(executor)
        .await
        .with_context(|| format!("删除会话失败: {}", conversation_id))?;
        Ok(result.rows_affected() > 0)
    }

    /// 只改写未读数和 max_seq，其余字段保持不变
    pub(crate) async fn update_read_seq_with<'e, E>(
        executor: E,
        conversation_id: &str,
        unread_count: i32,
        max_seq: i64,
    ) -> Result<bool>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE local_conversations
            SET unread_count = ?, max_seq = ?
            WHERE conversation_id = ?
            "#,
        )
        .bind(unread_count)
        .bind(max_seq)
        .bind(conversation_id)
        .execute(executor)
        .await
        .with_context(|| format!("按 Seq 更新会话未读数失败: {}", conversation_id))?;
        Ok(result.rows_affected() > 0)
    }

    /// 获取总未读消息数（超出 i32 范围时按方向截断）
    pub async fn get_total_unread_count(&self) -> Result<i32> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(unread_count), 0) FROM local_conversations
            "#,
        )
        .fetch_one(&self.db)
        .await
        .context("查询总未读数失败")?;

        Ok(total.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// 获取会话列表（分页）
    ///
    /// 只返回有消息时间的会话；置顶优先，然后按 max(最新消息时间, 草稿时间) 降序。
    pub async fn get_conversation_list_split(
        &self,
        offset: usize,
        count: usize,
    ) -> Result<Vec<LocalConversation>> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let list = sqlx::query_as::<_, LocalConversation>(
            r#"
            SELECT * FROM local_conversations
            WHERE latest_msg_send_time > 0
            ORDER BY
                is_pinned DESC,
                MAX(latest_msg_send_time, draft_text_time) DESC,
                conversation_id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("分页查询会话列表失败")?;

        debug!(
            "[ConvDAO] 分页获取会话列表，偏移: {}, 数量: {}, 返回: {}",
            offset,
            count,
            list.len()
        );
        Ok(list)
    }

    /// 设置会话未读数，并记录更新时间（毫秒）
    pub async fn update_unread_count(&self, conversation_id: &str, unread_count: i32) -> Result<bool> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE local_conversations
            SET unread_count = ?, update_unread_count_time = ?
            WHERE conversation_id = ?
            "#,
        )
        .bind(unread_count)
        .bind(now)
        .bind(conversation_id)
        .execute(&self.db)
        .await
        .context("更新会话未读数失败")?;

        debug!(
            "[ConvDAO] 更新未读数: {} -> {}",
            conversation_id, unread_count
        );
        Ok(result.rows_affected() > 0)
    }

    /// 设置草稿，清空草稿时草稿时间同时归零
    pub async fn set_draft(&self, conversation_id: &str, draft_text: &str) -> Result<bool> {
        let draft_time = if draft_text.is_empty() {
            0
        } else {
            chrono::Utc::now().timestamp_millis()
        };
        let result = sqlx::query(
            r#"
            UPDATE local_conversations
            SET draft_text = ?, draft_text_time = ?
            WHERE conversation_id = ?
            "#,
        )
        .bind(draft_text)
        .bind(draft_time)
        .bind(conversation_id)
        .execute(&self.db)
        .await
        .context("更新会话草稿失败")?;
        Ok(result.rows_affected() > 0)
    }

    /// 设置会话置顶
    pub async fn set_pinned(&self, conversation_id: &str, is_pinned: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE local_conversations SET is_pinned = ? WHERE conversation_id = ?
            "#,
        )
        .bind(is_pinned)
        .bind(conversation_id)
        .execute(&self.db)
        .await
        .context("更新会话置顶状态失败")?;
        Ok(result.rows_affected() > 0)
    }
}
