//! 本地存储入口
//!
//! `LocalStore` 持有共享连接池和各表 DAO。增量/全量数据的落地在单个事务中完成，
//! 读方不会看到只写了一半的变更。

use crate::im::conversation::{ConversationDao, ConversationDelta, LocalConversation};
use crate::im::db::{self, StoreConfig};
use crate::im::friend::{FriendDao, FriendDelta, LocalFriend};
use crate::im::types::table;
use crate::im::version_sync::{LocalVersionSync, VersionSyncDao};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// 变更落地结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeltaOutcome {
    /// 服务器要求全量同步，本次未写入任何数据
    FullSyncRequired,
    Applied {
        /// 写入的不同主键数（insert 与 update 中重复的 ID 只算一次）
        upserted: usize,
        deleted: usize,
        /// 写入的新版本号；版本 ID 为空时不更新版本
        version: Option<u64>,
    },
}

/// 按 Seq 校正未读数的结果（ID 均已排序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadSeqOutcome {
    /// 未读数或 max_seq 发生变化的已有会话
    pub changed: Vec<String>,
    /// 本地原本不存在、按 Seq 新建的会话
    pub created: Vec<String>,
}

/// unread = max(max_seq - has_read_seq, 0)，超出 i32 时截断
fn unread_from_seqs(max_seq: i64, has_read_seq: i64) -> i32 {
    max_seq
        .saturating_sub(has_read_seq)
        .clamp(0, i32::MAX as i64) as i32
}

/// 本地存储（可 Clone，内部共享同一个连接池）
#[derive(Clone)]
pub struct LocalStore {
    db: Pool<Sqlite>,
    conversations: ConversationDao,
    versions: VersionSyncDao,
}

impl LocalStore {
    /// 打开（必要时创建）数据库并建表
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let db = db::create_sqlite_pool_with_schema(config).await?;
        Ok(Self::with_pool(db))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open(&StoreConfig::in_memory()).await
    }

    /// 使用已建好表的连接池
    pub fn with_pool(db: Pool<Sqlite>) -> Self {
        Self {
            conversations: ConversationDao::new(db.clone()),
            versions: VersionSyncDao::new(db.clone()),
            db,
        }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }

    pub fn conversations(&self) -> &ConversationDao {
        &self.conversations
    }

    /// 指定 owner 的好友 DAO
    pub fn friends(&self, owner_user_id: &str) -> FriendDao {
        FriendDao::new(self.db.clone(), owner_user_id.to_string())
    }

    pub fn versions(&self) -> &VersionSyncDao {
        &self.versions
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.db.close().await;
    }

    pub async fn upsert_conversation(&self, conv: &LocalConversation) -> Result<()> {
        self.conversations.upsert_conversation(conv).await
    }

    pub async fn upsert_friend(&self, friend: &LocalFriend) -> Result<()> {
        self.friends(&friend.owner_user_id).upsert_friend(friend).await
    }

    pub async fn get_version(
        &self,
        table_name: &str,
        entity_id: &str,
    ) -> Result<Option<LocalVersionSync>> {
        self.versions.get_version(table_name, entity_id).await
    }

    pub async fn set_version(
        &self,
        table_name: &str,
        entity_id: &str,
        version: u64,
        version_id: &str,
    ) -> Result<()> {
        self.versions
            .set_version(table_name, entity_id, version, version_id)
            .await
    }

    /// 落地增量会话变更，版本记录在 (local_conversations, owner_user_id) 下
    pub async fn apply_conversation_delta(
        &self,
        owner_user_id: &str,
        delta: &ConversationDelta,
    ) -> Result<DeltaOutcome> {
        info!(
            "[Store] 增量会话变更 - 全量: {}, 版本: {}, 版本ID: {}, 新增: {}, 更新: {}, 删除: {}",
            delta.full,
            delta.version,
            delta.version_id,
            delta.insert.len(),
            delta.update.len(),
            delta.delete.len()
        );
        if delta.full {
            warn!("[Store] 服务器要求全量同步会话，忽略本次增量");
            return Ok(DeltaOutcome::FullSyncRequired);
        }

        let mut tx = self.db.begin().await.context("开启事务失败")?;

        let mut written = HashSet::new();
        for conv in delta.insert.iter().chain(delta.update.iter()) {
            ConversationDao::upsert_with(&mut *tx, conv).await?;
            written.insert(conv.conversation_id.as_str());
        }
        let upserted = written.len();

        let mut deleted = 0;
        for id in &delta.delete {
            if ConversationDao::delete_with(&mut *tx, id).await? {
                deleted += 1;
            } else {
                debug!("[Store] 待删除会话本地不存在: {}", id);
            }
        }

        let version = if delta.version_id.is_empty() {
            None
        } else {
            let previous =
                VersionSyncDao::get_with(&mut *tx, table::LOCAL_CONVERSATIONS, owner_user_id)
                    .await?;
            let version = LocalVersionSync::next_version(previous.as_ref(), delta.version);
            let marker = LocalVersionSync::new(
                table::LOCAL_CONVERSATIONS,
                owner_user_id,
                version,
                delta.version_id.as_str(),
            );
            VersionSyncDao::save_with(&mut *tx, &marker).await?;
            Some(version)
        };

        tx.commit().await.context("提交会话增量事务失败")?;

        info!(
            "[Store] 会话增量已落地 - 写入: {}, 删除: {}, 版本: {:?}",
            upserted, deleted, version
        );
        Ok(DeltaOutcome::Applied {
            upserted,
            deleted,
            version,
        })
    }

    /// 落地增量好友变更，所有行都写到 owner_user_id 名下
    pub async fn apply_friend_delta(
        &self,
        owner_user_id: &str,
        delta: &FriendDelta,
    ) -> Result<DeltaOutcome> {
        info!(
            "[Store] 增量好友变更 - 全量: {}, 版本: {}, 版本ID: {}, 新增: {}, 更新: {}, 删除: {}",
            delta.full,
            delta.version,
            delta.version_id,
            delta.insert.len(),
            delta.update.len(),
            delta.delete.len()
        );
        if delta.full {
            warn!("[Store] 服务器要求全量同步好友，忽略本次增量");
            return Ok(DeltaOutcome::FullSyncRequired);
        }

        let mut tx = self.db.begin().await.context("开启事务失败")?;

        let mut written = HashSet::new();
        for friend in delta.insert.iter().chain(delta.update.iter()) {
            FriendDao::upsert_with(&mut *tx, &owned_by(friend, owner_user_id)).await?;
            written.insert(friend.friend_user_id.as_str());
        }
        let upserted = written.len();

        let mut deleted = 0;
        for friend_user_id in &delta.delete {
            if FriendDao::delete_with(&mut *tx, owner_user_id, friend_user_id).await? {
                deleted += 1;
            }
        }

        let version = if delta.version_id.is_empty() {
            None
        } else {
            let previous =
                VersionSyncDao::get_with(&mut *tx, table::LOCAL_FRIENDS, owner_user_id).await?;
            let version = LocalVersionSync::next_version(previous.as_ref(), delta.version);
            let marker = LocalVersionSync::new(
                table::LOCAL_FRIENDS,
                owner_user_id,
                version,
                delta.version_id.as_str(),
            );
            VersionSyncDao::save_with(&mut *tx, &marker).await?;
            Some(version)
        };

        tx.commit().await.context("提交好友增量事务失败")?;

        info!(
            "[Store] 好友增量已落地 - 写入: {}, 删除: {}, 版本: {:?}",
            upserted, deleted, version
        );
        Ok(DeltaOutcome::Applied {
            upserted,
            deleted,
            version,
        })
    }

    /// 按服务器返回的 (max_seq, has_read_seq) 校正会话未读数
    ///
    /// 已有会话只在未读数或 max_seq 变化时改写这两列；本地缺失的会话按默认值新建。
    /// 全部写入在同一事务中完成。
    pub async fn apply_read_seqs(
        &self,
        seqs: &HashMap<String, (i64, i64)>,
    ) -> Result<ReadSeqOutcome> {
        info!("[Store] 按 Seq 校正未读数，共 {} 个会话", seqs.len());
        if seqs.is_empty() {
            return Ok(ReadSeqOutcome::default());
        }

        let mut ids: Vec<&String> = seqs.keys().collect();
        ids.sort();

        let mut outcome = ReadSeqOutcome::default();
        let mut tx = self.db.begin().await.context("开启事务失败")?;

        for conversation_id in ids {
            let (max_seq, has_read_seq) = seqs[conversation_id];
            let unread = unread_from_seqs(max_seq, has_read_seq);

            match ConversationDao::get_with(&mut *tx, conversation_id).await? {
                Some(local) if local.unread_count == unread && local.max_seq == max_seq => {
                    debug!(
                        "[Store] 会话未读数无需更新: {}, unreadCount={}, maxSeq={}",
                        conversation_id, unread, max_seq
                    );
                }
                Some(local) => {
                    debug!(
                        "[Store] 校正会话未读数: {}, 未读: {} -> {}, maxSeq: {} -> {}, hasReadSeq: {}",
                        conversation_id,
                        local.unread_count,
                        unread,
                        local.max_seq,
                        max_seq,
                        has_read_seq
                    );
                    ConversationDao::update_read_seq_with(&mut *tx, conversation_id, unread, max_seq)
                        .await?;
                    outcome.changed.push(conversation_id.clone());
                }
                None => {
                    let conv = LocalConversation {
                        unread_count: unread,
                        max_seq,
                        ..LocalConversation::new(conversation_id.as_str())
                    };
                    ConversationDao::upsert_with(&mut *tx, &conv).await?;
                    outcome.created.push(conversation_id.clone());
                }
            }
        }

        tx.commit().await.context("提交未读数校正事务失败")?;

        info!(
            "[Store] 未读数校正完成 - 更新: {}, 新建: {}",
            outcome.changed.len(),
            outcome.created.len()
        );
        Ok(outcome)
    }

    /// 全量替换本地会话：删除快照中不存在的会话，写入其余会话，并更新版本
    pub async fn replace_all_conversations(
        &self,
        owner_user_id: &str,
        conversations: &[LocalConversation],
        version: u64,
        version_id: &str,
    ) -> Result<DeltaOutcome> {
        let keep: HashSet<&str> = conversations
            .iter()
            .map(|c| c.conversation_id.as_str())
            .collect();

        let mut tx = self.db.begin().await.context("开启事务失败")?;

        let mut deleted = 0;
        for id in ConversationDao::all_ids_with(&mut *tx).await? {
            if !keep.contains(id.as_str()) && ConversationDao::delete_with(&mut *tx, &id).await? {
                deleted += 1;
            }
        }
        for conv in conversations {
            ConversationDao::upsert_with(&mut *tx, conv).await?;
        }
        let marker = LocalVersionSync::new(
            table::LOCAL_CONVERSATIONS,
            owner_user_id,
            version,
            version_id,
        );
        VersionSyncDao::save_with(&mut *tx, &marker).await?;

        tx.commit().await.context("提交会话全量事务失败")?;

        info!(
            "[Store] 会话全量已落地 - 写入: {}, 删除: {}, 版本: {}",
            conversations.len(),
            deleted,
            version
        );
        Ok(DeltaOutcome::Applied {
            upserted: conversations.len(),
            deleted,
            version: Some(version),
        })
    }

    /// 全量替换 owner 名下的好友
    pub async fn replace_all_friends(
        &self,
        owner_user_id: &str,
        friends: &[LocalFriend],
        version: u64,
        version_id: &str,
    ) -> Result<DeltaOutcome> {
        let keep: HashSet<&str> = friends.iter().map(|f| f.friend_user_id.as_str()).collect();

        let mut tx = self.db.begin().await.context("开启事务失败")?;

        let mut deleted = 0;
        for id in FriendDao::all_ids_with(&mut *tx, owner_user_id).await? {
            if !keep.contains(id.as_str())
                && FriendDao::delete_with(&mut *tx, owner_user_id, &id).await?
            {
                deleted += 1;
            }
        }
        for friend in friends {
            let friend = owned_by(friend, owner_user_id);
            FriendDao::upsert_with(&mut *tx, &friend).await?;
        }
        let marker = LocalVersionSync::new(table::LOCAL_FRIENDS, owner_user_id, version, version_id);
        VersionSyncDao::save_with(&mut *tx, &marker).await?;

        tx.commit().await.context("提交好友全量事务失败")?;

        info!(
            "[Store] 好友全量已落地 - 写入: {}, 删除: {}, 版本: {}",
            friends.len(),
            deleted,
            version
        );
        Ok(DeltaOutcome::Applied {
            upserted: friends.len(),
            deleted,
            version: Some(version),
        })
    }
}

/// 服务器返回的好友行可能缺 ownerUserID，统一写成当前 owner
fn owned_by(friend: &LocalFriend, owner_user_id: &str) -> LocalFriend {
    if friend.owner_user_id == owner_user_id {
        friend.clone()
    } else {
        LocalFriend {
            owner_user_id: owner_user_id.to_string(),
            ..friend.clone()
        }
    }
}
