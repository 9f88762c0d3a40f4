//! 好友本地模型定义

use crate::im::serialization::{deserialize_flag, deserialize_null_default, deserialize_vec_or_null};
use serde::{Deserialize, Serialize};

/// 本地好友数据结构
///
/// (owner_user_id, friend_user_id) 为关系主键；不校验 owner 与 friend 是否相同。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocalFriend {
    #[serde(rename = "ownerUserID", default, deserialize_with = "deserialize_null_default")]
    pub owner_user_id: String,
    #[serde(rename = "userID")]
    pub friend_user_id: String,
    /// 本地备注
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub remark: String,
    /// 创建时间（毫秒）
    #[serde(rename = "createTime", default)]
    pub create_time: i64,
    /// 添加来源，见 `types::add_source`
    #[serde(rename = "addSource", default)]
    pub add_source: i32,
    #[serde(rename = "operatorUserID", default, deserialize_with = "deserialize_null_default")]
    pub operator_user_id: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub nickname: String,
    #[serde(rename = "faceURL", default, deserialize_with = "deserialize_null_default")]
    pub face_url: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub ex: String,
    #[serde(rename = "attachedInfo", default, deserialize_with = "deserialize_null_default")]
    pub attached_info: String,
    #[serde(rename = "isPinned", default, deserialize_with = "deserialize_flag")]
    pub is_pinned: bool,
}

impl LocalFriend {
    pub fn new(owner_user_id: impl Into<String>, friend_user_id: impl Into<String>) -> Self {
        Self {
            owner_user_id: owner_user_id.into(),
            friend_user_id: friend_user_id.into(),
            ..Default::default()
        }
    }
}

/// 增量好友变更（可直接从服务器增量接口的 data 反序列化）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendDelta {
    #[serde(default)]
    pub full: bool,
    #[serde(default)]
    pub version: u64,
    #[serde(rename = "versionID", default, deserialize_with = "deserialize_null_default")]
    pub version_id: String,
    /// 被删除好友的 userID
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub delete: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub insert: Vec<LocalFriend>,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub update: Vec<LocalFriend>,
}
