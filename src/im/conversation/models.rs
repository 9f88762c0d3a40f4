//! 会话本地模型定义

use crate::im::serialization::{deserialize_flag, deserialize_null_default, deserialize_vec_or_null};
use serde::{Deserialize, Serialize};

/// 本地会话数据结构
/// 可以直接从服务器返回的 JSON 反序列化，缺失的字段使用默认值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LocalConversation {
    /// 会话 ID
    #[serde(rename = "conversationID")]
    pub conversation_id: String,
    /// 会话类型，见 `types::conversation_type`
    #[serde(default)]
    pub conversation_type: i32,
    /// 用户 ID（单聊时使用）
    #[serde(rename = "userID", default, deserialize_with = "deserialize_null_default")]
    pub user_id: String,
    /// 群组 ID（群聊时使用）
    #[serde(rename = "groupID", default, deserialize_with = "deserialize_null_default")]
    pub group_id: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub show_name: String,
    #[serde(rename = "faceURL", default, deserialize_with = "deserialize_null_default")]
    pub face_url: String,
    /// 最新消息摘要（序列化后的消息）
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub latest_msg: String,
    #[serde(default)]
    pub latest_msg_send_time: i64,
    #[serde(default)]
    pub unread_count: i32,
    /// 接收消息选项，见 `types::recv_msg_opt`
    #[serde(default)]
    pub recv_msg_opt: i32,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_pinned: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_private_chat: bool,
    /// 阅后即焚时长（秒）
    #[serde(default)]
    pub burn_duration: i32,
    /// 群@类型，见 `types::group_at_type`
    #[serde(default)]
    pub group_at_type: i32,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_not_in_group: bool,
    #[serde(default)]
    pub update_unread_count_time: i64,
    /// 附加信息（不解析，原样保存）
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub attached_info: String,
    /// 扩展信息（不解析，原样保存）
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub ex: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub draft_text: String,
    #[serde(default)]
    pub draft_text_time: i64,
    /// 本地已落地的最大序列号
    #[serde(default)]
    pub max_seq: i64,
    /// 本地已落地的最小序列号
    #[serde(default)]
    pub min_seq: i64,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_msg_destruct: bool,
    #[serde(default)]
    pub msg_destruct_time: i64,
}

impl LocalConversation {
    /// 只带会话 ID 的空会话，其余字段为默认值
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Default::default()
        }
    }

    /// 会话列表排序使用的时间：最新消息时间和草稿时间取较大者
    pub fn sort_time(&self) -> i64 {
        self.latest_msg_send_time.max(self.draft_text_time)
    }
}

/// 增量会话变更（可直接从服务器增量接口的 data 反序列化）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDelta {
    #[serde(default)]
    pub version: u64,
    #[serde(rename = "versionID", default, deserialize_with = "deserialize_null_default")]
    pub version_id: String,
    /// 服务器要求全量同步
    #[serde(default)]
    pub full: bool,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub delete: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub insert: Vec<LocalConversation>,
    #[serde(default, deserialize_with = "deserialize_vec_or_null")]
    pub update: Vec<LocalConversation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let conv: LocalConversation = serde_json::from_str(
            r#"{"conversationID":"si_a_b","conversationType":1,"userID":"b","isPinned":1,"ex":null}"#,
        )
        .unwrap();
        assert_eq!(conv.conversation_id, "si_a_b");
        assert_eq!(conv.user_id, "b");
        assert!(conv.is_pinned);
        assert_eq!(conv.ex, "");
        assert_eq!(conv.group_id, "");
        assert_eq!(conv.max_seq, 0);
    }

    #[test]
    fn sort_time_prefers_newer_draft() {
        let mut conv = LocalConversation::new("c1");
        conv.latest_msg_send_time = 100;
        conv.draft_text_time = 250;
        assert_eq!(conv.sort_time(), 250);
    }

    #[test]
    fn delta_with_null_arrays() {
        let delta: ConversationDelta = serde_json::from_str(
            r#"{"version":3,"versionID":"v3","full":false,"delete":null,"insert":null,"update":[{"conversationID":"c1"}]}"#,
        )
        .unwrap();
        assert_eq!(delta.version, 3);
        assert!(delta.delete.is_empty());
        assert!(delta.insert.is_empty());
        assert_eq!(delta.update.len(), 1);
    }
}
