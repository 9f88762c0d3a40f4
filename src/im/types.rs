//! 本地表名与各整数枚举字段的取值
//!
//! 这些字段在库中保持原始 `i32`，这里只提供已知取值，未知值原样保存。

/// 本地表名（同时作为 `local_version_sync.table_name` 的取值）
pub mod table {
    pub const LOCAL_CONVERSATIONS: &str = "local_conversations";
    pub const LOCAL_FRIENDS: &str = "local_friends";
    pub const LOCAL_VERSION_SYNC: &str = "local_version_sync";
}

/// 会话类型 `conversation_type`
pub mod conversation_type {
    /// 单聊
    pub const SINGLE: i32 = 1;
    /// 普通群聊
    pub const GROUP: i32 = 2;
    /// 超级群聊
    pub const SUPER_GROUP: i32 = 3;
    /// 通知会话
    pub const NOTIFICATION: i32 = 4;
}

/// 接收消息选项 `recv_msg_opt`
pub mod recv_msg_opt {
    /// 接收并通知
    pub const RECEIVE: i32 = 0;
    /// 接收但不通知
    pub const NOT_NOTIFY: i32 = 1;
    /// 屏蔽
    pub const NOT_RECEIVE: i32 = 2;
}

/// 群@类型 `group_at_type`
pub mod group_at_type {
    /// 无@
    pub const NORMAL: i32 = 0;
    /// @我
    pub const AT_ME: i32 = 1;
    /// @所有人
    pub const AT_ALL: i32 = 2;
}

/// 好友添加来源 `add_source`
pub mod add_source {
    /// 管理员导入
    pub const BY_IMPORT: i32 = 1;
    /// 好友申请通过
    pub const BY_APPLY: i32 = 2;
}

/// 会话类型的可读名称，主要用于日志和 CLI 输出
pub fn conversation_type_name(conversation_type: i32) -> &'static str {
    match conversation_type {
        conversation_type::SINGLE => "single",
        conversation_type::GROUP => "group",
        conversation_type::SUPER_GROUP => "super_group",
        conversation_type::NOTIFICATION => "notification",
        _ => "unknown",
    }
}
