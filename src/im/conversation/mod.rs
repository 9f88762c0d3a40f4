//! 会话模块
//!
//! 本地会话表 `local_conversations` 的模型与数据访问

pub mod dao;
pub mod models;

// 重新导出主要类型
pub use dao::ConversationDao;
pub use models::{ConversationDelta, LocalConversation};
