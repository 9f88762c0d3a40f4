//! 联系人（好友）模块
//!
//! 本地好友表 `local_friends` 的模型与数据访问

pub mod dao;
pub mod models;

// 重新导出主要类型
pub use dao::FriendDao;
pub use models::{FriendDelta, LocalFriend};
