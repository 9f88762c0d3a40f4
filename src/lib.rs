pub mod im;

// 重新导出常用类型和函数，方便外部使用
pub use im::{
    conversation::{ConversationDao, ConversationDelta, LocalConversation},
    db::{apply_schema, create_sqlite_pool, create_sqlite_pool_with_schema, StoreConfig},
    friend::{FriendDao, FriendDelta, LocalFriend},
    store::{DeltaOutcome, LocalStore, ReadSeqOutcome},
    version_sync::{LocalVersionSync, VersionSyncDao},
};
