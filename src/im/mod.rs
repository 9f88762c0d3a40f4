pub mod conversation;
pub mod db;
pub mod friend;
pub mod serialization;
pub mod store;
pub mod types;
pub mod version_sync;

// 重新导出本地存储相关类型
pub use db::StoreConfig;
pub use store::{DeltaOutcome, LocalStore, ReadSeqOutcome};
