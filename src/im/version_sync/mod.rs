//! 版本同步模块
//!
//! `local_version_sync` 表按 (table_name, entity_id) 记录每张表、每个实体的增量同步游标

pub mod dao;
pub mod models;

pub use dao::VersionSyncDao;
pub use models::LocalVersionSync;
