//! 版本同步模型定义

use crate::im::serialization::deserialize_null_default;
use serde::{Deserialize, Serialize};

/// 版本同步信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocalVersionSync {
    /// 表名
    #[serde(rename = "tableName")]
    pub table_name: String,
    /// 实体 ID（通常是用户 ID）
    #[serde(rename = "entityID")]
    pub entity_id: String,
    /// 版本号（库中以 INTEGER 保存）
    #[sqlx(try_from = "i64")]
    pub version: u64,
    /// 版本 ID（服务器下发的游标）
    #[serde(rename = "versionID", default, deserialize_with = "deserialize_null_default")]
    pub version_id: String,
}

impl LocalVersionSync {
    pub fn new(
        table_name: impl Into<String>,
        entity_id: impl Into<String>,
        version: u64,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            entity_id: entity_id.into(),
            version,
            version_id: version_id.into(),
        }
    }

    /// 远端游标是否已经越过本地：版本 ID 变化，或版本号更大
    pub fn is_behind(&self, remote_version: u64, remote_version_id: &str) -> bool {
        self.version_id != remote_version_id || remote_version > self.version
    }

    /// 增量数据落地后的新版本号：服务器给出有效版本号时直接使用，否则本地加一
    pub fn next_version(previous: Option<&LocalVersionSync>, remote_version: u64) -> u64 {
        if remote_version > 0 {
            remote_version
        } else {
            previous.map(|v| v.version.saturating_add(1)).unwrap_or(1)
        }
    }
}
