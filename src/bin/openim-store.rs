//! OpenIM 本地存储 CLI
//!
//! 用于初始化、查看和手工修改本地缓存库（会话 / 好友 / 版本同步）。
//! 结果以 JSON 输出到 stdout，日志输出到 stderr（可选同时写文件）。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openim_local_store::im::db::{self, StoreConfig};
use openim_local_store::im::types::conversation_type_name;
use openim_local_store::{ConversationDelta, FriendDelta, LocalConversation, LocalFriend, LocalStore};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

/// OpenIM 本地存储 CLI
#[derive(Parser, Debug)]
#[command(name = "openim-store")]
#[command(about = "OpenIM 本地存储 CLI - 查看和维护本地会话/好友/版本缓存", long_about = None)]
struct Args {
    /// 数据库路径或 sqlite: URL
    #[arg(long, env = "OPENIM_STORE_DB", default_value = "openim.db")]
    db: String,

    /// 日志级别（默认: warn,openim_local_store=info）
    #[arg(long, default_value = "warn,openim_local_store=info")]
    log_level: String,

    /// 同时把日志写到文件（追加）
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 建表（可重复执行）
    Init,
    /// 打印当前表结构
    Schema,
    /// 会话相关操作
    #[command(subcommand)]
    Conv(ConvCommand),
    /// 好友相关操作
    Friend {
        /// 好友关系的拥有者
        #[arg(long)]
        owner: String,
        #[command(subcommand)]
        command: FriendCommand,
    },
    /// 版本同步记录相关操作
    #[command(subcommand)]
    Version(VersionCommand),
    /// 落地一份增量会话变更（JSON，来自文件或 stdin）
    ApplyConvDelta {
        #[arg(long)]
        owner: String,
        input: Option<PathBuf>,
    },
    /// 落地一份增量好友变更（JSON，来自文件或 stdin）
    ApplyFriendDelta {
        #[arg(long)]
        owner: String,
        input: Option<PathBuf>,
    },
    /// 按 Seq 校正未读数，输入形如 {"si_u1_u2": [maxSeq, hasReadSeq]}
    ApplyReadSeqs { input: Option<PathBuf> },
}

#[derive(Subcommand, Debug)]
enum ConvCommand {
    /// 会话列表（置顶优先、按时间倒序，只含有消息的会话）
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 20)]
        count: usize,
        /// 列出全部会话（不过滤、不排序）
        #[arg(long)]
        all: bool,
    },
    Get { conversation_id: String },
    /// 写入一个会话（JSON，来自文件或 stdin）
    Put { input: Option<PathBuf> },
    Delete { conversation_id: String },
    /// 总未读数
    Unread,
    SetUnread { conversation_id: String, count: i32 },
    /// 设置草稿，不带文本则清空
    Draft {
        conversation_id: String,
        #[arg(default_value = "")]
        text: String,
    },
    Pin {
        conversation_id: String,
        /// 取消置顶
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FriendCommand {
    List,
    Get { friend_user_id: String },
    /// 写入一个好友（JSON，来自文件或 stdin）
    Put { input: Option<PathBuf> },
    Delete { friend_user_id: String },
}

#[derive(Subcommand, Debug)]
enum VersionCommand {
    Get { table_name: String, entity_id: String },
    Set {
        table_name: String,
        entity_id: String,
        version: u64,
        #[arg(default_value = "")]
        version_id: String,
    },
    Delete { table_name: String, entity_id: String },
    List { table_name: String },
}

/// 初始化日志（stderr，可选同时写文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// 从文件读取输入，未指定文件时读 stdin
fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("读取输入文件失败: {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("读取 stdin 失败")?;
            Ok(buf)
        }
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(input: Option<&PathBuf>) -> Result<T> {
    let raw = read_input(input)?;
    serde_json::from_str(&raw).context("解析输入 JSON 失败")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_conv(store: &LocalStore, command: ConvCommand) -> Result<()> {
    let dao = store.conversations();
    match command {
        ConvCommand::List { offset, count, all } => {
            let list = if all {
                dao.get_all_conversations().await?
            } else {
                dao.get_conversation_list_split(offset, count).await?
            };
            for conv in &list {
                debug!(
                    "[CLI] {} ({}) 未读: {}",
                    conv.conversation_id,
                    conversation_type_name(conv.conversation_type),
                    conv.unread_count
                );
            }
            print_json(&list)
        }
        ConvCommand::Get { conversation_id } => {
            print_json(&dao.get_conversation_by_id(&conversation_id).await?)
        }
        ConvCommand::Put { input } => {
            let conv: LocalConversation = parse_input(input.as_ref())?;
            store.upsert_conversation(&conv).await?;
            info!("[CLI] 已写入会话: {}", conv.conversation_id);
            print_json(&conv)
        }
        ConvCommand::Delete { conversation_id } => {
            print_json(&dao.delete_conversation(&conversation_id).await?)
        }
        ConvCommand::Unread => print_json(&dao.get_total_unread_count().await?),
        ConvCommand::SetUnread {
            conversation_id,
            count,
        } => print_json(&dao.update_unread_count(&conversation_id, count).await?),
        ConvCommand::Draft {
            conversation_id,
            text,
        } => print_json(&dao.set_draft(&conversation_id, &text).await?),
        ConvCommand::Pin {
            conversation_id,
            off,
        } => print_json(&dao.set_pinned(&conversation_id, !off).await?),
    }
}

async fn run_friend(store: &LocalStore, owner: &str, command: FriendCommand) -> Result<()> {
    let dao = store.friends(owner);
    match command {
        FriendCommand::List => print_json(&dao.get_all_friends().await?),
        FriendCommand::Get { friend_user_id } => print_json(&dao.get_friend(&friend_user_id).await?),
        FriendCommand::Put { input } => {
            let mut friend: LocalFriend = parse_input(input.as_ref())?;
            if friend.owner_user_id.is_empty() {
                friend.owner_user_id = owner.to_string();
            }
            store.upsert_friend(&friend).await?;
            info!(
                "[CLI] 已写入好友: {} -> {}",
                friend.owner_user_id, friend.friend_user_id
            );
            print_json(&friend)
        }
        FriendCommand::Delete { friend_user_id } => {
            print_json(&dao.delete_friend(&friend_user_id).await?)
        }
    }
}

async fn run_version(store: &LocalStore, command: VersionCommand) -> Result<()> {
    let dao = store.versions();
    match command {
        VersionCommand::Get {
            table_name,
            entity_id,
        } => print_json(&dao.get_version(&table_name, &entity_id).await?),
        VersionCommand::Set {
            table_name,
            entity_id,
            version,
            version_id,
        } => {
            dao.set_version(&table_name, &entity_id, version, &version_id)
                .await?;
            print_json(&dao.get_version(&table_name, &entity_id).await?)
        }
        VersionCommand::Delete {
            table_name,
            entity_id,
        } => print_json(&dao.delete_version(&table_name, &entity_id).await?),
        VersionCommand::List { table_name } => print_json(&dao.list_versions(&table_name).await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.log_file.as_ref())?;

    let config = StoreConfig::new(args.db.clone());
    info!("[CLI] 打开本地库: {}", config.db_url());
    let store = LocalStore::open(&config).await?;

    let result = match args.command {
        Command::Init => {
            info!("[CLI] 表结构已就绪");
            let names: Vec<String> = db::schema_snapshot(store.pool())
                .await?
                .into_iter()
                .map(|object| object.name)
                .collect();
            print_json(&names)
        }
        Command::Schema => {
            for object in db::schema_snapshot(store.pool()).await? {
                println!("-- {} {}", object.kind, object.name);
                if let Some(sql) = object.sql {
                    println!("{};\n", sql);
                }
            }
            Ok(())
        }
        Command::Conv(command) => run_conv(&store, command).await,
        Command::Friend { owner, command } => run_friend(&store, &owner, command).await,
        Command::Version(command) => run_version(&store, command).await,
        Command::ApplyConvDelta { owner, input } => {
            let delta: ConversationDelta = parse_input(input.as_ref())?;
            print_json(&store.apply_conversation_delta(&owner, &delta).await?)
        }
        Command::ApplyFriendDelta { owner, input } => {
            let delta: FriendDelta = parse_input(input.as_ref())?;
            print_json(&store.apply_friend_delta(&owner, &delta).await?)
        }
        Command::ApplyReadSeqs { input } => {
            let seqs: HashMap<String, (i64, i64)> = parse_input(input.as_ref())?;
            print_json(&store.apply_read_seqs(&seqs).await?)
        }
    };

    store.close().await;
    result
}
