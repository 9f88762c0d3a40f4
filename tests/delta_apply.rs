mod common;

use common::{count_rows, memory_store};
use openim_local_store::im::types::table;
use openim_local_store::{
    ConversationDelta, DeltaOutcome, FriendDelta, LocalConversation, LocalFriend, ReadSeqOutcome,
};
use std::collections::HashMap;

#[tokio::test]
async fn conversation_delta_from_server_json() {
    let store = memory_store().await;
    store
        .upsert_conversation(&LocalConversation::new("gone"))
        .await
        .unwrap();

    let delta: ConversationDelta = serde_json::from_str(
        r#"{
            "version": 5,
            "versionID": "vid-5",
            "full": false,
            "delete": ["gone", "never-existed"],
            "insert": [{"conversationID": "si_u1_u2", "conversationType": 1, "userID": "u2"}],
            "update": [{"conversationID": "sg_g1", "conversationType": 3, "groupID": "g1", "isPinned": true}]
        }"#,
    )
    .unwrap();

    let outcome = store.apply_conversation_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 2,
            deleted: 1,
            version: Some(5)
        }
    );

    let ids = store.conversations().get_all_conversation_ids().await.unwrap();
    assert_eq!(ids, vec!["sg_g1", "si_u1_u2"]);

    let marker = store
        .get_version(table::LOCAL_CONVERSATIONS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.version, 5);
    assert_eq!(marker.version_id, "vid-5");
}

#[tokio::test]
async fn full_delta_writes_nothing() {
    let store = memory_store().await;
    let delta = ConversationDelta {
        full: true,
        version: 9,
        version_id: "v9".into(),
        insert: vec![LocalConversation::new("c1")],
        ..Default::default()
    };

    let outcome = store.apply_conversation_delta("u1", &delta).await.unwrap();
    assert_eq!(outcome, DeltaOutcome::FullSyncRequired);
    assert_eq!(count_rows(&store, "local_conversations").await, 0);
    assert_eq!(count_rows(&store, "local_version_sync").await, 0);
}

#[tokio::test]
async fn zero_version_increments_previous() {
    let store = memory_store().await;
    store
        .set_version(table::LOCAL_CONVERSATIONS, "u1", 3, "old")
        .await
        .unwrap();

    let delta = ConversationDelta {
        version: 0,
        version_id: "new".into(),
        update: vec![LocalConversation::new("c1")],
        ..Default::default()
    };
    let outcome = store.apply_conversation_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 1,
            deleted: 0,
            version: Some(4)
        }
    );
}

#[tokio::test]
async fn empty_version_id_keeps_marker() {
    let store = memory_store().await;
    store
        .set_version(table::LOCAL_CONVERSATIONS, "u1", 3, "keep")
        .await
        .unwrap();

    let delta = ConversationDelta {
        version: 8,
        insert: vec![LocalConversation::new("c1")],
        ..Default::default()
    };
    let outcome = store.apply_conversation_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 1,
            deleted: 0,
            version: None
        }
    );
    let marker = store
        .get_version(table::LOCAL_CONVERSATIONS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.version, 3);
    assert_eq!(marker.version_id, "keep");
}

#[tokio::test]
async fn failed_delta_rolls_back() {
    let store = memory_store().await;
    store
        .set_version(table::LOCAL_CONVERSATIONS, "u1", 1, "v1")
        .await
        .unwrap();

    // 版本号超出 INTEGER 范围，写版本时失败，前面写入的会话必须回滚
    let delta = ConversationDelta {
        version: u64::MAX,
        version_id: "bad".into(),
        insert: vec![LocalConversation::new("c1")],
        ..Default::default()
    };
    assert!(store.apply_conversation_delta("u1", &delta).await.is_err());

    assert_eq!(count_rows(&store, "local_conversations").await, 0);
    let marker = store
        .get_version(table::LOCAL_CONVERSATIONS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.version_id, "v1");
}

#[tokio::test]
async fn friend_delta_is_written_under_owner() {
    let store = memory_store().await;
    store.upsert_friend(&LocalFriend::new("u1", "old")).await.unwrap();

    let delta: FriendDelta = serde_json::from_str(
        r#"{
            "full": false,
            "version": 2,
            "versionID": "f2",
            "delete": ["old"],
            "insert": [{"userID": "u2", "nickname": "小二"}],
            "update": null
        }"#,
    )
    .unwrap();

    let outcome = store.apply_friend_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 1,
            deleted: 1,
            version: Some(2)
        }
    );

    let friends = store.friends("u1").get_all_friends().await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].owner_user_id, "u1");
    assert_eq!(friends[0].nickname, "小二");

    let marker = store
        .get_version(table::LOCAL_FRIENDS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.version, 2);
}

#[tokio::test]
async fn replace_all_conversations_prunes_missing() {
    let store = memory_store().await;
    for id in ["a", "b", "c"] {
        store
            .upsert_conversation(&LocalConversation::new(id))
            .await
            .unwrap();
    }

    let mut b = LocalConversation::new("b");
    b.unread_count = 4;
    let snapshot = vec![b, LocalConversation::new("d")];

    let outcome = store
        .replace_all_conversations("u1", &snapshot, 12, "full-12")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 2,
            deleted: 2,
            version: Some(12)
        }
    );

    let dao = store.conversations();
    assert_eq!(dao.get_all_conversation_ids().await.unwrap(), vec!["b", "d"]);
    assert_eq!(dao.get_total_unread_count().await.unwrap(), 4);
    let marker = store
        .get_version(table::LOCAL_CONVERSATIONS, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.version_id, "full-12");
}

#[tokio::test]
async fn replace_all_friends_leaves_other_owners_alone() {
    let store = memory_store().await;
    store.upsert_friend(&LocalFriend::new("u1", "x")).await.unwrap();
    store.upsert_friend(&LocalFriend::new("u9", "x")).await.unwrap();

    let outcome = store
        .replace_all_friends("u1", &[LocalFriend::new("", "y")], 1, "f1")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 1,
            deleted: 1,
            version: Some(1)
        }
    );

    assert_eq!(store.friends("u1").get_all_friend_ids().await.unwrap(), vec!["y"]);
    assert_eq!(store.friends("u9").get_all_friend_ids().await.unwrap(), vec!["x"]);
}

#[tokio::test]
async fn id_in_both_insert_and_update_counts_once() {
    let store = memory_store().await;

    let mut updated = LocalConversation::new("c1");
    updated.show_name = "after".into();
    let delta = ConversationDelta {
        insert: vec![LocalConversation::new("c1")],
        update: vec![updated],
        ..Default::default()
    };
    let outcome = store.apply_conversation_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 1,
            deleted: 0,
            version: None
        }
    );
    assert_eq!(count_rows(&store, "local_conversations").await, 1);
    // update 在 insert 之后写入
    let c1 = store
        .conversations()
        .get_conversation_by_id("c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c1.show_name, "after");

    let delta = FriendDelta {
        insert: vec![LocalFriend::new("", "u2")],
        update: vec![LocalFriend::new("", "u2"), LocalFriend::new("", "u3")],
        ..Default::default()
    };
    let outcome = store.apply_friend_delta("u1", &delta).await.unwrap();
    assert_eq!(
        outcome,
        DeltaOutcome::Applied {
            upserted: 2,
            deleted: 0,
            version: None
        }
    );
    assert_eq!(count_rows(&store, "local_friends").await, 2);
}

#[tokio::test]
async fn read_seqs_correct_unread_and_create_missing() {
    let store = memory_store().await;

    let mut behind = LocalConversation::new("behind");
    behind.unread_count = 1;
    behind.max_seq = 10;
    behind.show_name = "群聊".into();
    behind.is_pinned = true;
    store.upsert_conversation(&behind).await.unwrap();

    let mut current = LocalConversation::new("current");
    current.unread_count = 3;
    current.max_seq = 8;
    store.upsert_conversation(&current).await.unwrap();

    let seqs: HashMap<String, (i64, i64)> = HashMap::from([
        ("behind".to_string(), (20, 15)),
        ("current".to_string(), (8, 5)),
        ("new".to_string(), (7, 2)),
    ]);
    let outcome = store.apply_read_seqs(&seqs).await.unwrap();
    assert_eq!(
        outcome,
        ReadSeqOutcome {
            changed: vec!["behind".to_string()],
            created: vec!["new".to_string()],
        }
    );

    let dao = store.conversations();
    let behind = dao.get_conversation_by_id("behind").await.unwrap().unwrap();
    assert_eq!(behind.unread_count, 5);
    assert_eq!(behind.max_seq, 20);
    // 其他字段不受影响
    assert_eq!(behind.show_name, "群聊");
    assert!(behind.is_pinned);

    let created = dao.get_conversation_by_id("new").await.unwrap().unwrap();
    assert_eq!(created.unread_count, 5);
    assert_eq!(created.max_seq, 7);

    assert_eq!(dao.get_total_unread_count().await.unwrap(), 13);
}

#[tokio::test]
async fn read_seq_ahead_of_max_seq_means_no_unread() {
    let store = memory_store().await;
    let mut conv = LocalConversation::new("c1");
    conv.unread_count = 4;
    conv.max_seq = 9;
    store.upsert_conversation(&conv).await.unwrap();

    let seqs = HashMap::from([("c1".to_string(), (9, 12))]);
    let outcome = store.apply_read_seqs(&seqs).await.unwrap();
    assert_eq!(outcome.changed, vec!["c1"]);
    assert!(outcome.created.is_empty());

    let c1 = store
        .conversations()
        .get_conversation_by_id("c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c1.unread_count, 0);
    assert_eq!(c1.max_seq, 9);

    // 再次应用同样的 Seq 不产生变更
    let outcome = store.apply_read_seqs(&seqs).await.unwrap();
    assert_eq!(outcome, ReadSeqOutcome::default());
}

#[tokio::test]
async fn read_seqs_from_json_map() {
    let store = memory_store().await;
    let raw = format!(r#"{{"sg_g1": [{}, 0]}}"#, i64::MAX);
    let seqs: HashMap<String, (i64, i64)> = serde_json::from_str(&raw).unwrap();
    let outcome = store.apply_read_seqs(&seqs).await.unwrap();
    assert_eq!(outcome.created, vec!["sg_g1"]);

    let conv = store
        .conversations()
        .get_conversation_by_id("sg_g1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conv.unread_count, i32::MAX);
    assert_eq!(conv.max_seq, i64::MAX);
}
