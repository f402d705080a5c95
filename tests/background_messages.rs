//! 后台消息处理与生词本持久化测试

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use std::sync::Arc;

use serde_json::json;

use common::{vocabulary, FakeTranslator, TestBackground};
use vocab_highlighter::background::BackgroundService;
use vocab_highlighter::messaging::{BackgroundResponse, ContentMessage, TranslateResponse};
use vocab_highlighter::vocab::{
    JsonFileStore, PushHub, PushOperation, VocabularyService, VocabularyStore, FULL_LIST_MARKER,
};

/// 翻译请求经消息分发，单词加入生词本并推送到所有标签页
#[tokio::test]
async fn test_translate_message_adds_word_and_notifies_tabs() {
    let env = TestBackground::new(FakeTranslator::new().with("Serendipity", "机缘巧合"), vocabulary(&[]));
    let mut first = env.hub.subscribe(1);
    let mut second = env.hub.subscribe(2);

    let response = env
        .background
        .handle(ContentMessage::TranslateRequest {
            text: "  Serendipity ".to_string(),
        })
        .await;

    assert_eq!(
        response,
        Some(BackgroundResponse::Translate(TranslateResponse::success("机缘巧合")))
    );
    assert_eq!(env.vocabulary().await.get("serendipity"), Some("机缘巧合"));

    for rx in [&mut first, &mut second] {
        let push = rx.try_recv().unwrap();
        assert_eq!(push.operation, PushOperation::Add);
        assert_eq!(push.changed, "serendipity");
        assert_eq!(push.vocabulary.len(), 1);
    }
}

/// 翻译失败不修改生词本
#[tokio::test]
async fn test_failed_translation_does_not_save() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[]));
    let mut rx = env.hub.subscribe(1);

    let response = env.background.translate("unknown").await;

    assert!(!response.is_success());
    assert!(env.vocabulary().await.is_empty());
    assert!(rx.try_recv().is_err());
}

/// 移除单词的各种回复
#[tokio::test]
async fn test_remove_word_responses() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[("cat", "猫")]));

    let missing = env.background.remove_word(None).await;
    assert!(!missing.success);
    assert_eq!(missing.error.as_deref(), Some("未提供要移除的单词。"));

    let absent = env.background.remove_word(Some("dog")).await;
    assert!(!absent.success);
    assert!(absent.message.unwrap().contains("dog"));

    let removed = env.background.remove_word(Some("CAT")).await;
    assert!(removed.success);
    assert!(env.vocabulary().await.is_empty());
}

/// 导入整体替换生词本，推送带全量标记
#[tokio::test]
async fn test_import_replaces_vocabulary() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[("old", "旧")]));
    let mut rx = env.hub.subscribe(3);

    let response = env
        .background
        .handle(ContentMessage::ImportVocab {
            vocab_data: json!({"Apple": "苹果", "banana": "香蕉"}),
        })
        .await;

    match response {
        Some(BackgroundResponse::Import(import)) => assert!(import.success),
        other => panic!("unexpected response: {:?}", other),
    }

    let stored = env.vocabulary().await;
    assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["apple", "banana"]);

    let push = rx.try_recv().unwrap();
    assert_eq!(push.operation, PushOperation::ImportFull);
    assert_eq!(push.changed, FULL_LIST_MARKER);
}

/// 格式不正确的导入被拒绝，原生词本保持不变
#[tokio::test]
async fn test_invalid_import_is_rejected() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[("old", "旧")]));

    for data in [json!(["not", "an", "object"]), json!({"word": 42})] {
        let response = env.background.import(&data).await;
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("提供的单词本数据无效或格式不正确。")
        );
    }

    assert_eq!(env.vocabulary().await.get("old"), Some("旧"));
}

/// 推送消息不由后台处理
#[tokio::test]
async fn test_push_message_is_ignored_by_background() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[]));
    let response = env
        .background
        .handle(ContentMessage::VocabPushed {
            new_vocab: vocabulary(&[("x", "y")]),
            operation: None,
            word: None,
        })
        .await;
    assert_eq!(response, None);
}

/// 关闭的标签页在下一次推送时被清理
#[tokio::test]
async fn test_closed_tab_is_dropped_from_hub() {
    let env = TestBackground::new(FakeTranslator::new(), vocabulary(&[]));
    let _open = env.hub.subscribe(1);
    drop(env.hub.subscribe(2));
    assert_eq!(env.hub.subscriber_count(), 2);

    env.background
        .vocabulary()
        .add_word("river", "河")
        .await
        .unwrap();

    assert_eq!(env.hub.subscriber_count(), 1);
}

/// 文件存储在服务重建后仍保留数据
#[tokio::test]
async fn test_json_file_store_persists_across_services() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("vocabulary.json");

    let build = || {
        let store = Arc::new(JsonFileStore::new(&path));
        let service = Arc::new(VocabularyService::new(store, PushHub::new()));
        BackgroundService::new(service, Arc::new(FakeTranslator::new().with("tide", "潮汐")))
    };

    let background = build();
    assert!(background.translate("tide").await.is_success());
    drop(background);

    let reopened = build();
    assert_eq!(
        reopened.vocabulary().get_vocabulary().await.get("tide"),
        Some("潮汐")
    );

    let exported: serde_json::Value =
        serde_json::from_str(&reopened.vocabulary().export().await.unwrap()).unwrap();
    assert_eq!(exported, json!({"tide": "潮汐"}));

    let raw = JsonFileStore::new(&path).load().await.unwrap();
    assert_eq!(raw.len(), 1);
}
