//! 后台消息处理
//!
//! 对应扩展的后台脚本：统一接收页面与选项页发来的消息，调用翻译服务和生词本服务。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{helpers, HighlightError, HighlightResult};
use crate::filters::is_single_vocab_word;
use crate::messaging::{
    BackgroundResponse, ContentMessage, ImportResponse, RemoveWordResponse, TranslateResponse,
    VocabResponse,
};
use crate::translation::Translator;
use crate::vocab::{Vocabulary, VocabularyService, VocabularySource};

pub struct BackgroundService {
    vocabulary: Arc<VocabularyService>,
    translator: Arc<dyn Translator>,
}

impl BackgroundService {
    pub fn new(vocabulary: Arc<VocabularyService>, translator: Arc<dyn Translator>) -> Self {
        Self {
            vocabulary,
            translator,
        }
    }

    pub fn vocabulary(&self) -> &Arc<VocabularyService> {
        &self.vocabulary
    }

    /// 处理一条消息；推送类消息不由后台处理，返回 `None`
    pub async fn handle(&self, message: ContentMessage) -> Option<BackgroundResponse> {
        match message {
            ContentMessage::GetVocabRequest => Some(BackgroundResponse::Vocab(VocabResponse {
                vocab: self.vocabulary.get_vocabulary().await,
            })),
            ContentMessage::RemoveWordRequest { word } => {
                Some(BackgroundResponse::RemoveWord(self.remove_word(word.as_deref()).await))
            }
            ContentMessage::TranslateRequest { text } => {
                Some(BackgroundResponse::Translate(self.translate(&text).await))
            }
            ContentMessage::ImportVocab { vocab_data } => {
                Some(BackgroundResponse::Import(self.import(&vocab_data).await))
            }
            ContentMessage::VocabPushed { .. } => None,
        }
    }

    /// 翻译文本；成功且原文是单个单词时加入生词本
    pub async fn translate(&self, text: &str) -> TranslateResponse {
        let response = self.translator.translate(text).await;

        if let TranslateResponse::Success { translation, .. } = &response {
            let query = text.trim();
            if is_single_vocab_word(query) {
                tracing::debug!("\"{}\" 是单个单词，加入生词本", query);
                if let Err(e) = self.vocabulary.add_word(query, translation).await {
                    helpers::log_error("加入生词本失败", &e);
                }
            } else {
                tracing::debug!("\"{}\" 不是单个单词，不加入生词本", query);
            }
        }

        response
    }

    pub async fn remove_word(&self, word: Option<&str>) -> RemoveWordResponse {
        let Some(word) = word.filter(|w| !w.trim().is_empty()) else {
            return RemoveWordResponse {
                success: false,
                message: None,
                error: Some("未提供要移除的单词。".to_string()),
            };
        };

        match self.vocabulary.remove_word(word).await {
            Ok(true) => RemoveWordResponse {
                success: true,
                message: Some(format!("单词 \"{}\" 已从生词本移除。", word)),
                error: None,
            },
            Ok(false) => RemoveWordResponse {
                success: false,
                message: Some(format!("未能移除单词 \"{}\" 或单词未找到。", word)),
                error: None,
            },
            Err(e) => {
                helpers::log_error("移除单词失败", &e);
                RemoveWordResponse {
                    success: false,
                    message: None,
                    error: Some("移除单词时发生内部错误。".to_string()),
                }
            }
        }
    }

    pub async fn import(&self, data: &serde_json::Value) -> ImportResponse {
        match self.vocabulary.import(data).await {
            Ok(count) => ImportResponse {
                success: true,
                message: Some(format!("单词本已成功导入 ({}个单词)。", count)),
                error: None,
            },
            Err(HighlightError::InvalidInput(reason)) => {
                tracing::warn!("导入数据无效: {}", reason);
                ImportResponse {
                    success: false,
                    message: None,
                    error: Some("提供的单词本数据无效或格式不正确。".to_string()),
                }
            }
            Err(e) => ImportResponse {
                success: false,
                message: None,
                error: Some(format!("存储导入的单词本失败: {}", e)),
            },
        }
    }
}

#[async_trait]
impl VocabularySource for BackgroundService {
    async fn fetch_vocabulary(&self) -> HighlightResult<Vocabulary> {
        self.vocabulary.fetch_vocabulary().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::messaging::TranslateErrorCode;
    use crate::vocab::{MemoryStore, PushHub};

    struct Echo;

    #[async_trait]
    impl Translator for Echo {
        async fn translate(&self, text: &str) -> TranslateResponse {
            if text.trim() == "fail" {
                TranslateResponse::failure(TranslateErrorCode::NoTranslation, "未获取到翻译结果。")
            } else {
                TranslateResponse::success(format!("译:{}", text.trim()))
            }
        }
    }

    fn background() -> BackgroundService {
        let service = VocabularyService::new(Arc::new(MemoryStore::new()), PushHub::new());
        BackgroundService::new(Arc::new(service), Arc::new(Echo))
    }

    #[tokio::test]
    async fn test_translate_adds_single_words_only() {
        let background = background();
        background.translate(" Hello ").await;
        background.translate("good morning").await;
        background.translate("fail").await;

        let vocabulary = background.vocabulary().get_vocabulary().await;
        assert_eq!(vocabulary.get("hello"), Some("译:Hello"));
        assert_eq!(vocabulary.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_word_responses() {
        let background = background();
        let missing = background
            .handle(ContentMessage::RemoveWordRequest { word: None })
            .await;
        match missing {
            Some(BackgroundResponse::RemoveWord(r)) => {
                assert!(!r.success);
                assert!(r.error.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let absent = background.remove_word(Some("ghost")).await;
        assert!(!absent.success);
        assert!(absent.error.is_none());
    }

    #[tokio::test]
    async fn test_import_and_get_vocab() {
        let background = background();
        let bad = background.import(&json!("nope")).await;
        assert!(!bad.success);

        let good = background.import(&json!({"cat": "猫"})).await;
        assert!(good.success);

        match background.handle(ContentMessage::GetVocabRequest).await {
            Some(BackgroundResponse::Vocab(r)) => assert_eq!(r.vocab.get("cat"), Some("猫")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
