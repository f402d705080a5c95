//! 页面与后台之间的消息
//!
//! 线上格式与浏览器扩展保持一致：请求以 `action` 字段区分，响应是扁平对象。

use serde::{Deserialize, Serialize};

use crate::vocab::{PushOperation, VocabPush, Vocabulary};

/// 发往页面或后台的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ContentMessage {
    /// 后台推送的完整生词本
    #[serde(rename = "vocabUpdated")]
    VocabPushed {
        #[serde(rename = "newVocab")]
        new_vocab: Vocabulary,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<PushOperation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word: Option<String>,
    },

    #[serde(rename = "getVocab")]
    GetVocabRequest,

    #[serde(rename = "removeWord")]
    RemoveWordRequest {
        #[serde(default)]
        word: Option<String>,
    },

    #[serde(rename = "translate")]
    TranslateRequest { text: String },

    #[serde(rename = "importVocab")]
    ImportVocab {
        #[serde(rename = "vocabData", default)]
        vocab_data: serde_json::Value,
    },
}

impl From<VocabPush> for ContentMessage {
    fn from(push: VocabPush) -> Self {
        ContentMessage::VocabPushed {
            new_vocab: push.vocabulary,
            operation: Some(push.operation),
            word: Some(push.changed),
        }
    }
}

/// 翻译失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslateErrorCode {
    ApiKeysMissing,
    ApiError,
    NoTranslation,
    FetchError,
}

impl TranslateErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslateErrorCode::ApiKeysMissing => "API_KEYS_MISSING",
            TranslateErrorCode::ApiError => "API_ERROR",
            TranslateErrorCode::NoTranslation => "NO_TRANSLATION",
            TranslateErrorCode::FetchError => "FETCH_ERROR",
        }
    }
}

/// 翻译响应：`{translation, phonetic?}` 或 `{error, message}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranslateResponse {
    Failure {
        error: TranslateErrorCode,
        message: String,
    },
    Success {
        translation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phonetic: Option<String>,
    },
}

impl TranslateResponse {
    pub fn success(translation: impl Into<String>) -> Self {
        TranslateResponse::Success {
            translation: translation.into(),
            phonetic: None,
        }
    }

    pub fn failure(error: TranslateErrorCode, message: impl Into<String>) -> Self {
        TranslateResponse::Failure {
            error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslateResponse::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabResponse {
    pub vocab: Vocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveWordResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 页面确认已处理推送
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAck {
    pub status: String,
}

/// 后台对一条消息的回复
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundResponse {
    Vocab(VocabResponse),
    RemoveWord(RemoveWordResponse),
    Translate(TranslateResponse),
    Import(ImportResponse),
    Ack(PushAck),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_wire_names() {
        let message: ContentMessage =
            serde_json::from_value(json!({"action": "translate", "text": "hello"})).unwrap();
        assert_eq!(
            message,
            ContentMessage::TranslateRequest {
                text: "hello".into()
            }
        );

        let message: ContentMessage =
            serde_json::from_value(json!({"action": "removeWord"})).unwrap();
        assert_eq!(message, ContentMessage::RemoveWordRequest { word: None });

        let message: ContentMessage = serde_json::from_value(json!({"action": "getVocab"})).unwrap();
        assert_eq!(message, ContentMessage::GetVocabRequest);
    }

    #[test]
    fn test_push_message_shape() {
        let push = VocabPush {
            vocabulary: [("cat", "猫")].into_iter().collect(),
            operation: PushOperation::ImportFull,
            changed: "full_list".into(),
        };
        let value = serde_json::to_value(ContentMessage::from(push)).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "vocabUpdated",
                "newVocab": {"cat": "猫"},
                "operation": "import_full",
                "word": "full_list"
            })
        );
    }

    #[test]
    fn test_translate_response_shapes() {
        let ok: TranslateResponse = serde_json::from_value(json!({"translation": "你好"})).unwrap();
        assert_eq!(ok, TranslateResponse::success("你好"));

        let err = TranslateResponse::failure(TranslateErrorCode::ApiKeysMissing, "缺少密钥");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"error": "API_KEYS_MISSING", "message": "缺少密钥"})
        );
        let back: TranslateResponse = serde_json::from_value(json!({
            "error": "FETCH_ERROR", "message": "x"
        }))
        .unwrap();
        assert!(!back.is_success());
    }
}
