//! 百度翻译 API
//!
//! 请求签名为 `md5(appid + q + salt + secret)`，salt 取当前毫秒时间戳。

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::Deserialize;

use crate::config::HighlighterConfig;
use crate::error::HighlightResult;
use crate::messaging::{TranslateErrorCode, TranslateResponse};

use super::Translator;

const KEYS_MISSING_MESSAGE: &str = "百度翻译API密钥未在插件选项中设置。";
const NO_TRANSLATION_MESSAGE: &str = "未获取到翻译结果。";

pub struct BaiduTranslator {
    client: reqwest::Client,
    api_url: String,
    app_id: Option<String>,
    secret_key: Option<String>,
    from: String,
    to: String,
}

impl BaiduTranslator {
    pub fn from_config(config: &HighlighterConfig) -> HighlightResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.translate_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            app_id: non_empty(config.app_id.as_deref()),
            secret_key: non_empty(config.secret_key.as_deref()),
            from: config.source_lang.clone(),
            to: config.target_lang.clone(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.app_id.is_some() && self.secret_key.is_some()
    }

    async fn request(&self, app_id: &str, secret_key: &str, text: &str) -> Result<String, String> {
        let salt = current_millis().to_string();
        let signature = sign(app_id, text, &salt, secret_key);

        tracing::debug!("请求百度翻译: {} 个字符", text.chars().count());
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", text),
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
                ("appid", app_id),
                ("salt", salt.as_str()),
                ("sign", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!(
                "API HTTP error! status: {}, body: {}",
                status.as_u16(),
                body
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl Translator for BaiduTranslator {
    async fn translate(&self, text: &str) -> TranslateResponse {
        let (Some(app_id), Some(secret_key)) = (&self.app_id, &self.secret_key) else {
            tracing::error!("翻译失败: 未配置百度翻译 API 密钥");
            return TranslateResponse::failure(TranslateErrorCode::ApiKeysMissing, KEYS_MISSING_MESSAGE);
        };

        match self.request(app_id, secret_key, text).await {
            Ok(body) => interpret_response(&body),
            Err(reason) => {
                tracing::warn!("翻译请求失败: {}", reason);
                fetch_error(&reason)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    error_code: Option<serde_json::Value>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    trans_result: Vec<ApiTranslation>,
}

#[derive(Debug, Deserialize)]
struct ApiTranslation {
    dst: String,
}

/// 解析百度翻译的响应体
pub fn interpret_response(body: &str) -> TranslateResponse {
    let reply: ApiReply = match serde_json::from_str(body) {
        Ok(reply) => reply,
        Err(e) => return fetch_error(&e.to_string()),
    };

    if let Some(code) = reply.error_code.as_ref().and_then(error_code_text) {
        let message = reply.error_msg.unwrap_or_default();
        tracing::warn!("翻译API返回错误 {}: {}", code, message);
        return TranslateResponse::failure(
            TranslateErrorCode::ApiError,
            format!("翻译API错误: {} (代码: {})", message, code),
        );
    }

    match reply.trans_result.into_iter().next() {
        Some(first) => TranslateResponse::success(first.dst),
        None => TranslateResponse::failure(TranslateErrorCode::NoTranslation, NO_TRANSLATION_MESSAGE),
    }
}

/// 请求签名（小写十六进制 MD5）
pub fn sign(app_id: &str, query: &str, salt: &str, secret_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(app_id.as_bytes());
    hasher.update(query.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.update(secret_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `error_code` 按真值判定：`null`、`false`、数值 0 与空串视为成功，
/// 其余一律视为错误（字符串 `"0"` 也算错误）
fn error_code_text(code: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match code {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn fetch_error(reason: &str) -> TranslateResponse {
    TranslateResponse::failure(
        TranslateErrorCode::FetchError,
        format!("请求翻译API失败: {}", reason),
    )
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn current_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_reference() {
        // 百度开放平台文档中的示例
        assert_eq!(
            sign("2015063000000001", "apple", "1435660288", "12345678"),
            "f89f9594663708c1605f3d736d01d2d4"
        );
    }

    #[test]
    fn test_interpret_success() {
        let body = r#"{"from":"en","to":"zh","trans_result":[{"src":"hello","dst":"你好"}]}"#;
        assert_eq!(interpret_response(body), TranslateResponse::success("你好"));
    }

    #[test]
    fn test_interpret_api_error() {
        let body = r#"{"error_code":"54001","error_msg":"Invalid Sign"}"#;
        match interpret_response(body) {
            TranslateResponse::Failure { error, message } => {
                assert_eq!(error, TranslateErrorCode::ApiError);
                assert_eq!(message, "翻译API错误: Invalid Sign (代码: 54001)");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_code_truthiness() {
        let ok = r#"{"trans_result":[{"src":"cat","dst":"猫"}]}"#;
        assert_eq!(interpret_response(ok), TranslateResponse::success("猫".to_string()));

        for code in [r#"0"#, r#"0.0"#, r#""""#, r#"null"#, r#"false"#] {
            let body = format!(r#"{{"error_code":{},"trans_result":[{{"dst":"猫"}}]}}"#, code);
            assert!(
                matches!(interpret_response(&body), TranslateResponse::Success { .. }),
                "error_code {} should count as success",
                code
            );
        }

        for (code, shown) in [(r#""0""#, "0"), (r#"52003"#, "52003"), (r#"true"#, "true")] {
            let body = format!(r#"{{"error_code":{},"error_msg":"x"}}"#, code);
            match interpret_response(&body) {
                TranslateResponse::Failure { error, message } => {
                    assert_eq!(error, TranslateErrorCode::ApiError);
                    assert!(message.ends_with(&format!("(代码: {})", shown)));
                }
                other => panic!("error_code {} gave {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_interpret_empty_and_garbage() {
        assert_eq!(
            interpret_response(r#"{"trans_result":[]}"#),
            TranslateResponse::failure(TranslateErrorCode::NoTranslation, NO_TRANSLATION_MESSAGE)
        );
        assert!(matches!(
            interpret_response("<html>"),
            TranslateResponse::Failure {
                error: TranslateErrorCode::FetchError,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_keys() {
        let config = HighlighterConfig {
            app_id: Some("  ".into()),
            ..HighlighterConfig::default()
        };
        let translator = BaiduTranslator::from_config(&config).unwrap();
        assert!(!translator.has_credentials());
        assert!(matches!(
            translator.translate("hello").await,
            TranslateResponse::Failure {
                error: TranslateErrorCode::ApiKeysMissing,
                ..
            }
        ));
    }
}
