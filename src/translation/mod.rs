//! 翻译服务
//!
//! - [`Translator`]: 页面侧依赖的窄接口，失败以响应中的错误码表达而不是 `Err`
//! - [`BaiduTranslator`]: 基于百度翻译开放平台的实现

pub mod baidu;

use async_trait::async_trait;

use crate::messaging::TranslateResponse;

pub use baidu::{interpret_response, sign, BaiduTranslator};

/// 翻译一段文本
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> TranslateResponse;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for std::sync::Arc<T> {
    async fn translate(&self, text: &str) -> TranslateResponse {
        (**self).translate(text).await
    }
}
