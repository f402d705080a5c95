//! 生词匹配引擎
//!
//! 所有键按长度降序拼成一个交替正则，以单词边界锚定、大小写不敏感地扫描。
//! 正则采用最左优先语义：同一起点上先尝试更长的键，命中后不回溯，
//! 因此紧随长键之后、同一起点上的短键不会再被考虑。

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::{HighlightError, HighlightResult};
use crate::vocab::Vocabulary;

/// 一次匹配结果，`start`/`end` 为字节偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    /// 文档中的原始写法（保留大小写）
    pub surface_text: String,
    /// 小写化后的生词本键
    pub key: String,
    pub translation: String,
}

/// 针对某个生词本快照编译好的匹配器
#[derive(Debug, Clone)]
pub struct MatchEngine {
    vocabulary: Arc<Vocabulary>,
    pattern: Option<Regex>,
}

impl MatchEngine {
    pub fn new(vocabulary: Arc<Vocabulary>) -> HighlightResult<Self> {
        let pattern = if vocabulary.is_empty() {
            None
        } else {
            Some(build_pattern(&vocabulary)?)
        };

        Ok(Self {
            vocabulary,
            pattern,
        })
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    /// 从左到右查找所有不重叠的匹配
    pub fn find_matches(&self, text: &str) -> Vec<Match> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };

        pattern
            .find_iter(text)
            .filter_map(|m| {
                let surface_text = m.as_str();
                let key = surface_text.to_lowercase();
                let translation = self.vocabulary.get(&key)?;
                Some(Match {
                    start: m.start(),
                    end: m.end(),
                    surface_text: surface_text.to_string(),
                    key,
                    translation: translation.to_string(),
                })
            })
            .collect()
    }
}

/// 对单段文本执行一次性匹配
pub fn find_matches(text: &str, vocabulary: &Vocabulary) -> Vec<Match> {
    if vocabulary.is_empty() {
        return Vec::new();
    }

    match MatchEngine::new(Arc::new(vocabulary.clone())) {
        Ok(engine) => engine.find_matches(text),
        Err(e) => {
            tracing::warn!("无法构建生词匹配正则: {}", e);
            Vec::new()
        }
    }
}

fn build_pattern(vocabulary: &Vocabulary) -> HighlightResult<Regex> {
    let mut keys: Vec<&str> = vocabulary.keys().collect();
    // 长键优先；等长时按字典序，保证模式稳定
    keys.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    let alternation = keys
        .iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
        .case_insensitive(true)
        .size_limit(64 * (1 << 20))
        .build()
        .map_err(|e| HighlightError::Internal(format!("生词匹配正则编译失败: {}", e)))
}
