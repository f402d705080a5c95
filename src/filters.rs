//! 文本过滤器模块
//!
//! 判断选中文本是否值得显示翻译图标，以及翻译结果是否应加入生词本

use crate::config::constants;

/// 选区过滤器
#[derive(Debug, Clone)]
pub struct TextFilter {
    /// 选区最大字符数（不含）
    max_selection_chars: usize,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new(constants::MAX_SELECTION_CHARS)
    }
}

impl TextFilter {
    pub fn new(max_selection_chars: usize) -> Self {
        Self {
            max_selection_chars,
        }
    }

    /// 判断一次选区是否可以显示翻译图标
    ///
    /// 除英文判定外，还拒绝跨段落（含换行）和过长的选区。
    pub fn accepts_selection(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.contains('\n') {
            return false;
        }
        if trimmed.chars().count() >= self.max_selection_chars {
            return false;
        }
        is_likely_english_phrase(trimmed)
    }
}

/// 判断文本是否像英文
pub fn is_likely_english_phrase(text: &str) -> bool {
    let trimmed = text.trim();
    let length = trimmed.chars().count();

    if length == 0 || length > constants::MAX_PHRASE_CHARS {
        return false;
    }
    // 单个字符只接受 a 和 I
    if length == 1 && !matches!(trimmed, "a" | "A" | "i" | "I") {
        return false;
    }

    if length > 1 {
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        if trimmed.chars().all(is_punctuation) {
            return false;
        }
    }

    let letters = trimmed.chars().filter(char::is_ascii_alphabetic).count();
    let printable = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if letters == 0 || printable == 0 {
        return false;
    }

    letters as f32 / printable as f32 > constants::ENGLISH_RATIO_THRESHOLD
}

/// 非单词字符且非空白
fn is_punctuation(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace())
}

/// 翻译成功后是否把原文加入生词本：单个纯字母单词
pub fn is_single_vocab_word(text: &str) -> bool {
    let trimmed = text.trim();
    let length = trimmed.chars().count();

    length > 0
        && length < constants::MAX_VOCAB_WORD_CHARS
        && !trimmed.contains(' ')
        && trimmed.chars().all(|c| c.is_ascii_alphabetic())
}
