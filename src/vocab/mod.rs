//! 生词本模块
//!
//! - `cache`: 内容侧的只读镜像，由推送整体替换
//! - `store`: 持久化存储（内存 / JSON 文件）
//! - `service`: 后台侧的生词本服务（增删、导入导出、推送）

pub mod cache;
pub mod service;
pub mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use cache::{VocabCache, VocabularySource};
pub use service::{
    export_file_name, AddOutcome, PushHub, PushOperation, TabId, VocabPush, VocabularyService,
    FULL_LIST_MARKER,
};
pub use store::{JsonFileStore, MemoryStore, VocabularyStore};

/// 规范化生词本键：去除首尾空白并转为小写
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// 用户的生词本：单词 → 译文
///
/// 键总是经过 [`normalize_word`] 处理，空键会被丢弃，因此查找时只需小写化。
/// 序列化格式是扁平的 JSON 对象。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Vocabulary {
    entries: BTreeMap<String, String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 大小写不敏感查找
    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(&normalize_word(word)).map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// 插入或更新，返回旧译文
    pub fn insert(&mut self, word: &str, translation: &str) -> Option<String> {
        let key = normalize_word(word);
        if key.is_empty() {
            return None;
        }
        self.entries.insert(key, translation.to_string())
    }

    pub fn remove(&mut self, word: &str) -> Option<String> {
        self.entries.remove(&normalize_word(word))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Vocabulary {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Vocabulary> for BTreeMap<String, String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vocabulary = Vocabulary::new();
        for (word, translation) in iter {
            let key = normalize_word(word.as_ref());
            if !key.is_empty() {
                vocabulary.entries.insert(key, translation.into());
            }
        }
        vocabulary
    }
}
