//! 内容侧生词本镜像
//!
//! 只读：生词本的修改只经由后台服务完成，这里通过推送整体替换。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{helpers, HighlightResult};

use super::Vocabulary;

/// 提供完整生词本的服务
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn fetch_vocabulary(&self) -> HighlightResult<Vocabulary>;
}

/// 页面上下文持有的生词本缓存
///
/// 当前映射以 `Arc` 保存，替换是单次赋值，读者要么看到旧表要么看到新表。
#[derive(Debug, Clone, Default)]
pub struct VocabCache {
    current: Arc<Vocabulary>,
    generation: u64,
}

impl VocabCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从服务拉取并整体替换；失败时按空表处理
    pub async fn load(&mut self, source: &dyn VocabularySource) -> Arc<Vocabulary> {
        let vocabulary = match source.fetch_vocabulary().await {
            Ok(vocabulary) => vocabulary,
            Err(e) => {
                helpers::log_error("获取生词本失败，按空生词本处理", &e);
                Vocabulary::new()
            }
        };

        tracing::info!("生词本已加载: {} 个单词", vocabulary.len());
        self.replace(vocabulary);
        self.snapshot()
    }

    /// 收到推送时整体替换，不做增量合并
    pub fn apply_push(&mut self, vocabulary: Vocabulary) {
        tracing::debug!("收到生词本推送: {} 个单词", vocabulary.len());
        self.replace(vocabulary);
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.current.get(word)
    }

    /// 当前映射的引用快照
    pub fn snapshot(&self) -> Arc<Vocabulary> {
        Arc::clone(&self.current)
    }

    /// 每次替换递增
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn replace(&mut self, vocabulary: Vocabulary) {
        self.current = Arc::new(vocabulary);
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HighlightError;

    struct Fixed(HighlightResult<Vocabulary>);

    #[async_trait]
    impl VocabularySource for Fixed {
        async fn fetch_vocabulary(&self) -> HighlightResult<Vocabulary> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_load_replaces_entirely() {
        let mut cache = VocabCache::new();
        cache.apply_push([("old", "旧")].into_iter().collect());

        let source = Fixed(Ok([("Hello", "你好")].into_iter().collect()));
        cache.load(&source).await;

        assert_eq!(cache.get("HELLO"), Some("你好"));
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.generation(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty() {
        let mut cache = VocabCache::new();
        cache.apply_push([("cat", "猫")].into_iter().collect());

        let source = Fixed(Err(HighlightError::Storage("down".into())));
        let snapshot = cache.load(&source).await;
        assert!(snapshot.is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_survives_push() {
        let mut cache = VocabCache::new();
        cache.apply_push([("cat", "猫")].into_iter().collect());
        let snapshot = cache.snapshot();

        cache.apply_push(Vocabulary::new());
        assert_eq!(snapshot.get("cat"), Some("猫"));
        assert!(cache.is_empty());
    }
}
