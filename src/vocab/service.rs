//! 后台生词本服务
//!
//! 负责增删、导入导出，并在每次修改后把完整生词本推送给所有已订阅的页面。

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{helpers, HighlightError, HighlightResult};

use super::cache::VocabularySource;
use super::store::VocabularyStore;
use super::{normalize_word, Vocabulary};

/// 页面（标签页）标识
pub type TabId = u64;

/// 导入时推送的 `changed` 取值
pub const FULL_LIST_MARKER: &str = "full_list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOperation {
    Add,
    Remove,
    ImportFull,
}

/// 推送给页面的完整生词本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabPush {
    pub vocabulary: Vocabulary,
    pub operation: PushOperation,
    /// 发生变化的键；整本导入时为 `full_list`
    pub changed: String,
}

/// `add_word` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Updated,
    Unchanged,
}

/// 页面订阅表
///
/// 每个页面一条无界通道；发送失败说明页面已关闭，记录日志后移除，
/// 其余页面照常通知。
#[derive(Clone, Default)]
pub struct PushHub {
    tabs: Arc<Mutex<Vec<(TabId, mpsc::UnboundedSender<VocabPush>)>>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(TabId, mpsc::UnboundedSender<VocabPush>)>> {
        match self.tabs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 订阅推送；同一页面重复订阅会替换旧通道
    pub fn subscribe(&self, tab: TabId) -> mpsc::UnboundedReceiver<VocabPush> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tabs = self.lock();
        tabs.retain(|(id, _)| *id != tab);
        tabs.push((tab, tx));
        rx
    }

    pub fn unsubscribe(&self, tab: TabId) {
        self.lock().retain(|(id, _)| *id != tab);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// 通知所有页面，返回成功送达的数量
    pub fn notify(&self, push: &VocabPush) -> usize {
        let mut tabs = self.lock();
        tracing::debug!(
            "推送生词本变更 {:?} ({}), {} 个单词, {} 个页面",
            push.operation,
            push.changed,
            push.vocabulary.len(),
            tabs.len()
        );

        let mut delivered = 0;
        tabs.retain(|(tab, tx)| match tx.send(push.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::warn!("页面 {} 已关闭，停止向其推送", tab);
                false
            }
        });

        delivered
    }
}

pub struct VocabularyService {
    store: Arc<dyn VocabularyStore>,
    hub: PushHub,
    // 读改写串行化
    write_lock: tokio::sync::Mutex<()>,
}

impl VocabularyService {
    pub fn new(store: Arc<dyn VocabularyStore>, hub: PushHub) -> Self {
        Self {
            store,
            hub,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn hub(&self) -> &PushHub {
        &self.hub
    }

    /// 读取生词本；存储失败时返回空表
    pub async fn get_vocabulary(&self) -> Vocabulary {
        match self.store.load().await {
            Ok(vocabulary) => vocabulary,
            Err(e) => {
                helpers::log_error("读取生词本失败", &e);
                Vocabulary::new()
            }
        }
    }

    pub async fn add_word(&self, word: &str, translation: &str) -> HighlightResult<AddOutcome> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Err(helpers::validation_error("单词不能为空"));
        }
        if translation.trim().is_empty() {
            return Err(helpers::validation_error("译文不能为空"));
        }

        let _guard = self.write_lock.lock().await;
        let mut vocabulary = self.store.load().await?;
        let previous = vocabulary.insert(&key, translation);
        self.store.save(&vocabulary).await?;

        let outcome = match previous.as_deref() {
            None => AddOutcome::Added,
            Some(old) if old == translation => AddOutcome::Unchanged,
            Some(_) => AddOutcome::Updated,
        };
        match outcome {
            AddOutcome::Added => tracing::info!(
                "已添加单词 \"{}\": \"{}\" (共 {} 个)",
                key,
                translation,
                vocabulary.len()
            ),
            AddOutcome::Updated => tracing::info!(
                "已更新单词 \"{}\": \"{}\" -> \"{}\"",
                key,
                previous.unwrap_or_default(),
                translation
            ),
            AddOutcome::Unchanged => tracing::debug!("单词 \"{}\" 已存在且译文相同", key),
        }

        self.hub.notify(&VocabPush {
            vocabulary,
            operation: PushOperation::Add,
            changed: key,
        });
        Ok(outcome)
    }

    /// 移除单词；不存在或为空时返回 `false`
    pub async fn remove_word(&self, word: &str) -> HighlightResult<bool> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Ok(false);
        }

        let _guard = self.write_lock.lock().await;
        let mut vocabulary = self.store.load().await?;
        if vocabulary.remove(&key).is_none() {
            tracing::debug!("单词 \"{}\" 不在生词本中", key);
            return Ok(false);
        }
        self.store.save(&vocabulary).await?;
        tracing::info!("已移除单词 \"{}\" (剩余 {} 个)", key, vocabulary.len());

        self.hub.notify(&VocabPush {
            vocabulary,
            operation: PushOperation::Remove,
            changed: key,
        });
        Ok(true)
    }

    /// 用导入数据整体替换生词本，返回导入的单词数
    ///
    /// 数据必须是值全为字符串的 JSON 对象。
    pub async fn import(&self, data: &serde_json::Value) -> HighlightResult<usize> {
        let vocabulary = parse_import(data)?;

        let _guard = self.write_lock.lock().await;
        self.store.save(&vocabulary).await?;
        tracing::info!("生词本已导入: {} 个单词", vocabulary.len());

        let count = vocabulary.len();
        self.hub.notify(&VocabPush {
            vocabulary,
            operation: PushOperation::ImportFull,
            changed: FULL_LIST_MARKER.to_string(),
        });
        Ok(count)
    }

    /// 导出为格式化的 JSON
    pub async fn export(&self) -> HighlightResult<String> {
        let vocabulary = self.store.load().await?;
        Ok(serde_json::to_string_pretty(&vocabulary)?)
    }
}

/// 导出文件名 `my_vocabulary_book_YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("my_vocabulary_book_{}.json", date.format("%Y-%m-%d"))
}

fn parse_import(data: &serde_json::Value) -> HighlightResult<Vocabulary> {
    let object = data
        .as_object()
        .ok_or_else(|| helpers::validation_error("提供的单词本数据无效或格式不正确。"))?;

    let mut vocabulary = Vocabulary::new();
    for (word, translation) in object {
        let translation = translation.as_str().ok_or_else(|| {
            HighlightError::InvalidInput(format!("单词 \"{}\" 的译文不是字符串", word))
        })?;
        vocabulary.insert(word, translation);
    }

    Ok(vocabulary)
}

#[async_trait]
impl VocabularySource for VocabularyService {
    async fn fetch_vocabulary(&self) -> HighlightResult<Vocabulary> {
        self.store.load().await
    }
}
