//! 生词本持久化

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{helpers, HighlightError, HighlightResult};

use super::Vocabulary;

/// 键值存储：整本读出、整本写入
#[async_trait]
pub trait VocabularyStore: Send + Sync {
    async fn load(&self) -> HighlightResult<Vocabulary>;
    async fn save(&self, vocabulary: &Vocabulary) -> HighlightResult<()>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    vocabulary: RwLock<Vocabulary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary: RwLock::new(vocabulary),
        }
    }
}

#[async_trait]
impl VocabularyStore for MemoryStore {
    async fn load(&self) -> HighlightResult<Vocabulary> {
        Ok(self.vocabulary.read().await.clone())
    }

    async fn save(&self, vocabulary: &Vocabulary) -> HighlightResult<()> {
        *self.vocabulary.write().await = vocabulary.clone();
        Ok(())
    }
}

/// JSON 文件存储，内容为扁平对象 `{"word": "译文"}`
///
/// 文件不存在视为空生词本；写入先落到同目录临时文件再原子替换。
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_vocabulary(path: &Path) -> HighlightResult<Vocabulary> {
    if !path.exists() {
        return Ok(Vocabulary::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| HighlightError::from(e).with_context(path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vocabulary::new());
    }

    serde_json::from_str(&content).map_err(|e| {
        helpers::storage_error(format!("生词本文件格式错误 {}: {}", path.display(), e))
    })
}

fn write_vocabulary(path: &Path, json: &str) -> HighlightResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut file = tempfile::NamedTempFile::new_in(&dir)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    file.persist(path)
        .map_err(|e| helpers::storage_error(format!("写入 {} 失败: {}", path.display(), e)))?;

    Ok(())
}

#[async_trait]
impl VocabularyStore for JsonFileStore {
    async fn load(&self) -> HighlightResult<Vocabulary> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_vocabulary(&path))
            .await
            .map_err(|e| HighlightError::Internal(format!("读取任务失败: {}", e)))?
    }

    async fn save(&self, vocabulary: &Vocabulary) -> HighlightResult<()> {
        let json = serde_json::to_string_pretty(vocabulary)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_vocabulary(&path, &json))
            .await
            .map_err(|e| HighlightError::Internal(format!("写入任务失败: {}", e)))??;

        tracing::debug!("生词本已写入 {} ({} 个单词)", self.path.display(), vocabulary.len());
        Ok(())
    }
}
