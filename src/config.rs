//! 配置管理模块
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::env::EnvVar;
use crate::error::{helpers, HighlightResult};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_TOOLTIP_HIDE_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_TRANSLATE_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_API_URL: &str = "https://api.fanyi.baidu.com/api/trans/vip/translate";
    pub const DEFAULT_STORE_PATH: &str = "~/.config/vocab-highlighter/vocabulary.json";

    /// 选区文本的上限，超出后不显示翻译图标
    pub const MAX_SELECTION_CHARS: usize = 1000;
    /// 英文判定允许的最大长度
    pub const MAX_PHRASE_CHARS: usize = 300;
    /// 英文字母占非空白字符的最低比例
    pub const ENGLISH_RATIO_THRESHOLD: f32 = 0.6;
    /// 可加入生词本的单词最大长度（不含）
    pub const MAX_VOCAB_WORD_CHARS: usize = 30;

    pub const CONFIG_PATHS: &[&str] = &[
        "vocab-highlighter.toml",
        ".vocab-highlighter.toml",
        "~/.config/vocab-highlighter/config.toml",
        "/etc/vocab-highlighter/config.toml",
    ];
}

/// 高亮引擎配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HighlighterConfig {
    // 高亮配置
    pub debounce_ms: u64,
    pub tooltip_hide_ms: u64,
    pub max_selection_chars: usize,

    // 翻译配置
    pub api_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub translate_timeout_secs: u64,
    pub app_id: Option<String>,
    pub secret_key: Option<String>,

    // 存储配置
    pub store_path: String,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: constants::DEFAULT_DEBOUNCE_DELAY.as_millis() as u64,
            tooltip_hide_ms: constants::DEFAULT_TOOLTIP_HIDE_DELAY.as_millis() as u64,
            max_selection_chars: constants::MAX_SELECTION_CHARS,

            api_url: constants::DEFAULT_API_URL.to_string(),
            source_lang: "en".to_string(),
            target_lang: "zh".to_string(),
            translate_timeout_secs: constants::DEFAULT_TRANSLATE_TIMEOUT.as_secs(),
            app_id: None,
            secret_key: None,

            store_path: constants::DEFAULT_STORE_PATH.to_string(),
        }
    }
}

impl HighlighterConfig {
    /// 验证配置
    pub fn validate(&self) -> HighlightResult<()> {
        if self.debounce_ms == 0 {
            return Err(helpers::config_error("防抖延迟不能为0"));
        }

        if self.translate_timeout_secs == 0 {
            return Err(helpers::config_error("翻译超时不能为0"));
        }

        if self.max_selection_chars == 0 {
            return Err(helpers::config_error("选区长度上限不能为0"));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(helpers::config_error(format!(
                "无效的API地址: {}",
                self.api_url
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖，只处理已设置的变量
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{core, highlight, translation};

        if let Some(delay) = env_override::<Duration, highlight::DebounceDelay>() {
            self.debounce_ms = delay.as_millis() as u64;
        }

        if let Some(delay) = env_override::<Duration, highlight::TooltipHideDelay>() {
            self.tooltip_hide_ms = delay.as_millis() as u64;
        }

        if let Some(timeout) = env_override::<Duration, translation::Timeout>() {
            self.translate_timeout_secs = timeout.as_secs();
        }

        if let Some(api_url) = env_override::<String, translation::ApiUrl>() {
            self.api_url = api_url;
            tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
        }

        if let Some(app_id) = env_override::<String, translation::AppId>() {
            self.app_id = Some(app_id);
        }

        if let Some(secret_key) = env_override::<String, translation::SecretKey>() {
            self.secret_key = Some(secret_key);
        }

        if let Some(store_path) = env_override::<String, core::StorePath>() {
            self.store_path = store_path;
        }
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tooltip_hide_delay(&self) -> Duration {
        Duration::from_millis(self.tooltip_hide_ms)
    }

    pub fn translate_timeout(&self) -> Duration {
        Duration::from_secs(self.translate_timeout_secs)
    }

    /// 展开 `~` 后的生词本路径
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path).as_ref())
    }
}

fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    match V::from_env()? {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: HighlighterConfig,
}

impl ConfigManager {
    /// 按默认搜索路径创建配置管理器
    pub fn new() -> HighlightResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建配置管理器，环境变量仍然优先
    pub fn from_path<P: AsRef<Path>>(path: P) -> HighlightResult<Self> {
        Self::load_dotenv();

        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &HighlighterConfig {
        &self.config
    }

    pub fn into_config(self) -> HighlighterConfig {
        self.config
    }

    fn load_config() -> HighlightResult<HighlighterConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(Path::new(expanded_path.as_ref()));
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(HighlighterConfig::default())
    }

    fn load_from_file(path: &Path) -> HighlightResult<HighlighterConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| helpers::config_error(format!("读取配置文件失败: {}", e)))?;

        if path.extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| helpers::config_error(format!("解析TOML配置失败: {}", e)))
        } else {
            serde_json::from_str(&content)
                .map_err(|e| helpers::config_error(format!("解析JSON配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> HighlightResult<()> {
        let config = HighlighterConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| helpers::config_error(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| helpers::config_error(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HighlightError;

    #[test]
    fn test_default_config_is_valid() {
        let config = HighlighterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce_delay(), Duration::from_millis(500));
        assert_eq!(config.translate_timeout(), Duration::from_secs(10));
        assert_eq!(config.tooltip_hide_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = HighlighterConfig::default();
        config.debounce_ms = 0;
        assert!(matches!(config.validate(), Err(HighlightError::Config(_))));

        let mut config = HighlighterConfig::default();
        config.api_url = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HighlighterConfig = toml::from_str(
            r#"
            debounce_ms = 250
            app_id = "2015063000000001"
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.app_id.as_deref(), Some("2015063000000001"));
        assert_eq!(config.target_lang, "zh");
    }

    #[test]
    fn test_example_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        ConfigManager::generate_example_config(&path).unwrap();

        let loaded = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(loaded, HighlighterConfig::default());
    }
}
