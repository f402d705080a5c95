//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }

    /// 仅在变量已设置时解析，不回退到默认值
    fn from_env() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }
}

fn parse_millis(name: &str, value: &str, max: u64) -> EnvResult<Duration> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms <= max => Ok(Duration::from_millis(ms)),
        Ok(ms) => Err(EnvError {
            variable: name.to_string(),
            message: format!("{}ms exceeds the maximum of {}ms", ms, max),
        }),
        Err(_) => Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid number of milliseconds '{}'", value),
        }),
    }
}

fn parse_non_empty(name: &str, value: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(EnvError {
            variable: name.to_string(),
            message: "Value must not be empty".to_string(),
        })
    } else {
        Ok(trimmed.to_string())
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "VOCAB_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 生词本文件路径
    pub struct StorePath;
    impl EnvVar<String> for StorePath {
        const NAME: &'static str = "VOCAB_STORE_PATH";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the JSON vocabulary book";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(Self::NAME, value)
        }
    }
}

/// 高亮相关环境变量
pub mod highlight {
    use super::*;

    /// 重新高亮的防抖延迟
    pub struct DebounceDelay;
    impl EnvVar<Duration> for DebounceDelay {
        const NAME: &'static str = "VOCAB_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(500));
        const DESCRIPTION: &'static str = "Quiet period before a re-highlight pass, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(Self::NAME, value, 60_000)
        }
    }

    /// 悬停提示的隐藏延迟
    pub struct TooltipHideDelay;
    impl EnvVar<Duration> for TooltipHideDelay {
        const NAME: &'static str = "VOCAB_TOOLTIP_HIDE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(100));
        const DESCRIPTION: &'static str = "Delay before the hover tooltip hides, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(Self::NAME, value, 10_000)
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "VOCAB_TRANSLATE_TIMEOUT_SECS";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(10));
        const DESCRIPTION: &'static str = "Translation round trip timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            match value.trim().parse::<u64>() {
                Ok(secs) if (1..=120).contains(&secs) => Ok(Duration::from_secs(secs)),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid timeout '{}'. Use 1-120 seconds", value),
                }),
            }
        }
    }

    /// 翻译 API 地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "VOCAB_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation API endpoint";

        fn parse(value: &str) -> EnvResult<String> {
            if value.starts_with("http://") || value.starts_with("https://") {
                Ok(value.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid URL '{}'. Must start with http:// or https://", value),
                })
            }
        }
    }

    /// 百度翻译 APP ID
    pub struct AppId;
    impl EnvVar<String> for AppId {
        const NAME: &'static str = "VOCAB_BAIDU_APP_ID";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Baidu translation APP ID";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(Self::NAME, value)
        }
    }

    /// 百度翻译密钥
    pub struct SecretKey;
    impl EnvVar<String> for SecretKey {
        const NAME: &'static str = "VOCAB_BAIDU_SECRET_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Baidu translation secret key";

        fn parse(value: &str) -> EnvResult<String> {
            parse_non_empty(Self::NAME, value)
        }
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"info\")\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        core::StorePath::NAME,
        core::StorePath::DESCRIPTION
    ));

    docs.push_str("\n## Highlight Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        highlight::DebounceDelay::NAME,
        highlight::DebounceDelay::DESCRIPTION,
        highlight::DebounceDelay::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        highlight::TooltipHideDelay::NAME,
        highlight::TooltipHideDelay::DESCRIPTION,
        highlight::TooltipHideDelay::DEFAULT
    ));

    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::Timeout::NAME,
        translation::Timeout::DESCRIPTION,
        translation::Timeout::DEFAULT
    ));
    for (name, description) in [
        (translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION),
        (translation::AppId::NAME, translation::AppId::DESCRIPTION),
        (translation::SecretKey::NAME, translation::SecretKey::DESCRIPTION),
    ] {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(core::LogLevel::parse("DEBUG").unwrap(), "debug");
        assert!(core::LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(
            highlight::DebounceDelay::parse("250").unwrap(),
            Duration::from_millis(250)
        );
        assert!(highlight::DebounceDelay::parse("soon").is_err());
        assert!(highlight::DebounceDelay::parse("999999").is_err());

        assert_eq!(
            translation::Timeout::parse("10").unwrap(),
            Duration::from_secs(10)
        );
        assert!(translation::Timeout::parse("0").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(translation::ApiUrl::parse("https://api.fanyi.baidu.com").is_ok());
        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_credentials_must_not_be_blank() {
        assert!(translation::AppId::parse("   ").is_err());
        assert_eq!(translation::SecretKey::parse(" key ").unwrap(), "key");
    }

    #[test]
    fn test_unset_variable_has_no_override() {
        env::remove_var(highlight::TooltipHideDelay::NAME);
        assert!(highlight::TooltipHideDelay::from_env().is_none());
        assert_eq!(
            highlight::TooltipHideDelay::get().unwrap(),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn test_env_docs_mention_every_variable() {
        let docs = generate_env_docs();
        assert!(docs.contains("VOCAB_DEBOUNCE_MS"));
        assert!(docs.contains("VOCAB_BAIDU_SECRET_KEY"));
        assert!(docs.contains("VOCAB_STORE_PATH"));
    }
}
