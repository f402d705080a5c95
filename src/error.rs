//! 统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 高亮引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HighlightError {
    /// 配置错误（例如翻译服务凭据缺失）
    #[error("配置错误: {0}")]
    Config(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 节点在发现与修改之间已脱离文档
    #[error("DOM节点已脱离文档: {0}")]
    DomRace(String),

    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 翻译服务返回的业务错误
    #[error("翻译服务错误: {message} (代码: {code})")]
    Service { code: String, message: String },

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl HighlightError {
    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HighlightError::Config(_) => ErrorSeverity::Critical,
            HighlightError::Network(_) => ErrorSeverity::Warning,
            HighlightError::Timeout(_) => ErrorSeverity::Warning,
            HighlightError::InvalidInput(_) => ErrorSeverity::Info,
            HighlightError::DomRace(_) => ErrorSeverity::Info,
            HighlightError::Storage(_) => ErrorSeverity::Error,
            HighlightError::Service { .. } => ErrorSeverity::Error,
            HighlightError::Parse(_) => ErrorSeverity::Error,
            HighlightError::Serialization(_) => ErrorSeverity::Error,
            HighlightError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            HighlightError::Network(_) | HighlightError::Timeout(_) => ErrorCategory::TransientService,
            HighlightError::Service { .. } | HighlightError::Storage(_) => {
                ErrorCategory::TransientService
            }
            HighlightError::InvalidInput(_)
            | HighlightError::Parse(_)
            | HighlightError::Serialization(_) => ErrorCategory::Validation,
            HighlightError::DomRace(_) => ErrorCategory::DomRace,
            HighlightError::Config(_) => ErrorCategory::Configuration,
            HighlightError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = |msg: &str| format!("{} (上下文: {})", msg, context);

        match &mut self {
            HighlightError::Config(ref mut msg)
            | HighlightError::Network(ref mut msg)
            | HighlightError::Timeout(ref mut msg)
            | HighlightError::InvalidInput(ref mut msg)
            | HighlightError::DomRace(ref mut msg)
            | HighlightError::Storage(ref mut msg)
            | HighlightError::Parse(ref mut msg)
            | HighlightError::Serialization(ref mut msg)
            | HighlightError::Internal(ref mut msg) => *msg = new_msg(msg),
            HighlightError::Service {
                ref mut message, ..
            } => *message = new_msg(message),
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 网络、超时或外部服务失败，通过弹窗文本告知用户
    TransientService,
    /// 空单词、非法导入数据等，在到达存储之前被拒绝
    Validation,
    /// 标注过程中目标节点已被页面脚本移除
    DomRace,
    /// 凭据缺失等配置问题
    Configuration,
    Internal,
}

impl From<std::io::Error> for HighlightError {
    fn from(error: std::io::Error) -> Self {
        HighlightError::Storage(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for HighlightError {
    fn from(error: serde_json::Error) -> Self {
        HighlightError::Serialization(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for HighlightError {
    fn from(error: toml::de::Error) -> Self {
        HighlightError::Parse(format!("TOML解析错误: {}", error))
    }
}

impl From<reqwest::Error> for HighlightError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            HighlightError::Timeout(format!("HTTP请求超时: {}", error))
        } else {
            HighlightError::Network(format!("HTTP请求失败: {}", error))
        }
    }
}

impl From<tokio::time::error::Elapsed> for HighlightError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        HighlightError::Timeout(format!("异步操作超时: {}", error))
    }
}

/// 错误结果类型别名
pub type HighlightResult<T> = Result<T, HighlightError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录一个被吞掉的错误
    ///
    /// 调用方随后按降级路径继续（空生词本、跳过节点、弹窗提示），不会重试。
    pub fn log_error(context: &str, error: &HighlightError) {
        let category = error.category();
        match error.severity() {
            ErrorSeverity::Info => tracing::debug!("{}: {} ({:?})", context, error, category),
            ErrorSeverity::Warning => tracing::warn!("{}: {} ({:?})", context, error, category),
            ErrorSeverity::Error => tracing::error!("{}: {} ({:?})", context, error, category),
            ErrorSeverity::Critical => {
                tracing::error!("严重错误 {}: {} ({:?})", context, error, category)
            }
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> HighlightError {
        HighlightError::Config(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> HighlightError {
        HighlightError::InvalidInput(msg.to_string())
    }

    /// 创建存储错误
    pub fn storage_error<T: fmt::Display>(msg: T) -> HighlightError {
        HighlightError::Storage(msg.to_string())
    }

    /// 创建DOM竞态错误
    pub fn dom_race<T: fmt::Display>(msg: T) -> HighlightError {
        HighlightError::DomRace(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            HighlightError::Config("missing".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            HighlightError::Timeout("10s".into()).category(),
            ErrorCategory::TransientService
        );
        assert_eq!(
            HighlightError::InvalidInput("empty".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            HighlightError::DomRace("detached".into()).category(),
            ErrorCategory::DomRace
        );
    }

    #[test]
    fn test_with_context() {
        let error = HighlightError::Storage("写入失败".into()).with_context("vocab.json");
        assert!(error.to_string().contains("vocab.json"));

        let error = HighlightError::Service {
            code: "52003".into(),
            message: "UNAUTHORIZED USER".into(),
        }
        .with_context("translate");
        assert!(error.to_string().contains("52003"));
        assert!(error.to_string().contains("translate"));
    }

    #[tokio::test]
    async fn test_elapsed_becomes_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();

        let error = HighlightError::from(elapsed);
        assert!(matches!(error, HighlightError::Timeout(_)));
        assert_eq!(error.category(), ErrorCategory::TransientService);
        assert_eq!(error.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_helpers_build_expected_variants() {
        assert!(matches!(helpers::config_error("x"), HighlightError::Config(_)));
        assert!(matches!(helpers::storage_error("x"), HighlightError::Storage(_)));
        assert_eq!(helpers::dom_race("x").category(), ErrorCategory::DomRace);
        // 各级别都只记录日志
        helpers::log_error("test", &HighlightError::Internal("x".into()));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Warning);
        assert_eq!(
            HighlightError::Internal("x".into()).severity(),
            ErrorSeverity::Critical
        );
    }
}
