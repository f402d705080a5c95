//! # Vocab Highlighter Library
//!
//! 划词翻译与生词高亮：选中英文文本获取翻译，单词自动加入个人生词本，
//! 之后在所有页面中高亮生词本里的单词，并随页面 DOM 变化保持同步。
//!
//! ## 模块组织
//!
//! - `core` - 页面上下文，串联高亮、变更观察与浮动界面
//! - `highlight` - 生词匹配与 DOM 标注
//! - `observer` - DOM 变更过滤与防抖调度
//! - `vocab` - 生词本缓存、存储与后台服务
//! - `ui` - 选区图标、翻译弹窗与悬停提示的状态机
//! - `translation` - 翻译服务接口与百度翻译实现
//! - `background` - 后台消息处理
//! - `runtime` - 页面事件循环
//! - `parsers` - HTML 解析与序列化

pub mod background;
pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod filters;
pub mod highlight;
pub mod messaging;
pub mod observer;
pub mod parsers;
pub mod runtime;
pub mod translation;
pub mod ui;
pub mod vocab;

// Re-export commonly used items for convenience
pub use crate::core::{highlight_html, strip_html, PageContext};
pub use config::{ConfigManager, HighlighterConfig};
pub use error::{HighlightError, HighlightResult};
pub use highlight::{annotate, find_matches, unannotate_all, Match, MatchEngine};
pub use vocab::{Vocabulary, VocabCache};
