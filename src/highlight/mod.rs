//! 生词高亮模块
//!
//! - `matcher`: 生词匹配引擎
//! - `exclusions`: 不可标注区域（脚本、代码、可编辑区域、自身标记）
//! - `annotator`: 在 DOM 中包裹 / 还原高亮 span

pub mod annotator;
pub mod exclusions;
pub mod matcher;

use markup5ever_rcdom::Handle;

use crate::parsers::html::{get_node_attr, get_node_name, has_class, text_content};

pub use annotator::{annotate, unannotate_all, AnnotationReport, DomAnnotator};
pub use matcher::{find_matches, Match, MatchEngine};

/// 高亮 span 的 class
pub const HIGHLIGHT_CLASS: &str = "vocab-highlighted-extension";
/// 原始写法
pub const ATTR_ORIGINAL_WORD: &str = "data-original-word";
/// 小写化后的生词本键
pub const ATTR_VOCAB_KEY: &str = "data-vocab-key";
/// 标注时的译文快照
pub const ATTR_TRANSLATION: &str = "data-translation";

/// 浮动 UI 元素的 id
pub const ICON_ID: &str = "my-selection-icon-translate-xyz";
pub const POPUP_ID: &str = "my-translation-popup-xyz";
pub const TOOLTIP_ID: &str = "vocab-tooltip-extension";
pub const FLOATING_UI_IDS: [&str; 3] = [ICON_ID, POPUP_ID, TOOLTIP_ID];

/// 判断节点是否为高亮 span
pub fn is_highlight_span(node: &Handle) -> bool {
    get_node_name(node) == Some("span") && has_class(node, HIGHLIGHT_CLASS)
}

/// 判断节点是否为浮动 UI 元素之一
pub fn is_floating_ui(node: &Handle) -> bool {
    get_node_attr(node, "id")
        .map(|id| FLOATING_UI_IDS.contains(&id.as_str()))
        .unwrap_or(false)
}

/// 已插入文档的高亮 span
///
/// 鼠标进入 span 时显示悬停提示，离开时延迟隐藏；事件由页面上下文按目标节点
/// 路由到选区状态机，这里只负责从 span 上读回标注信息。
#[derive(Debug, Clone)]
pub struct HighlightSpan {
    pub handle: Handle,
    pub surface_text: String,
    pub key: String,
    pub translation: String,
}

impl HighlightSpan {
    pub fn from_handle(handle: &Handle) -> Option<Self> {
        if !is_highlight_span(handle) {
            return None;
        }

        let surface_text =
            get_node_attr(handle, ATTR_ORIGINAL_WORD).unwrap_or_else(|| text_content(handle));
        let key = get_node_attr(handle, ATTR_VOCAB_KEY)
            .unwrap_or_else(|| surface_text.to_lowercase());
        let translation = get_node_attr(handle, ATTR_TRANSLATION).unwrap_or_default();

        Some(Self {
            handle: handle.clone(),
            surface_text,
            key,
            translation,
        })
    }
}

impl PartialEq for HighlightSpan {
    fn eq(&self, other: &Self) -> bool {
        std::rc::Rc::ptr_eq(&self.handle, &other.handle)
    }
}
