//! 不可标注区域判定

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{get_node_attr, get_node_name, get_parent_node};

use super::{is_floating_ui, is_highlight_span};

/// 其子树从不标注的元素
pub const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "textarea", "input", "iframe", "canvas", "code", "pre",
    "select", "button", "title", "xmp", "noembed", "noframes", "plaintext",
];

/// 元素自身的 contenteditable 声明
///
/// `Some(true)` 表示可编辑，`Some(false)` 表示显式关闭，`None` 表示继承。
fn editable_declaration(node: &Handle) -> Option<bool> {
    let value = get_node_attr(node, "contenteditable")?;
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "plaintext-only" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// 判断元素本身是否构成排除区域的根
pub fn is_excluded_element(node: &Handle) -> bool {
    let Some(name) = get_node_name(node) else {
        return false;
    };

    SKIP_ELEMENTS.contains(&name)
        || editable_declaration(node) == Some(true)
        || is_highlight_span(node)
        || is_floating_ui(node)
}

/// 沿祖先链判断节点是否位于排除区域内
///
/// 只检查祖先（不含自身）。任一祖先声明可编辑即整棵子树排除，
/// 其中 `contenteditable="false"` 的子区域也不例外，与整页遍历的剪枝一致。
pub fn is_inside_excluded(node: &Handle) -> bool {
    let mut current = get_parent_node(node);

    while let Some(ancestor) = current {
        if let NodeData::Element { .. } = ancestor.data {
            if is_excluded_element(&ancestor) {
                return true;
            }
        }
        current = get_parent_node(&ancestor);
    }

    false
}
