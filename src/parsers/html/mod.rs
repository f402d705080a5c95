//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（查找、属性、节点替换）
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    append_child, create_element, create_text_node, detach, find_by_id, find_nodes, get_body,
    get_child_node_by_name, get_node_attr, get_node_name, get_parent_node, has_class, html_to_dom,
    is_attached, is_inclusive_descendant, merge_adjacent_text, remove_children, replace_with, set_node_attr, set_text,
    text_content, text_of,
};
pub use serializer::serialize_document;
