//! # 解析器模块
//!
//! HTML文档解析、DOM操作与序列化。高亮引擎只依赖这里提供的节点操作，
//! 不直接触碰 rcdom 的内部字段。

pub mod html;

pub use html::{html_to_dom, serialize_document};
