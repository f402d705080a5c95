use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::error::{helpers, HighlightError, HighlightResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> HighlightResult<RcDom> {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| HighlightError::Parse(format!("HTML解析失败: {}", e)))
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    let is_match = get_node_name(node) == Some(*node_name);

    if is_match && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    let next: &[&str] = if is_match && !rest.is_empty() {
        rest
    } else {
        node_names
    };

    for child_node in node.children.borrow().iter() {
        found_nodes.append(&mut find_nodes(child_node, next));
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取文档的 `<body>` 元素
pub fn get_body(document: &Handle) -> Option<Handle> {
    find_nodes(document, &["html", "body"]).into_iter().next()
}

/// 按 id 查找元素
pub fn find_by_id(node: &Handle, id: &str) -> Option<Handle> {
    if get_node_attr(node, "id").as_deref() == Some(id) {
        return Some(node.clone());
    }

    for child_node in node.children.borrow().iter() {
        if let Some(found) = find_by_id(child_node, id) {
            return Some(found);
        }
    }

    None
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 判断元素的 class 属性是否包含指定类名
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

/// 获取父节点
///
/// rcdom 的父指针存放在 `Cell` 中，读取时需要取出再放回。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 判断 `node` 是否为 `ancestor` 本身或其后代
pub fn is_inclusive_descendant(node: &Handle, ancestor: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 判断节点是否仍然挂在某个文档上
pub fn is_attached(node: &Handle) -> bool {
    let mut current = node.clone();
    loop {
        if let NodeData::Document = current.data {
            return true;
        }
        match get_parent_node(&current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 创建一个脱离文档的 HTML 元素
pub fn create_element(tag_name: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: StrTendril::from(*value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag_name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建一个文本节点
pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// 读取文本节点的内容
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆盖文本节点的内容
pub fn set_text(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        let mut tendril = contents.borrow_mut();
        tendril.clear();
        tendril.push_slice(text);
    }
}

/// 递归收集节点下所有文本
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// 将子节点追加到父节点末尾
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 清空元素的所有子节点
pub fn remove_children(parent: &Handle) {
    for child in parent.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
}

/// 将节点从父节点上摘除
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 用一组新节点替换 `node`
///
/// 若 `node` 已不在父节点的子节点列表中（被页面脚本移除），返回 `DomRace` 错误，
/// 文档保持不变。
pub fn replace_with(node: &Handle, replacements: Vec<Handle>) -> HighlightResult<()> {
    let parent = get_parent_node(node)
        .ok_or_else(|| helpers::dom_race("节点没有父节点"))?;

    let index = parent
        .children
        .borrow()
        .iter()
        .position(|child| Rc::ptr_eq(child, node))
        .ok_or_else(|| helpers::dom_race("节点已不在父节点中"))?;

    let mut children = parent.children.borrow_mut();
    children.remove(index);
    for (offset, replacement) in replacements.into_iter().enumerate() {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
        children.insert(index + offset, replacement);
    }
    node.parent.set(None);

    Ok(())
}

/// 将文本节点与前后相邻的文本兄弟合并，返回合并后保留的节点
///
/// 取消高亮后 span 的位置会留下一个独立的文本节点，合并后文本布局与标注前一致。
pub fn merge_adjacent_text(node: &Handle) -> Handle {
    let Some(parent) = get_parent_node(node) else {
        return node.clone();
    };
    let mut children = parent.children.borrow_mut();
    let Some(mut index) = children.iter().position(|child| Rc::ptr_eq(child, node)) else {
        return node.clone();
    };

    while index > 0 && text_of(&children[index - 1]).is_some() && text_of(&children[index]).is_some() {
        let current = children.remove(index);
        index -= 1;
        append_text(&children[index], &current);
        current.parent.set(None);
    }

    while index + 1 < children.len()
        && text_of(&children[index]).is_some()
        && text_of(&children[index + 1]).is_some()
    {
        let next = children.remove(index + 1);
        append_text(&children[index], &next);
        next.parent.set(None);
    }

    children[index].clone()
}

fn append_text(target: &Handle, source: &Handle) {
    if let (NodeData::Text { contents: target }, NodeData::Text { contents: source }) =
        (&target.data, &source.data)
    {
        target.borrow_mut().push_slice(&source.borrow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    #[test]
    fn test_find_body_and_by_id() {
        let dom = parse("<html><body><p id=\"x\">hi</p></body></html>");
        let body = get_body(&dom.document).unwrap();
        assert_eq!(get_node_name(&body), Some("body"));

        let p = find_by_id(&dom.document, "x").unwrap();
        assert_eq!(text_content(&p), "hi");
        assert!(is_inclusive_descendant(&p, &body));
        assert!(!is_inclusive_descendant(&body, &p));
    }

    #[test]
    fn test_parent_pointer_survives_lookup() {
        let dom = parse("<p id=\"x\">hi</p>");
        let p = find_by_id(&dom.document, "x").unwrap();
        let first = get_parent_node(&p).unwrap();
        let second = get_parent_node(&p).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_replace_with_splices_in_place() {
        let dom = parse("<p id=\"x\">a<b>b</b>c</p>");
        let p = find_by_id(&dom.document, "x").unwrap();
        let b = get_child_node_by_name(&p, "b").unwrap();

        replace_with(&b, vec![create_text_node("1"), create_text_node("2")]).unwrap();

        assert_eq!(text_content(&p), "a12c");
        assert_eq!(p.children.borrow().len(), 4);
        assert!(!is_attached(&b));
    }

    #[test]
    fn test_replace_detached_node_is_dom_race() {
        let dom = parse("<p id=\"x\">a<b>b</b></p>");
        let p = find_by_id(&dom.document, "x").unwrap();
        let b = get_child_node_by_name(&p, "b").unwrap();
        detach(&b);

        let result = replace_with(&b, vec![create_text_node("z")]);
        assert!(matches!(result, Err(HighlightError::DomRace(_))));
        assert_eq!(text_content(&p), "a");
    }

    #[test]
    fn test_set_node_attr_and_has_class() {
        let span = create_element("span", &[("class", "one two")]);
        assert!(has_class(&span, "two"));
        assert!(!has_class(&span, "tw"));

        set_node_attr(&span, "data-x", Some("1".to_string()));
        assert_eq!(get_node_attr(&span, "data-x").as_deref(), Some("1"));
        set_node_attr(&span, "data-x", None);
        assert_eq!(get_node_attr(&span, "data-x"), None);
    }

    #[test]
    fn test_merge_adjacent_text() {
        let p = create_element("p", &[]);
        append_child(&p, &create_text_node("a"));
        let middle = create_text_node("b");
        append_child(&p, &middle);
        append_child(&p, &create_text_node("c"));
        append_child(&p, &create_element("br", &[]));
        append_child(&p, &create_text_node("d"));

        let merged = merge_adjacent_text(&middle);
        assert_eq!(text_of(&merged).as_deref(), Some("abc"));
        assert_eq!(p.children.borrow().len(), 3);
        assert_eq!(text_content(&p), "abcd");
    }
}
