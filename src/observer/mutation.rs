//! 变更记录与相关性判定
//!
//! 变更流由宿主提供，这里只决定一批记录里是否存在值得重新高亮的变化。

use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::highlight::{is_floating_ui, is_highlight_span};
use crate::parsers::html::{get_node_name, get_parent_node, is_inclusive_descendant, text_content};

/// 变更类型
#[derive(Debug, Clone)]
pub enum MutationKind {
    /// 子节点列表变化
    ChildList {
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 文本节点内容变化
    CharacterData,
}

/// 一条变更记录
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub target: Handle,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn child_list(target: &Handle, added: Vec<Handle>, removed: Vec<Handle>) -> Self {
        Self {
            target: target.clone(),
            kind: MutationKind::ChildList { added, removed },
        }
    }

    pub fn character_data(target: &Handle) -> Self {
        Self {
            target: target.clone(),
            kind: MutationKind::CharacterData,
        }
    }
}

/// 接收 DOM 写入通知
///
/// 高亮引擎自身的写入也经过这里；观察者断开期间的写入不会被记录。
pub trait MutationSink {
    fn record(&self, record: MutationRecord);
}

/// 丢弃所有记录
pub struct NullSink;

impl MutationSink for NullSink {
    fn record(&self, _record: MutationRecord) {}
}

/// 观察者订阅
pub trait DomObserver {
    /// 开始观察 `root` 子树（重复调用会替换旧订阅）
    fn observe(&mut self, root: &Handle);
    /// 断开订阅并丢弃尚未取走的记录
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}

#[derive(Default)]
struct QueueState {
    root: Option<Handle>,
    records: Vec<MutationRecord>,
}

/// 基于队列的观察者
///
/// 订阅期间记录落在根节点之内的变更，宿主通过 [`MutationQueue::take_records`]
/// 成批取走。克隆共享同一个队列。
#[derive(Clone, Default)]
pub struct MutationQueue {
    state: Rc<RefCell<QueueState>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.state.borrow_mut().records)
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().records.len()
    }
}

impl MutationSink for MutationQueue {
    fn record(&self, record: MutationRecord) {
        let mut state = self.state.borrow_mut();
        let observed = match &state.root {
            Some(root) => is_inclusive_descendant(&record.target, root),
            None => false,
        };
        if observed {
            state.records.push(record);
        }
    }
}

impl DomObserver for MutationQueue {
    fn observe(&mut self, root: &Handle) {
        self.state.borrow_mut().root = Some(root.clone());
    }

    fn disconnect(&mut self) {
        let mut state = self.state.borrow_mut();
        state.root = None;
        state.records.clear();
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().root.is_some()
    }
}

/// 节点是否属于引擎自身（高亮 span 或浮动 UI）
fn is_own_node(node: &Handle) -> bool {
    is_highlight_span(node) || is_floating_ui(node)
}

/// 从节点向上直到 `<body>`，是否经过高亮 span 或浮动 UI（含自身）
fn within_own_markup(node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if get_node_name(&candidate) == Some("body") {
            return false;
        }
        if is_own_node(&candidate) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

fn is_text_bearing(node: &Handle) -> bool {
    match node.data {
        NodeData::Text { .. } => true,
        NodeData::Element { .. } => !text_content(node).trim().is_empty(),
        _ => false,
    }
}

/// 变更是否可以归因于引擎自身的写入或浮动 UI
///
/// - 目标位于浮动 UI 或高亮 span 之内
/// - 子节点变化只新增了引擎自己的节点
pub fn is_self_inflicted(record: &MutationRecord) -> bool {
    if within_own_markup(&record.target) {
        return true;
    }

    match &record.kind {
        MutationKind::ChildList { added, .. } => {
            !added.is_empty() && added.iter().all(|node| within_own_markup(node))
        }
        MutationKind::CharacterData => false,
    }
}

/// 变更是否需要安排一次重新高亮
pub fn is_relevant(record: &MutationRecord) -> bool {
    if is_self_inflicted(record) {
        return false;
    }

    match &record.kind {
        MutationKind::ChildList { added, .. } => added
            .iter()
            .any(|node| !within_own_markup(node) && is_text_bearing(node)),
        MutationKind::CharacterData => true,
    }
}

/// 一批记录中只要有一条相关即触发
pub fn batch_is_relevant(records: &[MutationRecord]) -> bool {
    records.iter().any(is_relevant)
}
