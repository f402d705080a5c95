//! DOM 标注器
//!
//! 先收集候选文本节点再逐个替换，替换过程不会影响尚未处理的候选。
//! 单个节点失败（被页面脚本移走）只跳过该节点，整次标注继续。

use std::sync::Arc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::error::HighlightError;
use crate::observer::{MutationRecord, MutationSink, NullSink};
use crate::parsers::html::{
    append_child, create_element, create_text_node, get_parent_node, merge_adjacent_text,
    replace_with, text_of,
};
use crate::vocab::Vocabulary;

use super::exclusions::{is_excluded_element, is_inside_excluded};
use super::matcher::{Match, MatchEngine};
use super::{
    is_highlight_span, HighlightSpan, ATTR_ORIGINAL_WORD, ATTR_TRANSLATION, ATTR_VOCAB_KEY,
    HIGHLIGHT_CLASS,
};

/// 一次标注的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub text_nodes_scanned: usize,
    pub spans_created: usize,
    /// 因节点已脱离文档而跳过的文本节点
    pub nodes_skipped: usize,
}

pub struct DomAnnotator<'a> {
    engine: &'a MatchEngine,
    sink: &'a dyn MutationSink,
}

impl<'a> DomAnnotator<'a> {
    pub fn new(engine: &'a MatchEngine) -> Self {
        Self {
            engine,
            sink: &NullSink,
        }
    }

    /// 每次写入 DOM 都会通过 `sink` 报告
    pub fn with_sink(engine: &'a MatchEngine, sink: &'a dyn MutationSink) -> Self {
        Self { engine, sink }
    }

    pub fn annotate(&self, root: &Handle) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        if self.engine.is_empty() {
            return report;
        }

        let mut candidates = Vec::new();
        collect_text_nodes(root, &mut candidates);

        for node in candidates {
            if is_inside_excluded(&node) {
                continue;
            }
            let Some(text) = text_of(&node) else {
                continue;
            };
            report.text_nodes_scanned += 1;

            let matches = self.engine.find_matches(&text);
            if matches.is_empty() {
                continue;
            }

            let parent = get_parent_node(&node);
            let fragments = build_fragments(&text, &matches);
            match replace_with(&node, fragments.clone()) {
                Ok(()) => {
                    report.spans_created += matches.len();
                    if let Some(parent) = parent {
                        self.sink
                            .record(MutationRecord::child_list(&parent, fragments, vec![node]));
                    }
                }
                Err(HighlightError::DomRace(reason)) => {
                    tracing::debug!("跳过已脱离文档的文本节点: {}", reason);
                    report.nodes_skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("标注文本节点失败: {}", e);
                    report.nodes_skipped += 1;
                }
            }
        }

        tracing::debug!(
            "标注完成: 扫描 {} 个文本节点, 新建 {} 个高亮, 跳过 {} 个",
            report.text_nodes_scanned,
            report.spans_created,
            report.nodes_skipped
        );
        report
    }
}

/// 深度优先收集候选文本节点，遇到排除元素时整棵子树跳过
fn collect_text_nodes(node: &Handle, out: &mut Vec<Handle>) {
    match node.data {
        NodeData::Text { .. } => out.push(node.clone()),
        NodeData::Element { .. } if is_excluded_element(node) => {}
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text_nodes(child, out);
            }
        }
        _ => {}
    }
}

fn build_fragments(text: &str, matches: &[Match]) -> Vec<Handle> {
    let mut fragments = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;

    for m in matches {
        if m.start > cursor {
            fragments.push(create_text_node(&text[cursor..m.start]));
        }
        fragments.push(create_span(m));
        cursor = m.end;
    }
    if cursor < text.len() {
        fragments.push(create_text_node(&text[cursor..]));
    }

    fragments
}

fn create_span(m: &Match) -> Handle {
    let span = create_element(
        "span",
        &[
            ("class", HIGHLIGHT_CLASS),
            (ATTR_ORIGINAL_WORD, &m.surface_text),
            (ATTR_VOCAB_KEY, &m.key),
            (ATTR_TRANSLATION, &m.translation),
        ],
    );
    append_child(&span, &create_text_node(&m.surface_text));
    span
}

/// 用给定生词本标注 `root` 下的文本
pub fn annotate(root: &Handle, vocabulary: &Vocabulary) -> AnnotationReport {
    if vocabulary.is_empty() {
        return AnnotationReport::default();
    }

    match MatchEngine::new(Arc::new(vocabulary.clone())) {
        Ok(engine) => DomAnnotator::new(&engine).annotate(root),
        Err(e) => {
            tracing::warn!("无法构建匹配引擎: {}", e);
            AnnotationReport::default()
        }
    }
}

/// 还原 `root` 下所有高亮 span，返回还原数量
pub fn unannotate_all(root: &Handle) -> usize {
    unannotate_all_observed(root, &NullSink)
}

/// 与 [`unannotate_all`] 相同，但每次写入都报告给 `sink`
pub fn unannotate_all_observed(root: &Handle, sink: &dyn MutationSink) -> usize {
    let mut spans = Vec::new();
    collect_spans(root, &mut spans);

    let mut restored = 0;
    for span in spans {
        let Some(info) = HighlightSpan::from_handle(&span) else {
            continue;
        };
        let parent = get_parent_node(&span);
        let text = create_text_node(&info.surface_text);

        match replace_with(&span, vec![text.clone()]) {
            Ok(()) => {
                let merged = merge_adjacent_text(&text);
                restored += 1;
                if let Some(parent) = parent {
                    sink.record(MutationRecord::child_list(&parent, vec![merged], vec![span]));
                }
            }
            Err(e) => tracing::debug!("跳过无法还原的高亮: {}", e),
        }
    }

    restored
}

fn collect_spans(node: &Handle, out: &mut Vec<Handle>) {
    if is_highlight_span(node) {
        out.push(node.clone());
        return;
    }
    for child in node.children.borrow().iter() {
        collect_spans(child, out);
    }
}
