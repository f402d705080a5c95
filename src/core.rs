//! 页面上下文
//!
//! 每个页面一个 [`PageContext`]，持有文档、生词本缓存、变更协调器与选区状态机，
//! 并负责创建和渲染三个浮动元素。所有事件处理都以 `&mut PageContext` 进行。

use markup5ever_rcdom::{Handle, RcDom};
use tokio::time::Instant;

use crate::config::HighlighterConfig;
use crate::error::{HighlightError, HighlightResult};
use crate::filters::TextFilter;
use crate::highlight::{
    annotate, is_highlight_span, unannotate_all, AnnotationReport, HighlightSpan, ICON_ID,
    POPUP_ID, TOOLTIP_ID,
};
use crate::messaging::{BackgroundResponse, ContentMessage, PushAck};
use crate::observer::{
    DomObserver, MutationCoordinator, MutationQueue, MutationRecord, MutationSink, PassReport,
};
use crate::parsers::html::{
    append_child, create_element, create_text_node, detach, find_by_id, get_body,
    get_parent_node, html_to_dom, is_inclusive_descendant, remove_children, serialize_document,
    set_node_attr,
};
use crate::ui::{
    IconState, Point, PointerTarget, PopupState, Rect, SelectionSnapshot, SelectionUi,
    TooltipState, UiEffect, UiEvent, Viewport,
};
use crate::vocab::{VocabCache, Vocabulary, VocabularySource};

const POPUP_CLASS: &str = "translation-popup-extension";
const POPUP_CLOSE_CLASS: &str = "close-btn-extension";
const POPUP_CONTENT_CLASS: &str = "content-area-extension";
const LOADING_CLASS: &str = "loading-indicator-extension";
const ERROR_CLASS: &str = "error-message-extension";
const PHONETIC_CLASS: &str = "phonetic-display-extension";
const TOOLTIP_TEXT_CLASS: &str = "vocab-tooltip-text-extension";
const TOOLTIP_DELETE_CLASS: &str = "vocab-tooltip-delete-btn-extension";

/// 三个浮动元素及其内部控件
struct FloatingElements {
    icon: Handle,
    popup: Handle,
    popup_close: Handle,
    popup_content: Handle,
    tooltip: Handle,
    tooltip_text: Handle,
    tooltip_delete: Handle,
}

impl FloatingElements {
    /// 在 `<body>` 末尾创建浮动元素，先移除同 id 的旧元素
    fn install(document: &Handle, body: &Handle) -> Self {
        for id in [ICON_ID, POPUP_ID, TOOLTIP_ID] {
            if let Some(existing) = find_by_id(document, id) {
                detach(&existing);
            }
        }

        let icon = create_element("img", &[("id", ICON_ID), ("style", "display: none")]);

        let popup = create_element(
            "div",
            &[("id", POPUP_ID), ("class", POPUP_CLASS), ("style", "display: none")],
        );
        let popup_close = create_element("span", &[("class", POPUP_CLOSE_CLASS)]);
        append_child(&popup_close, &create_text_node("×"));
        let popup_content = create_element("div", &[("class", POPUP_CONTENT_CLASS)]);
        append_child(&popup, &popup_close);
        append_child(&popup, &popup_content);

        let tooltip = create_element("div", &[("id", TOOLTIP_ID), ("style", "display: none")]);
        let tooltip_text = create_element("span", &[("class", TOOLTIP_TEXT_CLASS)]);
        let tooltip_delete = create_element(
            "button",
            &[("class", TOOLTIP_DELETE_CLASS), ("title", "从生词本移除")],
        );
        append_child(&tooltip_delete, &create_text_node("✖"));
        append_child(&tooltip, &tooltip_text);
        append_child(&tooltip, &tooltip_delete);

        append_child(body, &icon);
        append_child(body, &popup);
        append_child(body, &tooltip);

        Self {
            icon,
            popup,
            popup_close,
            popup_content,
            tooltip,
            tooltip_text,
            tooltip_delete,
        }
    }
}

pub struct PageContext {
    dom: RcDom,
    body: Handle,
    cache: VocabCache,
    queue: MutationQueue,
    coordinator: MutationCoordinator<MutationQueue>,
    ui: SelectionUi,
    elements: FloatingElements,
}

impl PageContext {
    pub fn new(dom: RcDom, config: &HighlighterConfig) -> HighlightResult<Self> {
        let body = get_body(&dom.document)
            .ok_or_else(|| HighlightError::Parse("文档缺少 <body> 元素".to_string()))?;
        let elements = FloatingElements::install(&dom.document, &body);

        let queue = MutationQueue::new();
        let coordinator = MutationCoordinator::new(queue.clone(), config.debounce_delay());
        let ui = SelectionUi::new(TextFilter::new(config.max_selection_chars));

        Ok(Self {
            dom,
            body,
            cache: VocabCache::new(),
            queue,
            coordinator,
            ui,
            elements,
        })
    }

    pub fn from_html(html: &[u8], encoding: &str, config: &HighlighterConfig) -> HighlightResult<Self> {
        Self::new(html_to_dom(html, encoding)?, config)
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn body(&self) -> &Handle {
        &self.body
    }

    pub fn cache(&self) -> &VocabCache {
        &self.cache
    }

    pub fn ui(&self) -> &SelectionUi {
        &self.ui
    }

    pub fn coordinator(&self) -> &MutationCoordinator<MutationQueue> {
        &self.coordinator
    }

    /// 宿主页面通过它报告 DOM 变更
    pub fn mutation_sink(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.ui.set_viewport(viewport);
    }

    /// 拉取生词本并执行首次高亮，之后开始观察变更
    pub async fn initialize(&mut self, source: &dyn VocabularySource) -> PassReport {
        let vocabulary = self.cache.load(source).await;
        let report = self.coordinator.run_pass(&self.body, vocabulary);
        tracing::info!(
            "页面初始化完成: {} 个高亮",
            report.annotation.spans_created
        );
        report
    }

    /// 处理后台发来的消息；只有推送由页面处理
    pub fn handle_message(&mut self, message: ContentMessage) -> Option<BackgroundResponse> {
        match message {
            ContentMessage::VocabPushed { new_vocab, .. } => {
                self.apply_vocabulary(new_vocab);
                Some(BackgroundResponse::Ack(PushAck {
                    status: "Vocab updated, content script processed and re-highlighted."
                        .to_string(),
                }))
            }
            _ => None,
        }
    }

    /// 替换生词本并立即重新高亮
    pub fn apply_vocabulary(&mut self, vocabulary: Vocabulary) -> PassReport {
        self.cache.apply_push(vocabulary);
        self.coordinator.run_pass(&self.body, self.cache.snapshot())
    }

    /// 取走宿主报告的变更并交给协调器，返回是否安排了重新高亮
    pub fn flush_mutations(&mut self, now: Instant) -> bool {
        let records = self.queue.take_records();
        if records.is_empty() {
            return false;
        }
        self.coordinator.on_mutations(&records, now)
    }

    /// 防抖到期时执行重新高亮
    pub fn poll_debounce(&mut self, now: Instant) -> Option<PassReport> {
        let vocabulary = self.cache.snapshot();
        self.coordinator.fire_if_due(now, &self.body, &vocabulary)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.coordinator.pending_deadline()
    }

    /// 判断指针事件命中的目标
    pub fn classify(&self, node: &Handle) -> PointerTarget {
        if is_inclusive_descendant(node, &self.elements.icon) {
            return PointerTarget::Icon;
        }
        if is_inclusive_descendant(node, &self.elements.popup) {
            return PointerTarget::Popup;
        }
        if is_inclusive_descendant(node, &self.elements.tooltip) {
            return PointerTarget::Tooltip;
        }

        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if is_highlight_span(&candidate) {
                if let Some(span) = HighlightSpan::from_handle(&candidate) {
                    return PointerTarget::Span(span);
                }
            }
            current = get_parent_node(&candidate);
        }

        PointerTarget::Page
    }

    pub fn pointer_down(&mut self, node: &Handle, selection_collapsed: bool) -> Vec<UiEffect> {
        let target = self.classify(node);
        self.dispatch(UiEvent::PointerDown {
            target,
            selection_collapsed,
        })
    }

    pub fn pointer_up(&mut self, node: &Handle, selection: Option<SelectionSnapshot>) -> Vec<UiEffect> {
        let target = self.classify(node);
        self.dispatch(UiEvent::PointerUp { target, selection })
    }

    /// 点击事件：图标、删除按钮、弹窗关闭按钮
    pub fn click(&mut self, node: &Handle, at: Point) -> Vec<UiEffect> {
        if is_inclusive_descendant(node, &self.elements.icon) {
            self.dispatch(UiEvent::IconClicked { at })
        } else if is_inclusive_descendant(node, &self.elements.tooltip_delete) {
            self.dispatch(UiEvent::DeleteClicked)
        } else if is_inclusive_descendant(node, &self.elements.popup_close) {
            self.dispatch(UiEvent::PopupCloseClicked)
        } else {
            Vec::new()
        }
    }

    pub fn pointer_enter(&mut self, node: &Handle, rect: Rect) -> Vec<UiEffect> {
        match self.classify(node) {
            PointerTarget::Span(span) => self.dispatch(UiEvent::PointerEnterSpan { span, rect }),
            PointerTarget::Tooltip => self.dispatch(UiEvent::PointerEnterTooltip),
            _ => Vec::new(),
        }
    }

    /// `related` 是指针移入的节点
    pub fn pointer_leave(&mut self, node: &Handle, related: Option<&Handle>) -> Vec<UiEffect> {
        let to_span = related
            .map(|r| matches!(self.classify(r), PointerTarget::Span(_)))
            .unwrap_or(false);

        match self.classify(node) {
            PointerTarget::Span(_) => self.dispatch(UiEvent::PointerLeaveSpan),
            PointerTarget::Tooltip => self.dispatch(UiEvent::PointerLeaveTooltip { to_span }),
            _ => Vec::new(),
        }
    }

    /// 把事件交给状态机，并把新状态渲染到浮动元素
    pub fn dispatch(&mut self, event: UiEvent) -> Vec<UiEffect> {
        let effects = self.ui.handle(event);
        self.render();
        effects
    }

    fn render(&self) {
        match self.ui.icon() {
            IconState::Hidden => set_display(&self.elements.icon, None),
            IconState::Shown(point) => set_display(&self.elements.icon, Some((*point, "block"))),
        }

        let popup_nodes = match self.ui.popup() {
            PopupState::Hidden => None,
            PopupState::Loading { position, .. } => Some((
                *position,
                vec![labelled_span(LOADING_CLASS, crate::ui::selection::LOADING_TEXT)],
            )),
            PopupState::Result {
                translation,
                phonetic,
                position,
            } => {
                let mut nodes = Vec::new();
                if !translation.is_empty() {
                    nodes.push(create_text_node(translation));
                }
                if let Some(phonetic) = phonetic {
                    if !translation.is_empty() {
                        nodes.push(create_element("br", &[]));
                    }
                    nodes.push(labelled_span(PHONETIC_CLASS, phonetic));
                }
                Some((*position, nodes))
            }
            PopupState::Error { message, position } => {
                Some((*position, vec![labelled_span(ERROR_CLASS, message)]))
            }
        };
        match popup_nodes {
            Some((position, nodes)) => {
                self.replace_content(&self.elements.popup_content, nodes);
                set_display(&self.elements.popup, Some((position, "block")));
            }
            None => set_display(&self.elements.popup, None),
        }

        match self.ui.tooltip() {
            TooltipState::Hidden => set_display(&self.elements.tooltip, None),
            TooltipState::Shown { span, position } => {
                self.replace_content(
                    &self.elements.tooltip_text,
                    vec![create_text_node(&span.translation)],
                );
                set_display(&self.elements.tooltip, Some((*position, "flex")));
            }
        }
    }

    /// 替换浮动元素内容；写入照常报告给观察者，由相关性判定过滤
    fn replace_content(&self, container: &Handle, nodes: Vec<Handle>) {
        let removed: Vec<Handle> = container.children.borrow().clone();
        remove_children(container);
        for node in &nodes {
            append_child(container, node);
        }
        self.queue
            .record(MutationRecord::child_list(container, nodes, removed));
    }

    /// 当前文档的 HTML
    pub fn to_html(&self) -> HighlightResult<Vec<u8>> {
        serialize_document(&self.dom.document, "utf-8")
    }

    pub fn is_observing(&self) -> bool {
        self.queue.is_connected()
    }
}

fn labelled_span(class: &str, text: &str) -> Handle {
    let span = create_element("span", &[("class", class)]);
    append_child(&span, &create_text_node(text));
    span
}

fn set_display(element: &Handle, shown: Option<(Point, &str)>) {
    let style = match shown {
        Some((point, display)) => format!(
            "display: {}; left: {}px; top: {}px",
            display, point.x, point.y
        ),
        None => "display: none".to_string(),
    };
    set_node_attr(element, "style", Some(style));
}

/// 对一段独立的 HTML 执行高亮（不创建浮动元素）
pub fn highlight_html(
    html: &[u8],
    encoding: &str,
    vocabulary: &Vocabulary,
) -> HighlightResult<(Vec<u8>, AnnotationReport)> {
    let dom = html_to_dom(html, encoding)?;
    unannotate_all(&dom.document);
    // 只标注正文；<head> 中的 <title> 等为纯文本上下文
    let body = get_body(&dom.document)
        .ok_or_else(|| HighlightError::Parse("文档缺少 <body> 元素".to_string()))?;
    let report = annotate(&body, vocabulary);
    Ok((serialize_document(&dom.document, encoding)?, report))
}

/// 移除一段 HTML 中的全部高亮标记
pub fn strip_html(html: &[u8], encoding: &str) -> HighlightResult<(Vec<u8>, usize)> {
    let dom = html_to_dom(html, encoding)?;
    let restored = unannotate_all(&dom.document);
    Ok((serialize_document(&dom.document, encoding)?, restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HIGHLIGHT_CLASS;
    use crate::parsers::html::{find_nodes, has_class, text_content};

    const PAGE: &[u8] = b"<html><body><p id=\"p\">The cat sat on the mat.</p></body></html>";

    fn page() -> PageContext {
        PageContext::from_html(PAGE, "utf-8", &HighlighterConfig::default()).unwrap()
    }

    fn spans(ctx: &PageContext) -> Vec<Handle> {
        find_nodes(ctx.body(), &["span"])
            .into_iter()
            .filter(|s| has_class(s, HIGHLIGHT_CLASS))
            .collect()
    }

    #[test]
    fn test_floating_elements_installed_once() {
        let ctx = page();
        let html = String::from_utf8(ctx.to_html().unwrap()).unwrap();
        let again = PageContext::from_html(html.as_bytes(), "utf-8", &HighlighterConfig::default())
            .unwrap();
        for id in [ICON_ID, POPUP_ID, TOOLTIP_ID] {
            let count = find_nodes(again.document(), &["body"])
                .iter()
                .flat_map(|b| b.children.borrow().clone())
                .filter(|n| crate::parsers::html::get_node_attr(n, "id").as_deref() == Some(id))
                .count();
            assert_eq!(count, 1, "{}", id);
        }
    }

    #[test]
    fn test_push_rehighlights_immediately() {
        let mut ctx = page();
        let response = ctx.handle_message(ContentMessage::VocabPushed {
            new_vocab: [("cat", "猫")].into_iter().collect(),
            operation: None,
            word: None,
        });
        assert!(matches!(response, Some(BackgroundResponse::Ack(_))));
        assert_eq!(spans(&ctx).len(), 1);
        assert!(ctx.is_observing());

        ctx.handle_message(ContentMessage::VocabPushed {
            new_vocab: [("mat", "垫子")].into_iter().collect(),
            operation: None,
            word: None,
        });
        let current = spans(&ctx);
        assert_eq!(current.len(), 1);
        assert_eq!(text_content(&current[0]), "mat");
    }

    #[test]
    fn test_classify_targets() {
        let mut ctx = page();
        ctx.apply_vocabulary([("cat", "猫")].into_iter().collect());

        let span = spans(&ctx)[0].clone();
        let inner_text = span.children.borrow()[0].clone();
        assert!(matches!(ctx.classify(&inner_text), PointerTarget::Span(_)));

        let tooltip = find_by_id(ctx.document(), TOOLTIP_ID).unwrap();
        assert!(matches!(ctx.classify(&tooltip), PointerTarget::Tooltip));

        let p = find_by_id(ctx.document(), "p").unwrap();
        assert!(matches!(ctx.classify(&p), PointerTarget::Page));
    }

    #[test]
    fn test_ui_rendering_is_not_relevant() {
        let mut ctx = page();
        ctx.apply_vocabulary([("cat", "猫")].into_iter().collect());
        let span = spans(&ctx)[0].clone();

        ctx.pointer_enter(&span, Rect::new(10.0, 100.0, 20.0, 16.0));
        assert!(ctx.mutation_sink().pending() > 0);
        assert!(!ctx.flush_mutations(Instant::now()));

        let tooltip = find_by_id(ctx.document(), TOOLTIP_ID).unwrap();
        assert!(text_content(&tooltip).contains("猫"));
    }
}
