// 集成测试公共模块
//
// 提供 HTML 夹具、假翻译服务、内存后台以及页面运行时的驱动工具

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use markup5ever_rcdom::{Handle, RcDom};

use vocab_highlighter::background::BackgroundService;
use vocab_highlighter::highlight::HIGHLIGHT_CLASS;
use vocab_highlighter::messaging::{TranslateErrorCode, TranslateResponse};
use vocab_highlighter::observer::MutationRecord;
use vocab_highlighter::parsers::html::{
    append_child, create_element, create_text_node, find_nodes, has_class, html_to_dom,
};
use vocab_highlighter::translation::Translator;
use vocab_highlighter::ui::{Rect, SelectionSnapshot};
use vocab_highlighter::vocab::{MemoryStore, PushHub, VocabularyService};
use vocab_highlighter::Vocabulary;

/// 覆盖各类排除区域的文章页
pub const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sample</title><style>.cat { color: red; }</style></head>
<body>
  <h1 id="title">The Cat and the Setup</h1>
  <p id="intro">Say hello to the cat. A category is not a cat.</p>
  <pre id="code">let cat = setup();</pre>
  <div contenteditable="true" id="editor">an editable cat</div>
  <p id="outro">Hello again, <b>CAT</b> lovers.</p>
  <script>var cat = "hello";</script>
</body>
</html>"#;

/// 只有一个段落的页面
pub const SIMPLE: &str =
    r#"<html><body><p id="greeting">Say hello to the world</p><div id="feed"></div></body></html>"#;

pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("fixture should parse")
    }

    /// 文档中所有高亮 span
    pub fn spans(root: &Handle) -> Vec<Handle> {
        find_nodes(root, &["span"])
            .into_iter()
            .filter(|span| has_class(span, HIGHLIGHT_CLASS))
            .collect()
    }

    /// 模拟页面脚本在 `parent` 末尾插入一个段落
    pub fn append_paragraph(parent: &Handle, text: &str) -> MutationRecord {
        let p = create_element("p", &[]);
        append_child(&p, &create_text_node(text));
        append_child(parent, &p);
        MutationRecord::child_list(parent, vec![p], vec![])
    }
}

pub fn vocabulary(pairs: &[(&str, &str)]) -> Vocabulary {
    pairs.iter().copied().collect()
}

/// 页面正文中的一次普通选区
pub fn selection(text: &str) -> SelectionSnapshot {
    SelectionSnapshot {
        text: text.to_string(),
        trailing_rect: Rect::new(200.0, 120.0, 60.0, 18.0),
        enclosing_span: None,
        covers_whole_span: false,
    }
}

/// 固定答案的翻译服务
pub struct FakeTranslator {
    answers: HashMap<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, translation: &str) -> Self {
        self.answers.insert(text.to_string(), translation.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str) -> TranslateResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.answers.get(text.trim()) {
            Some(translation) => TranslateResponse::success(translation.clone()),
            None => TranslateResponse::failure(TranslateErrorCode::NoTranslation, "未获取到翻译结果。"),
        }
    }
}

/// 基于内存存储的后台服务
pub struct TestBackground {
    pub background: Arc<BackgroundService>,
    pub translator: Arc<FakeTranslator>,
    pub hub: PushHub,
}

impl TestBackground {
    pub fn new(translator: FakeTranslator, initial: Vocabulary) -> Self {
        let hub = PushHub::new();
        let store = Arc::new(MemoryStore::with_vocabulary(initial));
        let service = Arc::new(VocabularyService::new(store, hub.clone()));
        let translator = Arc::new(translator);
        let background = Arc::new(BackgroundService::new(service, translator.clone()));

        Self {
            background,
            translator,
            hub,
        }
    }

    pub async fn vocabulary(&self) -> Vocabulary {
        self.background.vocabulary().get_vocabulary().await
    }
}
