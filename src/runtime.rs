//! 页面运行时
//!
//! 单线程事件循环：页面事件、后台推送、翻译结果、防抖计时器和悬停提示计时器
//! 都在同一个 `select!` 中处理，事件处理本身不会并发执行。

use std::sync::Arc;
use std::time::Duration;

use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::background::BackgroundService;
use crate::config::HighlighterConfig;
use crate::core::PageContext;
use crate::error::{helpers, HighlightError};
use crate::messaging::ContentMessage;
use crate::observer::{MutationRecord, MutationSink};
use crate::ui::{Point, Rect, RequestId, SelectionSnapshot, TranslationOutcome, UiEffect, UiEvent, Viewport};
use crate::vocab::VocabPush;

/// 页面脚本对 DOM 的一次修改，参数为 `<body>`，返回产生的变更记录
pub type HostScript = Box<dyn FnOnce(&Handle) -> Vec<MutationRecord>>;

/// 宿主页面产生的事件
pub enum PageEvent {
    PointerDown {
        target: Handle,
        selection_collapsed: bool,
    },
    PointerUp {
        target: Handle,
        selection: Option<SelectionSnapshot>,
    },
    Click {
        target: Handle,
        at: Point,
    },
    PointerEnter {
        target: Handle,
        rect: Rect,
    },
    PointerLeave {
        target: Handle,
        related: Option<Handle>,
    },
    HostScript(HostScript),
    Viewport(Viewport),
    Shutdown,
}

type Settlement = (RequestId, TranslationOutcome);

pub struct ContentRuntime {
    page: PageContext,
    background: Arc<BackgroundService>,
    translate_timeout: Duration,
    tooltip_hide_delay: Duration,
    tooltip_deadline: Option<Instant>,
}

impl ContentRuntime {
    pub fn new(page: PageContext, background: Arc<BackgroundService>, config: &HighlighterConfig) -> Self {
        Self {
            page,
            background,
            translate_timeout: config.translate_timeout(),
            tooltip_hide_delay: config.tooltip_hide_delay(),
            tooltip_deadline: None,
        }
    }

    /// 初始化页面并运行到收到 `Shutdown` 或事件通道关闭，返回页面上下文
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<PageEvent>,
        mut pushes: mpsc::UnboundedReceiver<VocabPush>,
    ) -> PageContext {
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<Settlement>();

        self.page.initialize(self.background.as_ref()).await;

        loop {
            let debounce = self.page.next_deadline();
            let tooltip = self.tooltip_deadline;

            tokio::select! {
                event = events.recv() => match event {
                    Some(PageEvent::Shutdown) | None => break,
                    Some(event) => self.on_page_event(event, &settled_tx),
                },
                Some(push) = pushes.recv() => {
                    self.page.handle_message(ContentMessage::from(push));
                }
                Some((request, outcome)) = settled_rx.recv() => {
                    let effects = self.page.dispatch(UiEvent::TranslationSettled { request, outcome });
                    self.apply_effects(effects, &settled_tx);
                }
                _ = tokio::time::sleep_until(debounce.unwrap_or_else(Instant::now)), if debounce.is_some() => {
                    self.page.poll_debounce(Instant::now());
                }
                _ = tokio::time::sleep_until(tooltip.unwrap_or_else(Instant::now)), if tooltip.is_some() => {
                    self.tooltip_deadline = None;
                    let effects = self.page.dispatch(UiEvent::TooltipHideElapsed);
                    self.apply_effects(effects, &settled_tx);
                }
            }
        }

        tracing::debug!("页面运行时退出");
        self.page
    }

    fn on_page_event(&mut self, event: PageEvent, settled_tx: &mpsc::UnboundedSender<Settlement>) {
        let effects = match event {
            PageEvent::PointerDown {
                target,
                selection_collapsed,
            } => self.page.pointer_down(&target, selection_collapsed),
            PageEvent::PointerUp { target, selection } => self.page.pointer_up(&target, selection),
            PageEvent::Click { target, at } => self.page.click(&target, at),
            PageEvent::PointerEnter { target, rect } => self.page.pointer_enter(&target, rect),
            PageEvent::PointerLeave { target, related } => {
                self.page.pointer_leave(&target, related.as_ref())
            }
            PageEvent::HostScript(script) => {
                let records = script(self.page.body());
                for record in records {
                    self.page.mutation_sink().record(record);
                }
                Vec::new()
            }
            PageEvent::Viewport(viewport) => {
                self.page.set_viewport(viewport);
                Vec::new()
            }
            PageEvent::Shutdown => Vec::new(),
        };

        self.apply_effects(effects, settled_tx);
        self.page.flush_mutations(Instant::now());
    }

    fn apply_effects(&mut self, effects: Vec<UiEffect>, settled_tx: &mpsc::UnboundedSender<Settlement>) {
        for effect in effects {
            match effect {
                UiEffect::SendTranslate { request, text } => {
                    self.spawn_translation(request, text, settled_tx.clone())
                }
                UiEffect::ArmTooltipHide => {
                    self.tooltip_deadline = Some(Instant::now() + self.tooltip_hide_delay);
                }
                UiEffect::CancelTooltipHide => self.tooltip_deadline = None,
                UiEffect::RemoveWord { word } => {
                    let background = Arc::clone(&self.background);
                    tokio::spawn(async move {
                        let response = background.remove_word(Some(&word)).await;
                        if !response.success {
                            tracing::warn!("移除单词 \"{}\" 未成功: {:?}", word, response);
                        }
                    });
                }
            }
        }
    }

    /// 翻译与超时赛跑；超时后请求本身继续执行，结果被状态机忽略
    fn spawn_translation(
        &self,
        request: RequestId,
        text: String,
        settled_tx: mpsc::UnboundedSender<Settlement>,
    ) {
        let background = Arc::clone(&self.background);
        let timeout = self.translate_timeout;

        tokio::spawn(async move {
            let task = tokio::spawn(async move { background.translate(&text).await });
            let outcome = match tokio::time::timeout(timeout, task).await {
                Ok(Ok(response)) => TranslationOutcome::Response(response),
                Ok(Err(e)) => TranslationOutcome::Failed(e.to_string()),
                Err(elapsed) => {
                    let error = HighlightError::from(elapsed);
                    helpers::log_error(&format!("翻译请求 #{}", request), &error);
                    TranslationOutcome::TimedOut
                }
            };
            // 运行时已退出时结果无人接收
            let _ = settled_tx.send((request, outcome));
        });
    }
}
