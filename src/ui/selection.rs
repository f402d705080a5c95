//! 选区图标、翻译弹窗与悬停提示的状态机
//!
//! 纯状态转换：`handle` 接收一个事件，更新状态并返回需要宿主执行的副作用。
//! 渲染由页面上下文根据当前状态完成。

use markup5ever_rcdom::Handle;

use crate::filters::TextFilter;
use crate::highlight::HighlightSpan;
use crate::messaging::TranslateResponse;
use crate::parsers::html::text_content;

use super::geometry::{
    icon_position, popup_position, tooltip_position, Point, Rect, Viewport, POPUP_SIZE,
    TOOLTIP_SIZE,
};

pub type RequestId = u64;

pub const LOADING_TEXT: &str = "翻译中...";
pub const NO_RESULT_TEXT: &str = "未获取到翻译结果。";
pub const TIMEOUT_REASON: &str = "Translation request timed out";

/// 指针事件命中的目标
#[derive(Debug, Clone)]
pub enum PointerTarget {
    Icon,
    Popup,
    Tooltip,
    Span(HighlightSpan),
    Page,
}

impl PointerTarget {
    fn is_floating_ui(&self) -> bool {
        matches!(self, PointerTarget::Icon | PointerTarget::Popup | PointerTarget::Tooltip)
    }

    fn is_span(&self) -> bool {
        matches!(self, PointerTarget::Span(_))
    }
}

/// 指针抬起时的选区信息
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    pub text: String,
    /// 选区最后一个非空矩形
    pub trailing_rect: Rect,
    /// 选区公共祖先为高亮 span 时的该 span
    pub enclosing_span: Option<Handle>,
    /// 选区是否从 span 文本开头覆盖到结尾
    pub covers_whole_span: bool,
}

impl SelectionSnapshot {
    /// 是否恰好重新选中了一个已高亮的单词
    pub fn is_exact_reselection(&self) -> bool {
        let Some(span) = &self.enclosing_span else {
            return false;
        };
        self.covers_whole_span
            && self.text.trim().to_lowercase() == text_content(span).trim().to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub enum TranslationOutcome {
    Response(TranslateResponse),
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    PointerDown {
        target: PointerTarget,
        selection_collapsed: bool,
    },
    PointerUp {
        target: PointerTarget,
        selection: Option<SelectionSnapshot>,
    },
    IconClicked {
        at: Point,
    },
    TranslationSettled {
        request: RequestId,
        outcome: TranslationOutcome,
    },
    PointerEnterSpan {
        span: HighlightSpan,
        rect: Rect,
    },
    PointerLeaveSpan,
    PointerEnterTooltip,
    PointerLeaveTooltip {
        /// 指针是否直接移到了高亮 span 上
        to_span: bool,
    },
    TooltipHideElapsed,
    DeleteClicked,
    PopupCloseClicked,
}

/// 需要宿主执行的副作用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    SendTranslate { request: RequestId, text: String },
    ArmTooltipHide,
    CancelTooltipHide,
    RemoveWord { word: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IconState {
    Hidden,
    Shown(Point),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PopupState {
    Hidden,
    Loading {
        request: RequestId,
        position: Point,
    },
    Result {
        translation: String,
        phonetic: Option<String>,
        position: Point,
    },
    Error {
        message: String,
        position: Point,
    },
}

impl PopupState {
    pub fn is_visible(&self) -> bool {
        !matches!(self, PopupState::Hidden)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TooltipState {
    Hidden,
    Shown { span: HighlightSpan, position: Point },
}

pub struct SelectionUi {
    filter: TextFilter,
    viewport: Viewport,
    pending_text: String,
    icon: IconState,
    popup: PopupState,
    tooltip: TooltipState,
    hide_timer_armed: bool,
    pointer_over_tooltip: bool,
    next_request: RequestId,
}

impl SelectionUi {
    pub fn new(filter: TextFilter) -> Self {
        Self {
            filter,
            viewport: Viewport::default(),
            pending_text: String::new(),
            icon: IconState::Hidden,
            popup: PopupState::Hidden,
            tooltip: TooltipState::Hidden,
            hide_timer_armed: false,
            pointer_over_tooltip: false,
            next_request: 0,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    pub fn icon(&self) -> &IconState {
        &self.icon
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    pub fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    pub fn hide_timer_armed(&self) -> bool {
        self.hide_timer_armed
    }

    pub fn handle(&mut self, event: UiEvent) -> Vec<UiEffect> {
        let mut effects = Vec::new();

        match event {
            UiEvent::PointerUp { target, selection } => {
                self.on_pointer_up(target, selection, &mut effects)
            }
            UiEvent::IconClicked { at } => self.on_icon_clicked(at, &mut effects),
            UiEvent::TranslationSettled { request, outcome } => self.settle(request, outcome),
            UiEvent::PointerEnterSpan { span, rect } => {
                self.cancel_hide(&mut effects);
                let position = tooltip_position(&rect, TOOLTIP_SIZE, &self.viewport);
                self.tooltip = TooltipState::Shown { span, position };
            }
            UiEvent::PointerLeaveSpan => self.arm_hide(&mut effects),
            UiEvent::PointerEnterTooltip => {
                self.pointer_over_tooltip = true;
                self.cancel_hide(&mut effects);
            }
            UiEvent::PointerLeaveTooltip { to_span } => {
                self.pointer_over_tooltip = false;
                if !to_span {
                    self.arm_hide(&mut effects);
                }
            }
            UiEvent::TooltipHideElapsed => {
                if self.hide_timer_armed {
                    self.hide_timer_armed = false;
                    if !self.pointer_over_tooltip {
                        self.tooltip = TooltipState::Hidden;
                    }
                }
            }
            UiEvent::DeleteClicked => {
                if let TooltipState::Shown { span, .. } = &self.tooltip {
                    let word = span.key.clone();
                    self.hide_tooltip(&mut effects);
                    effects.push(UiEffect::RemoveWord { word });
                }
            }
            UiEvent::PopupCloseClicked => self.popup = PopupState::Hidden,
            UiEvent::PointerDown {
                target,
                selection_collapsed,
            } => self.on_pointer_down(target, selection_collapsed, &mut effects),
        }

        effects
    }

    fn on_pointer_up(
        &mut self,
        target: PointerTarget,
        selection: Option<SelectionSnapshot>,
        effects: &mut Vec<UiEffect>,
    ) {
        if target.is_floating_ui() || target.is_span() {
            self.icon = IconState::Hidden;
            return;
        }

        self.icon = IconState::Hidden;

        let accepted = selection.filter(|s| {
            self.filter.accepts_selection(&s.text) && !s.is_exact_reselection()
        });

        match accepted {
            Some(snapshot) => {
                self.pending_text = snapshot.text.trim().to_string();
                self.icon = IconState::Shown(icon_position(&snapshot.trailing_rect, &self.viewport));
                self.hide_tooltip(effects);
            }
            None => {
                self.pending_text.clear();
                self.popup = PopupState::Hidden;
            }
        }
    }

    fn on_icon_clicked(&mut self, at: Point, effects: &mut Vec<UiEffect>) {
        if !self.pending_text.trim().is_empty() {
            self.next_request += 1;
            let request = self.next_request;
            self.popup = PopupState::Loading {
                request,
                position: popup_position(at, POPUP_SIZE, &self.viewport),
            };
            effects.push(UiEffect::SendTranslate {
                request,
                text: self.pending_text.clone(),
            });
        }
        self.icon = IconState::Hidden;
    }

    /// 只接受当前加载中请求的结果，其余一律忽略
    fn settle(&mut self, request: RequestId, outcome: TranslationOutcome) {
        let position = match &self.popup {
            PopupState::Loading {
                request: current,
                position,
            } if *current == request => *position,
            _ => {
                tracing::debug!("忽略过期的翻译结果 #{}", request);
                return;
            }
        };

        self.popup = match outcome {
            TranslationOutcome::Response(TranslateResponse::Failure { message, .. }) => {
                PopupState::Error {
                    message: format!("错误: {}", message),
                    position,
                }
            }
            TranslationOutcome::Response(TranslateResponse::Success {
                translation,
                phonetic,
            }) => {
                if translation.is_empty() && phonetic.is_none() {
                    PopupState::Error {
                        message: NO_RESULT_TEXT.to_string(),
                        position,
                    }
                } else {
                    PopupState::Result {
                        translation,
                        phonetic,
                        position,
                    }
                }
            }
            TranslationOutcome::TimedOut => PopupState::Error {
                message: format!("翻译请求失败: {}", TIMEOUT_REASON),
                position,
            },
            TranslationOutcome::Failed(reason) => PopupState::Error {
                message: format!("翻译请求失败: {}", reason),
                position,
            },
        };
    }

    fn on_pointer_down(
        &mut self,
        target: PointerTarget,
        selection_collapsed: bool,
        effects: &mut Vec<UiEffect>,
    ) {
        if matches!(self.icon, IconState::Shown(_))
            && !target.is_floating_ui()
            && !target.is_span()
            && selection_collapsed
        {
            self.icon = IconState::Hidden;
            self.popup = PopupState::Hidden;
        }

        if self.popup.is_visible()
            && !matches!(target, PointerTarget::Popup | PointerTarget::Icon)
        {
            self.popup = PopupState::Hidden;
        }

        if matches!(self.tooltip, TooltipState::Shown { .. })
            && !matches!(target, PointerTarget::Tooltip)
            && !target.is_span()
        {
            self.hide_tooltip(effects);
        }
    }

    fn arm_hide(&mut self, effects: &mut Vec<UiEffect>) {
        if matches!(self.tooltip, TooltipState::Shown { .. }) {
            self.hide_timer_armed = true;
            effects.push(UiEffect::ArmTooltipHide);
        }
    }

    fn cancel_hide(&mut self, effects: &mut Vec<UiEffect>) {
        if self.hide_timer_armed {
            self.hide_timer_armed = false;
            effects.push(UiEffect::CancelTooltipHide);
        }
    }

    fn hide_tooltip(&mut self, effects: &mut Vec<UiEffect>) {
        self.cancel_hide(effects);
        self.tooltip = TooltipState::Hidden;
    }
}
