//! 浮动界面：选区图标、翻译弹窗、生词悬停提示

pub mod geometry;
pub mod selection;

pub use geometry::{Point, Rect, Size, Viewport};
pub use selection::{
    IconState, PointerTarget, PopupState, RequestId, SelectionSnapshot, SelectionUi,
    TooltipState, TranslationOutcome, UiEffect, UiEvent,
};
