//! 浮动元素定位
//!
//! 坐标均为视口坐标；文档坐标需要加上滚动偏移。

/// 选区图标相对选区末端的水平间距
pub const ICON_GAP: f64 = 5.0;
/// 图标高度的一半，用于垂直居中
pub const ICON_HALF_HEIGHT: f64 = 10.0;
/// 弹窗相对点击位置的水平偏移
pub const POPUP_OFFSET: f64 = 15.0;
/// 弹窗与视口边缘的最小距离
pub const POPUP_MARGIN: f64 = 10.0;
/// 悬停提示与视口边缘的最小距离
pub const TOOLTIP_MARGIN: f64 = 5.0;

/// 没有布局信息时使用的估算尺寸
pub const POPUP_SIZE: Size = Size {
    width: 280.0,
    height: 80.0,
};
pub const TOOLTIP_SIZE: Size = Size {
    width: 220.0,
    height: 36.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// 视口尺寸与滚动偏移
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Viewport {
    fn to_document(&self, point: Point) -> Point {
        Point::new(point.x + self.scroll_x, point.y + self.scroll_y)
    }
}

/// 选区图标位置：选区最后一个矩形的右侧，垂直居中
pub fn icon_position(selection_end: &Rect, viewport: &Viewport) -> Point {
    viewport.to_document(Point::new(
        selection_end.right() + ICON_GAP,
        selection_end.top + selection_end.height / 2.0 - ICON_HALF_HEIGHT,
    ))
}

/// 弹窗位置：点击点右侧，保持在视口内
pub fn popup_position(click: Point, size: Size, viewport: &Viewport) -> Point {
    let mut x = click.x + POPUP_OFFSET;
    let mut y = click.y - size.height / 2.0;

    if x < POPUP_MARGIN {
        x = POPUP_MARGIN;
    }
    if y < POPUP_MARGIN {
        y = POPUP_MARGIN;
    }
    if x + size.width > viewport.width - POPUP_MARGIN {
        x = viewport.width - size.width - POPUP_MARGIN;
    }
    if y + size.height > viewport.height - POPUP_MARGIN {
        y = viewport.height - size.height - POPUP_MARGIN;
    }

    viewport.to_document(Point::new(x, y))
}

/// 悬停提示位置：优先在 span 上方居中，放不下时移到下方
pub fn tooltip_position(anchor: &Rect, size: Size, viewport: &Viewport) -> Point {
    let mut y = anchor.top - size.height;
    if y < 0.0 {
        y = anchor.bottom();
    }

    let mut x = anchor.left + anchor.width / 2.0 - size.width / 2.0;
    if x < TOOLTIP_MARGIN {
        x = TOOLTIP_MARGIN;
    }
    if x + size.width > viewport.width - TOOLTIP_MARGIN {
        x = viewport.width - size.width - TOOLTIP_MARGIN;
    }
    if x < 0.0 {
        x = 0.0;
    }

    viewport.to_document(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_position() {
        let viewport = Viewport {
            scroll_y: 100.0,
            ..Viewport::default()
        };
        let point = icon_position(&Rect::new(10.0, 50.0, 40.0, 20.0), &viewport);
        assert_eq!(point, Point::new(55.0, 150.0));
    }

    #[test]
    fn test_popup_stays_in_viewport() {
        let viewport = Viewport::default();
        let point = popup_position(Point::new(1270.0, 5.0), POPUP_SIZE, &viewport);
        assert!(point.x >= POPUP_MARGIN);
        assert!(point.x + POPUP_SIZE.width <= viewport.width - POPUP_MARGIN);
        assert!(point.y >= POPUP_MARGIN);

        let bottom = popup_position(Point::new(10.0, 795.0), POPUP_SIZE, &viewport);
        assert!(bottom.y + POPUP_SIZE.height <= viewport.height - POPUP_MARGIN);
    }

    #[test]
    fn test_tooltip_flips_below() {
        let viewport = Viewport::default();
        let near_top = Rect::new(100.0, 10.0, 30.0, 18.0);
        let point = tooltip_position(&near_top, TOOLTIP_SIZE, &viewport);
        assert_eq!(point.y, near_top.bottom());

        let left_edge = Rect::new(0.0, 200.0, 10.0, 18.0);
        assert_eq!(tooltip_position(&left_edge, TOOLTIP_SIZE, &viewport).x, TOOLTIP_MARGIN);
    }
}
