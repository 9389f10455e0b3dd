//! Page geometry and the container/content pair it is measured on

use crate::config::PagingMethod;
use crate::host::{LayoutHost, NodeId};
use crate::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Geometry comparisons tolerate this much float drift between reflows
pub const GEOMETRY_TOLERANCE_PX: f32 = 2.0;

/// Page margins in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub upper: f32,
    pub lower: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self::new(30.0, 30.0, 30.0, 30.0)
    }
}

impl Margins {
    pub fn new(upper: f32, lower: f32, left: f32, right: f32) -> Self {
        Self {
            upper,
            lower,
            left,
            right,
        }
    }

    pub fn vertical_sum(&self) -> f32 {
        self.upper + self.lower
    }
}

/// Presentation mode of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Scroll,
    PaginatedColumn,
    PaginatedVertical,
    Print,
}

impl Mode {
    pub fn paginated(method: PagingMethod) -> Self {
        match method {
            PagingMethod::Column => Mode::PaginatedColumn,
            PagingMethod::Vertical => Mode::PaginatedVertical,
        }
    }

    pub fn is_paginated(self) -> bool {
        matches!(self, Mode::PaginatedColumn | Mode::PaginatedVertical)
    }
}

/// Measured page geometry
///
/// `width` and `height` describe the usable content area of one page;
/// `page_length` is the scroll distance between two consecutive pages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerGeometry {
    pub width: f32,
    pub height: f32,
    pub page_length: f32,
    pub column_gap: f32,
    pub margins: Margins,
}

impl ContainerGeometry {
    /// All zero, as reported for a hidden container
    pub fn invalid() -> Self {
        Self {
            margins: Margins::new(0.0, 0.0, 0.0, 0.0),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.page_length > 0.0
    }

    /// Same geometry within [`GEOMETRY_TOLERANCE_PX`]
    pub fn approx_eq(&self, other: &ContainerGeometry) -> bool {
        let close = |a: f32, b: f32| (a - b).abs() <= GEOMETRY_TOLERANCE_PX;
        close(self.width, other.width)
            && close(self.height, other.height)
            && close(self.page_length, other.page_length)
            && close(self.column_gap, other.column_gap)
    }

    /// 1-based page shown at scroll position `pos`
    pub fn page_for_scroll_pos(&self, pos: f32) -> usize {
        if self.page_length <= 0.0 {
            return 1;
        }
        (pos.round().max(0.0) / self.page_length).floor() as usize + 1
    }

    pub fn scroll_pos_for_page(&self, page: usize) -> f32 {
        self.page_length * page.saturating_sub(1) as f32
    }
}

/// The container viewport and the content root paginated inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub container: NodeId,
    pub content: NodeId,
}

impl Frame {
    pub fn new(container: NodeId, content: NodeId) -> Self {
        Self { container, content }
    }

    pub fn origin<H: LayoutHost + ?Sized>(&self, host: &H) -> Point {
        let rect = host.bounding_rect(self.container);
        Point::new(rect.x, rect.y)
    }

    /// Content box position inside the container, independent of scrolling
    pub fn content_offset<H: LayoutHost + ?Sized>(&self, host: &H) -> Point {
        let container = host.bounding_rect(self.container);
        let content = host
            .client_rects(self.content)
            .first()
            .copied()
            .unwrap_or(container);
        Point::new(
            content.x - container.x + host.scroll_left(self.container),
            content.y - container.y + host.scroll_top(self.container),
        )
    }

    /// Viewport point for a page-local point of the page currently scrolled into view
    pub fn to_client<H: LayoutHost + ?Sized>(&self, host: &H, local: Point) -> Point {
        let origin = self.origin(host);
        let offset = self.content_offset(host);
        Point::new(origin.x + offset.x + local.x, origin.y + offset.y + local.y)
    }

    pub fn scroll_pos<H: LayoutHost + ?Sized>(&self, host: &H, method: PagingMethod) -> f32 {
        match method {
            PagingMethod::Column => host.scroll_left(self.container),
            PagingMethod::Vertical => host.scroll_top(self.container),
        }
    }

    pub fn set_scroll_pos<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        method: PagingMethod,
        pos: f32,
    ) {
        match method {
            PagingMethod::Column => host.set_scroll_left(self.container, pos),
            PagingMethod::Vertical => host.set_scroll_top(self.container, pos),
        }
    }

    pub fn scroll_length<H: LayoutHost + ?Sized>(&self, host: &H, method: PagingMethod) -> f32 {
        match method {
            PagingMethod::Column => host.scroll_width(self.container),
            PagingMethod::Vertical => host.scroll_height(self.container),
        }
    }

    /// Position of `rect` along the paging axis, in scroll coordinates
    pub fn axis_position<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        method: PagingMethod,
        rect: Rect,
    ) -> f32 {
        let origin = self.origin(host);
        match method {
            PagingMethod::Column => rect.x - origin.x + host.scroll_left(self.container),
            PagingMethod::Vertical => rect.y - origin.y + host.scroll_top(self.container),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_tolerance() {
        let a = ContainerGeometry {
            width: 600.0,
            height: 760.0,
            page_length: 660.0,
            column_gap: 60.0,
            margins: Margins::default(),
        };
        let mut b = a;
        b.width = 601.9;
        assert!(a.approx_eq(&b));
        b.width = 602.5;
        assert!(!a.approx_eq(&b));
    }

    #[test]
    fn test_page_for_scroll_pos() {
        let g = ContainerGeometry {
            width: 600.0,
            height: 760.0,
            page_length: 660.0,
            column_gap: 60.0,
            margins: Margins::default(),
        };
        assert_eq!(g.page_for_scroll_pos(0.0), 1);
        assert_eq!(g.page_for_scroll_pos(659.0), 1);
        assert_eq!(g.page_for_scroll_pos(659.6), 2);
        assert_eq!(g.page_for_scroll_pos(1320.0), 3);
        assert_eq!(g.scroll_pos_for_page(2), 660.0);
        assert!(!ContainerGeometry::invalid().is_valid());
    }
}
