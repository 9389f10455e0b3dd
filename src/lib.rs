//! Pageturn: a pagination engine for flowing hypertext content
//!
//! This crate turns a continuously-flowing content tree into fixed-size,
//! navigable pages rendered inside an existing viewport:
//! - Layout driving (multi-column overflow or vertical overflow)
//! - Page boundary discovery by sampling rendered geometry
//! - Overflow handling (fillers and media resizing) in vertical mode
//! - Print sectioning with exact restoration of the original tree
//! - Mutation / resize driven reflow scheduling
//!
//! The engine never owns the content tree. Everything it knows is sampled
//! through the [`LayoutHost`] trait; [`SimHost`] is an in-memory host used by
//! tests, benches and the demo binary, and [`wasm`] binds a browser host.

pub mod book;
pub mod boundary;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod layout;
pub mod locate;
pub mod offset;
pub mod overflow;
pub mod pages;
pub mod reflow;
pub mod registry;
pub mod section;
pub mod undo;
pub mod wasm;

// Re-export WASM types for direct use
pub use wasm::WasmPager;

// Re-export primary types
pub use book::Book;
pub use boundary::BoundaryResolver;
pub use config::{BookConfig, PagingMethod};
pub use error::{ConfigError, PagerError};
pub use events::{BookEvent, Direction, EventBus, ListenerId, ModeKind};
pub use host::{FontMetrics, LayoutHost, MutationKind, MutationRecord, NodeId, NodeKind, SimHost};
pub use layout::{ContainerGeometry, Frame, LayoutDriver, Margins, Mode};
pub use locate::GeometricLocator;
pub use offset::{ContentOffset, PageRange};
pub use overflow::{Filler, FillerOutcome, OverflowHandler, RetryBudget};
pub use pages::{PageChange, PageIndex};
pub use reflow::{ReflowDecision, ReflowScheduler, ReflowState};
pub use registry::{BookId, BookRegistry};
pub use section::Sectioner;
pub use undo::StyleLog;

/// Viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// A rect with no area cannot be hit and does not count as rendered
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Smallest rect covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 20.0, 10.0, 5.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn test_rect_contains_and_intersects() {
        let a = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(a.contains_point(Point::new(15.0, 29.0)));
        assert!(!a.contains_point(Point::new(5.0, 15.0)));
        assert!(a.intersects(&Rect::new(25.0, 25.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(40.0, 40.0, 10.0, 10.0)));
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }
}
