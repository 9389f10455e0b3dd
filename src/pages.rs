//! Page index and navigation

use crate::config::PagingMethod;
use crate::events::Direction;
use crate::host::{parse_px, px, LayoutHost, NodeId};
use crate::layout::{ContainerGeometry, Frame};
use crate::offset::ContentOffset;
use log::debug;
use rustc_hash::FxHashMap;

/// Scroll positions this close to a page boundary snap onto it
pub const SCROLL_SNAP_TOLERANCE_PX: f32 = 3.0;

/// Session storage key holding the current page of a book
pub fn session_key(book_id: u32) -> String {
    format!("pageNumBook{book_id}")
}

/// Snap `pos` onto the nearest page boundary when within tolerance
pub fn snap_scroll_pos(pos: f32, page_length: f32) -> f32 {
    if page_length <= 0.0 {
        return pos;
    }
    let nearest = (pos / page_length).round() * page_length;
    if (pos - nearest).abs() <= SCROLL_SNAP_TOLERANCE_PX {
        nearest
    } else {
        pos
    }
}

/// A completed move between pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
    pub from: usize,
    pub to: usize,
    pub direction: Direction,
    /// The page asked for before clamping; 0 means before the first page
    pub requested: usize,
}

impl PageChange {
    pub fn moved(&self) -> bool {
        self.from != self.to
    }

    /// The request ran off the front of the book
    pub fn hit_start(&self) -> bool {
        self.requested < 1
    }
}

/// What navigation needs to know about the book
#[derive(Debug, Clone, Copy)]
pub struct PageEnv<'a> {
    pub frame: Frame,
    pub geometry: ContainerGeometry,
    pub method: PagingMethod,
    pub book_id: u32,
    /// Container children with this class are never shifted
    pub draw_class: &'a str,
}

/// Saved inline `position`/`left` of a shifted sibling
#[derive(Debug, Clone, PartialEq)]
struct SiblingOrigin {
    position: Option<String>,
    left: Option<String>,
    base_left: f32,
    absolute: bool,
}

/// Current page, page count and the ordered page starters
#[derive(Debug)]
pub struct PageIndex {
    current: usize,
    total: usize,
    starters: Vec<ContentOffset>,
    at_end: bool,
    shifted: FxHashMap<NodeId, SiblingOrigin>,
}

impl Default for PageIndex {
    fn default() -> Self {
        Self {
            current: 1,
            total: 1,
            starters: Vec::new(),
            at_end: false,
            shifted: FxHashMap::default(),
        }
    }
}

impl PageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn starters(&self) -> &[ContentOffset] {
        &self.starters
    }

    pub fn starter(&self, page: usize) -> Option<ContentOffset> {
        page.checked_sub(1).and_then(|i| self.starters.get(i)).copied()
    }

    /// The last navigation reached or ran past the final page
    pub fn at_end(&self) -> bool {
        self.at_end
    }

    /// Forget the starters; the current page survives until clamped
    pub fn reset(&mut self) {
        self.starters.clear();
        self.total = 1;
        self.at_end = false;
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total.max(1);
        self.current = self.current.clamp(1, self.total);
    }

    /// Append the starter of the next page
    ///
    /// Every page gets exactly one starter and starters never go backwards in
    /// document order. A starter before the previous one is clamped to it, so
    /// pages inside one tall block share a starter. Returns `false` when
    /// clamped.
    pub fn push_starter<H: LayoutHost + ?Sized>(&mut self, host: &H, starter: ContentOffset) -> bool {
        if let Some(&last) = self.starters.last() {
            if starter.is_before(host, &last) {
                debug!("starter {starter:?} precedes {last:?}, clamped");
                self.starters.push(last);
                return false;
            }
        }
        self.starters.push(starter);
        true
    }

    /// Page whose starter is the last one not after `offset`
    pub fn page_of<H: LayoutHost + ?Sized>(&self, host: &H, offset: &ContentOffset) -> usize {
        let passed = self
            .starters
            .iter()
            .take_while(|s| !offset.is_before(host, s))
            .count();
        passed.clamp(1, self.total)
    }

    /// Go to page `page`, clamped to the book
    ///
    /// Returns `None` when already there with the scroll position on the
    /// page boundary, so scroll-driven updates cannot feed back into
    /// themselves.
    pub fn set_current_page<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        env: &PageEnv<'_>,
        page: usize,
    ) -> Option<PageChange> {
        let page_length = env.geometry.page_length;
        if page_length <= 0.0 {
            return None;
        }
        let scroll = env.frame.scroll_pos(host, env.method);
        if page == self.current && scroll.round() % page_length < 1.0 {
            return None;
        }
        Some(self.jump(host, env, page))
    }

    /// Go to page `page` unconditionally, re-applying scroll and sibling shifts
    pub fn jump<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        env: &PageEnv<'_>,
        page: usize,
    ) -> PageChange {
        let from = self.current;
        self.at_end = page >= self.total;
        self.current = page.clamp(1, self.total);
        env.frame
            .set_scroll_pos(host, env.method, env.geometry.scroll_pos_for_page(self.current));
        if env.method == PagingMethod::Column {
            self.shift_siblings(host, env);
            host.set_scroll_top(env.frame.container, 0.0);
        }
        let stored = self.current.to_string();
        host.session_set(&session_key(env.book_id), Some(&stored));

        PageChange {
            from,
            to: self.current,
            direction: Direction::between(from, self.current),
            requested: page,
        }
    }

    /// Move positioned siblings of the content along with the columns
    fn shift_siblings<H: LayoutHost + ?Sized>(&mut self, host: &mut H, env: &PageEnv<'_>) {
        let shift = env.geometry.scroll_pos_for_page(self.current);
        for sibling in host.children(env.frame.container) {
            if sibling == env.frame.content
                || !host.is_element(sibling)
                || host.has_class(sibling, env.draw_class)
            {
                continue;
            }
            let origin = self.shifted.entry(sibling).or_insert_with(|| {
                let absolute = host.position(sibling).is_out_of_flow();
                SiblingOrigin {
                    position: host.inline_style(sibling, "position"),
                    left: host.inline_style(sibling, "left"),
                    base_left: parse_px(&host.computed_style(sibling, "left")).unwrap_or(0.0),
                    absolute,
                }
            });
            if origin.absolute {
                host.set_inline_style(sibling, "left", Some(&px(origin.base_left + shift)));
            } else {
                host.set_inline_style(sibling, "position", Some("relative"));
                host.set_inline_style(sibling, "left", Some(&px(shift)));
            }
        }
    }

    /// Put shifted siblings back where they were
    pub fn restore_siblings<H: LayoutHost + ?Sized>(&mut self, host: &mut H) {
        for (node, origin) in self.shifted.drain() {
            host.set_inline_style(node, "left", origin.left.as_deref());
            if !origin.absolute {
                host.set_inline_style(node, "position", origin.position.as_deref());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookConfig;
    use crate::host::SimHost;
    use crate::layout::{LayoutDriver, Margins};
    use crate::undo::StyleLog;

    fn column_book() -> (SimHost, Frame, ContainerGeometry) {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        for _ in 0..5 {
            let p = host.append_element(content, "p");
            host.append_text(p, &"abcd ".repeat(240));
        }
        let frame = Frame::new(container, content);
        let config = BookConfig {
            margins: Margins::new(20.0, 20.0, 30.0, 30.0),
            ..BookConfig::default()
        };
        let geometry = LayoutDriver::new()
            .apply_layout(&mut host, frame, &config, &mut StyleLog::new())
            .unwrap();
        (host, frame, geometry)
    }

    fn env(frame: Frame, geometry: ContainerGeometry) -> PageEnv<'static> {
        PageEnv {
            frame,
            geometry,
            method: PagingMethod::Column,
            book_id: 7,
            draw_class: "draw",
        }
    }

    #[test]
    fn test_navigation_clamps_and_classifies() {
        let (mut host, frame, geometry) = column_book();
        let env = env(frame, geometry);
        let mut index = PageIndex::new();
        index.set_total(3);

        let change = index.set_current_page(&mut host, &env, 2).unwrap();
        assert_eq!((change.from, change.to, change.direction), (1, 2, Direction::Next));
        assert_eq!(host.scroll_left(frame.container), 660.0);

        let change = index.set_current_page(&mut host, &env, 9).unwrap();
        assert_eq!(change.to, 3);
        assert_eq!(change.direction, Direction::Next);
        assert!(index.at_end());
        assert_eq!(host.scroll_left(frame.container), 1320.0);

        let change = index.set_current_page(&mut host, &env, 0).unwrap();
        assert_eq!(change.to, 1);
        assert!(change.hit_start());
        assert_eq!(change.direction, Direction::Jump);
        assert!(!index.at_end());
        assert_eq!(host.session_get("pageNumBook7").as_deref(), Some("1"));
    }

    #[test]
    fn test_same_page_aligned_is_noop() {
        let (mut host, frame, geometry) = column_book();
        let env = env(frame, geometry);
        let mut index = PageIndex::new();
        index.set_total(3);
        assert!(index.set_current_page(&mut host, &env, 1).is_none());

        // Off the boundary the same page is re-applied
        host.set_scroll_left(frame.container, 100.0);
        let change = index.set_current_page(&mut host, &env, 1).unwrap();
        assert!(!change.moved());
        assert_eq!(host.scroll_left(frame.container), 0.0);
    }

    #[test]
    fn test_positioned_siblings_follow_columns() {
        let (mut host, frame, geometry) = column_book();
        let badge = host.append_element(frame.container, "div");
        host.set_style(badge, "position", "absolute");
        host.set_style(badge, "left", "10px");
        let canvas = host.append_element(frame.container, "canvas");
        host.add_class(canvas, "draw");
        host.set_style(canvas, "position", "absolute");

        let env = env(frame, geometry);
        let mut index = PageIndex::new();
        index.set_total(3);
        index.set_current_page(&mut host, &env, 2);
        assert_eq!(host.inline_style(badge, "left").as_deref(), Some("670px"));
        index.set_current_page(&mut host, &env, 3);
        assert_eq!(host.inline_style(badge, "left").as_deref(), Some("1330px"));
        assert_eq!(host.inline_style(canvas, "left"), None);

        index.restore_siblings(&mut host);
        assert_eq!(host.inline_style(badge, "left").as_deref(), Some("10px"));
    }

    #[test]
    fn test_starters_one_per_page_and_monotone() {
        let (host, frame, _) = column_book();
        let texts: Vec<NodeId> = host
            .children(frame.content)
            .into_iter()
            .map(|p| host.children(p)[0])
            .collect();
        let mut index = PageIndex::new();
        assert!(index.push_starter(&host, ContentOffset::new(texts[0], 0)));
        assert!(index.push_starter(&host, ContentOffset::new(texts[1], 1110)));
        assert!(index.push_starter(&host, ContentOffset::new(texts[1], 1110)));
        assert!(!index.push_starter(&host, ContentOffset::new(texts[0], 40)));
        assert!(index.push_starter(&host, ContentOffset::new(texts[3], 60)));
        index.set_total(5);

        assert_eq!(index.starters().len(), 5);
        assert_eq!(index.starter(4), Some(ContentOffset::new(texts[1], 1110)));
        assert_eq!(index.starter(5), Some(ContentOffset::new(texts[3], 60)));
        assert_eq!(index.page_of(&host, &ContentOffset::new(texts[0], 5)), 1);
        assert_eq!(index.page_of(&host, &ContentOffset::new(texts[2], 5)), 4);
        assert_eq!(index.page_of(&host, &ContentOffset::new(texts[4], 0)), 5);
    }

    #[test]
    fn test_snap_scroll_pos() {
        assert_eq!(snap_scroll_pos(658.0, 660.0), 660.0);
        assert_eq!(snap_scroll_pos(1322.5, 660.0), 1320.0);
        assert_eq!(snap_scroll_pos(700.0, 660.0), 700.0);
    }
}
