//! Page start and end resolution
//!
//! A page boundary is whatever content offset the host reports at a catch
//! point near the page corner. When that lands somewhere useless (an element
//! laid out pages away, or nothing at all) the page is raster-scanned, X before
//! Y, until a usable offset turns up. Running out of page is not an error: the
//! content bounds are used and a warning is logged.

use crate::config::{BookConfig, PagingMethod};
use crate::host::{LayoutHost, NodeId};
use crate::layout::{ContainerGeometry, Frame};
use crate::locate::GeometricLocator;
use crate::offset::{is_valid_node, page_for_offset, ContentOffset};
use crate::Point;
use log::{debug, warn};

/// Which end of a page is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// Resolves page starters and enders for the page currently scrolled into view
pub struct BoundaryResolver<'a> {
    frame: Frame,
    geometry: ContainerGeometry,
    config: &'a BookConfig,
    locator: GeometricLocator,
}

impl<'a> BoundaryResolver<'a> {
    pub fn new(frame: Frame, geometry: ContainerGeometry, config: &'a BookConfig) -> Self {
        Self {
            frame,
            geometry,
            config,
            locator: GeometricLocator::new(frame),
        }
    }

    /// Nominal catch point: top-center for starts, bottom-right for ends
    pub fn default_catch(&self, edge: Edge) -> Point {
        match edge {
            Edge::Start => Point::new(self.geometry.width / 2.0, 10.0),
            Edge::End => Point::new(self.geometry.width - 10.0, self.geometry.height - 10.0),
        }
    }

    pub fn resolve_start<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        page: usize,
        catch: Point,
    ) -> ContentOffset {
        self.resolve(host, page, catch, Edge::Start)
    }

    pub fn resolve_end<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        page: usize,
        catch: Point,
    ) -> ContentOffset {
        self.resolve(host, page, catch, Edge::End)
    }

    pub fn resolve<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        page: usize,
        catch: Point,
        edge: Edge,
    ) -> ContentOffset {
        let first = self.locator.locate(host, catch);
        let found = if self.acceptable(host, page, first) {
            first
        } else {
            debug!("page {page}: {edge:?} catch at {catch:?} rejected, scanning");
            self.scan(host, page, catch, edge, first.map(|o| o.node))
        };
        let offset = match found {
            Some(offset) => offset,
            None => {
                warn!("page {page}: no usable {edge:?} offset on the page, using content bounds");
                self.content_bound(host, edge)
            }
        };
        match self.config.paging_method {
            PagingMethod::Column => offset,
            PagingMethod::Vertical => self.skip_fillers(host, offset, edge),
        }
    }

    /// Text always qualifies; other hits must sit within the page tolerance
    fn acceptable<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        page: usize,
        hit: Option<ContentOffset>,
    ) -> bool {
        let Some(offset) = hit else {
            return false;
        };
        if host.is_text(offset.node) {
            return true;
        }
        match page_for_offset(
            host,
            self.frame,
            &self.geometry,
            self.config.paging_method,
            &offset,
        ) {
            Some(found) => found.abs_diff(page) <= self.config.page_tolerance as usize,
            None => false,
        }
    }

    fn scan<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        page: usize,
        catch: Point,
        edge: Edge,
        mut rejected: Option<NodeId>,
    ) -> Option<ContentOffset> {
        let step = self.config.scan_step.max(1.0);
        let (width, height) = (self.geometry.width, self.geometry.height);
        let mut point = catch;
        loop {
            match edge {
                Edge::Start => {
                    point.x += step;
                    if point.x > width {
                        point.x = 0.0;
                        point.y += step;
                        if point.y > height {
                            return None;
                        }
                    }
                }
                Edge::End => {
                    point.x -= step;
                    if point.x < 0.0 {
                        point.x = width;
                        point.y -= step;
                        if point.y < 0.0 {
                            return None;
                        }
                    }
                }
            }
            match self.locator.locate(host, point) {
                // Nothing after this point can start the page
                None if edge == Edge::Start => return None,
                None => continue,
                Some(hit) => {
                    if Some(hit.node) != rejected && self.acceptable(host, page, Some(hit)) {
                        debug!("page {page}: scan settled at {point:?}");
                        return Some(hit);
                    }
                    rejected = Some(hit.node);
                }
            }
        }
    }

    fn content_bound<H: LayoutHost + ?Sized>(&self, host: &H, edge: Edge) -> ContentOffset {
        match edge {
            Edge::Start => ContentOffset::start_of(self.frame.content),
            Edge::End => ContentOffset::end_of(host, self.frame.content),
        }
    }

    fn is_filler<H: LayoutHost + ?Sized>(&self, host: &H, node: NodeId) -> bool {
        host.is_element(node) && host.has_class(node, &self.config.filler_class)
    }

    /// The filler an offset sits in or points at
    fn filler_at<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        offset: ContentOffset,
        edge: Edge,
    ) -> Option<NodeId> {
        if let Some(filler) = host.closest_with_class(offset.node, &self.config.filler_class) {
            return Some(filler);
        }
        if !host.is_element(offset.node) {
            return None;
        }
        let children = host.children(offset.node);
        let child = match edge {
            Edge::Start => children.get(offset.offset),
            Edge::End => offset.offset.checked_sub(1).and_then(|i| children.get(i)),
        };
        child.copied().filter(|&c| self.is_filler(host, c))
    }

    /// Move a vertical-mode boundary off synthetic filler content
    ///
    /// Starts walk forward and ends walk backward over consecutive fillers.
    pub fn skip_fillers<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        offset: ContentOffset,
        edge: Edge,
    ) -> ContentOffset {
        if !is_valid_node(host, self.frame.content, offset.node) {
            return self.content_bound(host, edge);
        }
        let Some(filler) = self.filler_at(host, offset, edge) else {
            return offset;
        };
        let mut node = Some(filler);
        while let Some(n) = node {
            if !self.is_filler(host, n) {
                break;
            }
            node = match edge {
                Edge::Start => host.next_sibling(n),
                Edge::End => host.previous_sibling(n),
            };
        }
        match (node, edge) {
            (Some(n), Edge::Start) => ContentOffset::start_of(n),
            (Some(n), Edge::End) => ContentOffset::end_of(host, n),
            (None, _) => self.content_bound(host, edge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimHost;
    use crate::layout::{LayoutDriver, Margins};
    use crate::undo::StyleLog;

    struct Fixture {
        host: SimHost,
        frame: Frame,
        geometry: ContainerGeometry,
        config: BookConfig,
        texts: Vec<NodeId>,
    }

    fn column_fixture(paragraphs: usize) -> Fixture {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        let mut texts = Vec::new();
        for _ in 0..paragraphs {
            let p = host.append_element(content, "p");
            texts.push(host.append_text(p, &"abcd ".repeat(240)));
        }
        let frame = Frame::new(container, content);
        let config = BookConfig {
            margins: Margins::new(20.0, 20.0, 30.0, 30.0),
            ..BookConfig::default()
        };
        let geometry = LayoutDriver::new()
            .apply_layout(&mut host, frame, &config, &mut StyleLog::new())
            .unwrap();
        Fixture {
            host,
            frame,
            geometry,
            config,
            texts,
        }
    }

    #[test]
    fn test_start_at_catch_point() {
        let mut f = column_fixture(5);
        let resolver = BoundaryResolver::new(f.frame, f.geometry, &f.config);
        let catch = resolver.default_catch(Edge::Start);
        assert_eq!(
            resolver.resolve_start(&mut f.host, 1, catch),
            ContentOffset::new(f.texts[0], 30)
        );

        f.host.set_scroll_left(f.frame.container, 660.0);
        assert_eq!(
            resolver.resolve_start(&mut f.host, 2, catch),
            ContentOffset::new(f.texts[1], 1110)
        );
    }

    #[test]
    fn test_end_scans_back_to_last_line() {
        let mut f = column_fixture(5);
        f.host.set_scroll_left(f.frame.container, 1320.0);
        let resolver = BoundaryResolver::new(f.frame, f.geometry, &f.config);
        let catch = resolver.default_catch(Edge::End);
        assert_eq!(
            resolver.resolve_end(&mut f.host, 3, catch),
            ContentOffset::new(f.texts[4], 1140)
        );
    }

    #[test]
    fn test_empty_content_falls_back() {
        let mut f = column_fixture(0);
        let resolver = BoundaryResolver::new(f.frame, f.geometry, &f.config);
        let catch = resolver.default_catch(Edge::Start);
        assert_eq!(
            resolver.resolve_start(&mut f.host, 1, catch),
            ContentOffset::start_of(f.frame.content)
        );
    }

    #[test]
    fn test_skip_fillers() {
        let mut host = SimHost::new(600.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        let p1 = host.append_element(content, "p");
        host.append_text(p1, "before");
        let mut fillers = Vec::new();
        for _ in 0..2 {
            let filler = host.append_element(content, "div");
            host.add_class(filler, "filler");
            host.set_style(filler, "height", "100px");
            fillers.push(filler);
        }
        let p2 = host.append_element(content, "p");
        host.append_text(p2, "after");

        let config = BookConfig::vertical();
        let frame = Frame::new(container, content);
        let resolver = BoundaryResolver::new(frame, ContainerGeometry::default(), &config);

        assert_eq!(
            resolver.skip_fillers(&host, ContentOffset::new(content, 1), Edge::Start),
            ContentOffset::start_of(p2)
        );
        assert_eq!(
            resolver.skip_fillers(&host, ContentOffset::new(fillers[1], 0), Edge::End),
            ContentOffset::end_of(&host, p1)
        );
        let inside = ContentOffset::new(host.children(p1)[0], 3);
        assert_eq!(resolver.skip_fillers(&host, inside, Edge::Start), inside);
    }
}
