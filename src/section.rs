//! Print sectioning
//!
//! Printing swaps a deep clone of the content into the tree and cuts the
//! clone into one `pagesection` element per page. The original content root
//! is set aside untouched, so restoring is a swap back rather than a rebuild
//! and the caller gets the very same root back.

use crate::boundary::BoundaryResolver;
use crate::config::BookConfig;
use crate::error::PagerError;
use crate::host::{px, LayoutHost, NodeId};
use crate::layout::{ContainerGeometry, Frame};
use crate::offset::{was_valid_node, ContentOffset, PageRange};
use crate::Point;
use log::{debug, info, warn};

pub const SECTION_TAG: &str = "pagesection";
pub const SECTION_CLASS: &str = "page-section";

/// Inline styles a relocated canvas gets, restored on exit
const CANVAS_PROPERTIES: [&str; 4] = ["top", "left", "display", "position"];

/// A cut point in the print copy, independent of child indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Before(NodeId),
    AtEnd(NodeId),
}

#[derive(Debug, Clone)]
struct CanvasRecord {
    node: NodeId,
    parent: NodeId,
    next: Option<NodeId>,
    styles: Vec<(&'static str, Option<String>)>,
}

/// Everything needed to undo a print build
#[derive(Debug)]
struct PrintSession {
    container: NodeId,
    original: NodeId,
    copy: NodeId,
    sections: Vec<NodeId>,
    ranges: Vec<PageRange>,
    canvases: Vec<CanvasRecord>,
    file_key: String,
}

/// What a print build works on
#[derive(Debug, Clone, Copy)]
pub struct PrintParams<'a> {
    pub frame: Frame,
    pub geometry: ContainerGeometry,
    pub config: &'a BookConfig,
    pub book_id: u32,
    pub pages: usize,
}

/// Builds and tears down print sections for one book
#[derive(Debug, Default)]
pub struct Sectioner {
    session: Option<PrintSession>,
}

impl Sectioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn sections(&self) -> &[NodeId] {
        self.session.as_ref().map_or(&[], |s| s.sections.as_slice())
    }

    /// Ranges the sections were cut at, in page order
    pub fn ranges(&self) -> &[PageRange] {
        self.session.as_ref().map_or(&[], |s| s.ranges.as_slice())
    }

    /// The clone shown while printing
    pub fn print_root(&self) -> Option<NodeId> {
        self.session.as_ref().map(|s| s.copy)
    }

    /// Key naming the per-page drawing canvases of this layout
    pub fn file_key(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.file_key.as_str())
    }

    /// Cut the content into page sections; returns the number of sections
    pub fn build<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        params: &PrintParams<'_>,
    ) -> Result<usize, PagerError> {
        if self.session.is_some() {
            return Err(PagerError::AlreadyInPrintMode);
        }
        let PrintParams {
            frame,
            geometry,
            config,
            book_id,
            pages,
        } = *params;
        let method = config.paging_method;
        let file_key = format!(
            "{}_{}_{}_{}_{}",
            book_id,
            geometry.width.round(),
            geometry.height.round(),
            host.computed_style(frame.content, "font-size"),
            frame.scroll_length(host, method).round()
        );

        let original = frame.content;
        let copy = host.clone_node(original, true);
        host.replace_with(original, copy);
        let print_frame = Frame::new(frame.container, copy);

        let cuts = self.resolve_cuts(host, print_frame, geometry, config, pages.max(1));
        print_frame.set_scroll_pos(host, method, 0.0);

        let ranges: Vec<PageRange> = cuts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = cuts
                    .get(i + 1)
                    .copied()
                    .unwrap_or_else(|| ContentOffset::end_of(host, copy));
                PageRange::new(host, start, end)
            })
            .collect();

        // Split from the back so earlier offsets stay meaningful
        let mut anchors: Vec<Anchor> = cuts
            .iter()
            .rev()
            .map(|&cut| anchor_for(host, copy, cut))
            .collect();
        anchors.reverse();
        anchors.push(Anchor::AtEnd(copy));

        let mut sections = Vec::with_capacity(ranges.len());
        for (i, pair) in anchors.windows(2).enumerate() {
            let section = extract(host, copy, pair[0], pair[1], i + 1);
            sections.push(section);
        }
        prune_empty(host, copy);

        for (i, &section) in sections.iter().enumerate() {
            if let Some(&next) = sections.get(i + 1) {
                continue_ordered_list(host, section, next);
            }
            let range = &ranges[i];
            if range.breaks_at_head_text {
                zero_edge(host, section, Side::Head);
            }
            if range.breaks_at_tail_text {
                zero_edge(host, section, Side::Tail);
            }
            let (width, height) = (px(geometry.width), px(geometry.height));
            for (property, value) in [
                ("position", "relative"),
                ("overflow", "hidden"),
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("break-after", "page"),
            ] {
                host.set_inline_style(section, property, Some(value));
            }
        }

        let canvases = relocate_canvases(host, &sections, &geometry, config, frame.container, &file_key);
        for property in ["column-width", "column-gap", "column-fill", "height", "width"] {
            host.set_inline_style(copy, property, None);
        }

        let count = sections.len();
        info!("print sections built: {count} pages, key {file_key}");
        self.session = Some(PrintSession {
            container: frame.container,
            original,
            copy,
            sections,
            ranges,
            canvases,
            file_key,
        });
        Ok(count)
    }

    /// Page starts in the copy, forced into document order
    fn resolve_cuts<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        frame: Frame,
        geometry: ContainerGeometry,
        config: &BookConfig,
        pages: usize,
    ) -> Vec<ContentOffset> {
        let resolver = BoundaryResolver::new(frame, geometry, config);
        let catch = Point::new(0.0, 10.0);
        let mut cuts = vec![ContentOffset::start_of(frame.content)];
        for page in 2..=pages {
            frame.set_scroll_pos(
                host,
                config.paging_method,
                geometry.scroll_pos_for_page(page),
            );
            let start = resolver.resolve_start(host, page, catch);
            let Some(&previous) = cuts.last() else {
                continue;
            };
            if start.is_before(host, &previous) {
                debug!("page {page} start {start:?} precedes the previous page, clamped");
                cuts.push(previous);
            } else {
                cuts.push(start);
            }
        }
        cuts
    }

    /// Swap the original content back in and put canvases where they were
    pub fn restore<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<NodeId, PagerError> {
        let session = self.session.take().ok_or(PagerError::NotInPrintMode)?;
        for record in session.canvases.iter().rev() {
            let next = record
                .next
                .filter(|&n| host.parent(n) == Some(record.parent));
            host.insert_before(record.parent, record.node, next);
            for (property, value) in &record.styles {
                host.set_inline_style(record.node, property, value.as_deref());
            }
        }
        host.replace_with(session.copy, session.original);
        if host.parent(session.original) != Some(session.container) {
            return Err(PagerError::Detached(session.original));
        }
        info!("print sections removed");
        Ok(session.original)
    }
}

fn anchor_for<H: LayoutHost + ?Sized>(host: &mut H, root: NodeId, offset: ContentOffset) -> Anchor {
    let node = offset.node;
    let anchor = if host.is_text(node) {
        let len = host.node_length(node);
        if offset.offset == 0 {
            Anchor::Before(node)
        } else if offset.offset >= len {
            match (host.next_sibling(node), host.parent(node)) {
                (Some(next), _) => Anchor::Before(next),
                (None, Some(parent)) => Anchor::AtEnd(parent),
                (None, None) => Anchor::AtEnd(root),
            }
        } else {
            Anchor::Before(host.split_text(node, offset.offset))
        }
    } else {
        match host.children(node).get(offset.offset) {
            Some(&child) => Anchor::Before(child),
            None => Anchor::AtEnd(node),
        }
    };

    // An end-of-element cut is the same as a cut before whatever follows it
    let Anchor::AtEnd(mut element) = anchor else {
        return anchor;
    };
    while element != root {
        if let Some(next) = host.next_sibling(element) {
            return Anchor::Before(next);
        }
        match host.parent(element) {
            Some(parent) => element = parent,
            None => break,
        }
    }
    Anchor::AtEnd(root)
}

/// Split ancestors between `anchor` and `root`; returns the child index in `root`
fn split_up_to<H: LayoutHost + ?Sized>(host: &mut H, root: NodeId, anchor: Anchor) -> usize {
    let (mut parent, mut index) = match anchor {
        Anchor::Before(node) => match (host.parent(node), host.index_in_parent(node)) {
            (Some(parent), Some(index)) => (parent, index),
            _ => return host.node_length(root),
        },
        Anchor::AtEnd(node) => (node, host.node_length(node)),
    };
    while parent != root {
        let (Some(grand), Some(position)) = (host.parent(parent), host.index_in_parent(parent)) else {
            break;
        };
        if index == 0 {
            index = position;
        } else if index >= host.node_length(parent) {
            index = position + 1;
        } else {
            let tail = host.clone_node(parent, false);
            let moved: Vec<NodeId> = host.children(parent).split_off(index);
            for child in moved {
                host.insert_before(tail, child, None);
            }
            let next = host.next_sibling(parent);
            host.insert_before(grand, tail, next);
            index = position + 1;
        }
        parent = grand;
    }
    index
}

/// Move everything between two anchors into a new section
fn extract<H: LayoutHost + ?Sized>(
    host: &mut H,
    root: NodeId,
    start: Anchor,
    end: Anchor,
    page: usize,
) -> NodeId {
    let from = split_up_to(host, root, start);
    let to = split_up_to(host, root, end);
    let children = host.children(root);
    let to = to.min(children.len());
    let from = from.min(to);
    let reference = children.get(from).copied();

    let section = host.create_element(SECTION_TAG);
    host.add_class(section, SECTION_CLASS);
    host.set_attribute(section, "data-page-number", Some(&page.to_string()));
    for &child in &children[from..to] {
        host.insert_before(section, child, None);
    }
    let reference = reference.filter(|&r| host.parent(r) == Some(root));
    host.insert_before(root, section, reference);
    section
}

/// Remove elements left without text or replaced content
fn prune_empty<H: LayoutHost + ?Sized>(host: &mut H, root: NodeId) {
    let mut stack = host.children(root);
    while let Some(node) = stack.pop() {
        if !host.is_element(node) {
            continue;
        }
        if host.tag_name(node) != SECTION_TAG && !was_valid_node(host, node) {
            host.remove(node);
            continue;
        }
        stack.extend(host.children(node));
    }
}

fn chain_find<H: LayoutHost + ?Sized>(
    host: &H,
    start: NodeId,
    step: impl Fn(&H, NodeId) -> Option<NodeId>,
    tag: &str,
) -> Option<NodeId> {
    let mut current = step(host, start);
    while let Some(node) = current {
        if host.tag_name(node) == tag {
            return Some(node);
        }
        current = step(host, node);
    }
    None
}

/// Number the list continued in `next` after the items already in `section`
fn continue_ordered_list<H: LayoutHost + ?Sized>(host: &mut H, section: NodeId, next: NodeId) {
    let tail = chain_find(host, section, |h, n| h.last_element_child(n), "ol");
    let head = chain_find(host, next, |h, n| h.first_element_child(n), "ol");
    let (Some(tail), Some(head)) = (tail, head) else {
        return;
    };
    let base: i64 = host
        .attribute(tail, "start")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1);
    let items = host
        .children(tail)
        .into_iter()
        .filter(|&c| host.tag_name(c) == "li")
        .count() as i64;
    host.set_attribute(head, "start", Some(&(base + items).to_string()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Head,
    Tail,
}

/// Zero the box edges a forced text break would otherwise double
fn zero_edge<H: LayoutHost + ?Sized>(host: &mut H, section: NodeId, side: Side) {
    let properties: [&str; 3] = match side {
        Side::Head => ["margin-top", "border-top-width", "padding-top"],
        Side::Tail => ["margin-bottom", "border-bottom-width", "padding-bottom"],
    };
    let mut current = Some(section);
    while let Some(node) = current {
        if node != section {
            for property in properties {
                host.set_inline_style(node, property, Some("0px"));
            }
        }
        current = match side {
            Side::Head => host.first_element_child(node),
            Side::Tail => host.last_element_child(node),
        };
    }
}

/// Move each page's drawing canvas into its section
fn relocate_canvases<H: LayoutHost + ?Sized>(
    host: &mut H,
    sections: &[NodeId],
    geometry: &ContainerGeometry,
    config: &BookConfig,
    container: NodeId,
    file_key: &str,
) -> Vec<CanvasRecord> {
    let drawing = host
        .children(container)
        .iter()
        .any(|&c| host.is_element(c) && host.has_class(c, &config.draw_class));
    let mut records = Vec::new();
    for (i, &section) in sections.iter().enumerate() {
        let page = i + 1;
        let id = format!("{}{page}_{file_key}", config.draw_class);
        let Some(canvas) = host.find_by_id(&id) else {
            if drawing {
                warn!("no drawing canvas `{id}` for page {page}");
            }
            continue;
        };
        let Some(parent) = host.parent(canvas) else {
            continue;
        };
        let styles = CANVAS_PROPERTIES
            .iter()
            .map(|&p| (p, host.inline_style(canvas, p)))
            .collect();
        records.push(CanvasRecord {
            node: canvas,
            parent,
            next: host.next_sibling(canvas),
            styles,
        });
        let (top, left) = (px(-geometry.margins.upper), px(-geometry.margins.left));
        host.set_inline_style(canvas, "top", Some(&top));
        host.set_inline_style(canvas, "left", Some(&left));
        host.set_inline_style(canvas, "display", Some("block"));
        host.set_inline_style(canvas, "position", Some("absolute"));
        host.insert_before(section, canvas, None);
    }
    records
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
    }

    fn params(frame: Frame, geometry: ContainerGeometry, config: &BookConfig, pages: usize) -> PrintParams<'_> {
        PrintParams {
            frame,
            geometry,
            config,
            book_id: 1,
            pages,
        }
    }

    fn column_fixture(build: impl FnOnce(&mut SimHost, NodeId)) -> Fixture {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        build(&mut host, content);
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
        }
    }

    fn paragraphs(host: &mut SimHost, content: NodeId, count: usize) {
        for _ in 0..count {
            let p = host.append_element(content, "p");
            host.append_text(p, &"abcd ".repeat(240));
        }
    }

    #[test]
    fn test_sections_cut_at_page_starts() {
        let mut f = column_fixture(|host, content| paragraphs(host, content, 5));
        let content = f.frame.content;
        let texts: Vec<NodeId> = f
            .host
            .children(content)
            .into_iter()
            .map(|p| f.host.children(p)[0])
            .collect();
        let before = f.host.serialize(content);

        let mut sectioner = Sectioner::new();
        let params = params(f.frame, f.geometry, &f.config, 3);
        assert_eq!(sectioner.build(&mut f.host, &params), Ok(3));

        let root = sectioner.print_root().unwrap();
        assert_eq!(f.host.children(f.frame.container)[0], root);
        assert_eq!(f.host.children(root), sectioner.sections().to_vec());
        assert_eq!(f.host.parent(content), None);
        // The original keeps its text untouched
        assert_eq!(f.host.node_length(texts[1]), 1200);

        let ranges = sectioner.ranges();
        assert!(!ranges[0].breaks_at_head_text);
        assert!(ranges[0].breaks_at_tail_text);
        assert!(ranges[1].breaks_at_head_text);
        assert_eq!(ranges[1].start.offset, 1080);
        assert_eq!(ranges[2].start.offset, 960);

        let second = sectioner.sections()[1];
        assert_eq!(
            f.host.attribute(second, "data-page-number").as_deref(),
            Some("2")
        );
        let text = f.host.text_content(second);
        assert_eq!(text.chars().count(), 120 + 1200 + 960);
        let first_p = f.host.first_element_child(second).unwrap();
        assert_eq!(f.host.inline_style(first_p, "margin-top").as_deref(), Some("0px"));

        assert_eq!(sectioner.restore(&mut f.host), Ok(content));
        assert_eq!(f.host.children(f.frame.container), vec![content]);
        assert_eq!(f.host.serialize(content), before);
        assert!(!sectioner.is_active());
    }

    #[test]
    fn test_canvas_relocated_and_restored() {
        let mut f = column_fixture(|host, content| paragraphs(host, content, 5));
        let canvas = f.host.append_element(f.frame.container, "canvas");
        f.host.add_class(canvas, "draw");
        f.host.set_style(canvas, "position", "absolute");
        f.host
            .set_attribute(canvas, "id", Some("draw2_1_600_760_16px_1980"));
        let before = f.host.serialize(f.frame.container);

        let mut sectioner = Sectioner::new();
        let params = params(f.frame, f.geometry, &f.config, 3);
        sectioner.build(&mut f.host, &params).unwrap();
        assert_eq!(sectioner.file_key(), Some("1_600_760_16px_1980"));
        assert_eq!(f.host.parent(canvas), Some(sectioner.sections()[1]));
        assert_eq!(f.host.inline_style(canvas, "top").as_deref(), Some("-20px"));
        assert_eq!(f.host.inline_style(canvas, "left").as_deref(), Some("-30px"));

        sectioner.restore(&mut f.host).unwrap();
        assert_eq!(f.host.parent(canvas), Some(f.frame.container));
        assert_eq!(f.host.serialize(f.frame.container), before);
    }

    #[test]
    fn test_ordered_list_numbering_continues() {
        let mut f = column_fixture(|host, content| {
            let p = host.append_element(content, "p");
            host.append_text(p, &"abcd ".repeat(12 * 30));
            let ol = host.append_element(content, "ol");
            for _ in 0..10 {
                let li = host.append_element(ol, "li");
                host.append_text(li, &"abcd ".repeat(12 * 2));
            }
        });
        let mut sectioner = Sectioner::new();
        let params = params(f.frame, f.geometry, &f.config, 2);
        sectioner.build(&mut f.host, &params).unwrap();

        let sections = sectioner.sections().to_vec();
        let first_ol = chain_find(&f.host, sections[0], |h, n| h.last_element_child(n), "ol").unwrap();
        let items = f.host.children(first_ol).len();
        let next_ol = chain_find(&f.host, sections[1], |h, n| h.first_element_child(n), "ol").unwrap();
        assert_eq!(items, 4);
        assert_eq!(f.host.attribute(next_ol, "start").as_deref(), Some("5"));
        sectioner.restore(&mut f.host).unwrap();
    }

    #[test]
    fn test_restore_without_build() {
        let mut f = column_fixture(|host, content| paragraphs(host, content, 1));
        let mut sectioner = Sectioner::new();
        assert_eq!(
            sectioner.restore(&mut f.host),
            Err(PagerError::NotInPrintMode)
        );
        let params = params(f.frame, f.geometry, &f.config, 1);
        sectioner.build(&mut f.host, &params).unwrap();
        assert_eq!(
            sectioner.build(&mut f.host, &params),
            Err(PagerError::AlreadyInPrintMode)
        );
    }
}
