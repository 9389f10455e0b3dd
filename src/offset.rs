//! Content offsets, page ranges, document order and node validity

use crate::config::PagingMethod;
use crate::host::{is_replaced_tag, LayoutHost, NodeId, NodeKind};
use crate::layout::{ContainerGeometry, Frame};
use crate::Rect;
use smallvec::SmallVec;
use std::cmp::Ordering;

/// A caret-like point in content: character index in a text node or child index in an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentOffset {
    pub node: NodeId,
    pub offset: usize,
}

impl ContentOffset {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    pub fn start_of(node: NodeId) -> Self {
        Self { node, offset: 0 }
    }

    pub fn end_of<H: LayoutHost + ?Sized>(host: &H, node: NodeId) -> Self {
        Self {
            node,
            offset: host.node_length(node),
        }
    }

    /// Sort key: child-index path of the node followed by the offset
    pub fn order_key<H: LayoutHost + ?Sized>(&self, host: &H) -> (NodeId, SmallVec<[usize; 16]>) {
        let mut key: SmallVec<[usize; 16]> = SmallVec::new();
        key.push(self.offset);
        let mut current = self.node;
        while let Some(parent) = host.parent(current) {
            key.push(host.index_in_parent(current).unwrap_or(0));
            current = parent;
        }
        key.reverse();
        (current, key)
    }

    /// Document order of two offsets; `None` when they live in different trees
    pub fn compare<H: LayoutHost + ?Sized>(&self, host: &H, other: &ContentOffset) -> Option<Ordering> {
        let (root_a, key_a) = self.order_key(host);
        let (root_b, key_b) = other.order_key(host);
        (root_a == root_b).then(|| key_a.cmp(&key_b))
    }

    pub fn is_before<H: LayoutHost + ?Sized>(&self, host: &H, other: &ContentOffset) -> bool {
        self.compare(host, other) == Some(Ordering::Less)
    }
}

/// Exact content span of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: ContentOffset,
    pub end: ContentOffset,
    /// The page starts in the middle of a text node
    pub breaks_at_head_text: bool,
    /// The page ends in the middle of a text node
    pub breaks_at_tail_text: bool,
}

impl PageRange {
    pub fn new<H: LayoutHost + ?Sized>(host: &H, start: ContentOffset, end: ContentOffset) -> Self {
        let splits = |o: &ContentOffset| {
            host.is_text(o.node) && o.offset > 0 && o.offset < host.node_length(o.node)
        };
        Self {
            start,
            end,
            breaks_at_head_text: splits(&start),
            breaks_at_tail_text: splits(&end),
        }
    }

    /// Start does not come after end
    pub fn is_ordered<H: LayoutHost + ?Sized>(&self, host: &H) -> bool {
        matches!(
            self.start.compare(host, &self.end),
            Some(Ordering::Less | Ordering::Equal)
        )
    }
}

/// Inside an out-of-flow box that is itself inside the content root
fn in_positioned_subtree<H: LayoutHost + ?Sized>(host: &H, content: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == content {
            return false;
        }
        if host.position(n).is_out_of_flow() {
            return true;
        }
        current = host.parent(n);
    }
    false
}

/// A node pagination can anchor to: rendered, in flow and not empty
pub fn is_valid_node<H: LayoutHost + ?Sized>(host: &H, content: NodeId, node: NodeId) -> bool {
    match host.node_kind(node) {
        NodeKind::Text => {
            !host.text_content(node).trim().is_empty()
                && !in_positioned_subtree(host, content, node)
        }
        NodeKind::Element => {
            !in_positioned_subtree(host, content, node) && !host.bounding_rect(node).is_empty()
        }
        NodeKind::Other => false,
    }
}

/// Validity of a node that has already left the tree
///
/// Its geometry is gone, so only what it carried counts.
pub fn was_valid_node<H: LayoutHost + ?Sized>(host: &H, node: NodeId) -> bool {
    match host.node_kind(node) {
        NodeKind::Text => !host.text_content(node).trim().is_empty(),
        NodeKind::Element => {
            if !host.text_content(node).trim().is_empty() {
                return true;
            }
            let mut stack = vec![node];
            while let Some(n) = stack.pop() {
                if is_replaced_tag(&host.tag_name(n)) {
                    return true;
                }
                stack.extend(host.children(n));
            }
            false
        }
        NodeKind::Other => false,
    }
}

/// Rect used to place an element on a page
///
/// Column fragments can leave slivers at a column foot, so the first rect
/// taller than 10px wins there.
fn element_rect<H: LayoutHost + ?Sized>(host: &H, method: PagingMethod, node: NodeId) -> Option<Rect> {
    let rects = host.client_rects(node);
    match method {
        PagingMethod::Column => rects
            .iter()
            .find(|r| r.height > 10.0)
            .or_else(|| rects.first())
            .copied(),
        PagingMethod::Vertical => {
            let mut iter = rects.iter();
            iter.next().map(|first| iter.fold(*first, |acc, r| acc.union(r)))
        }
    }
}

fn offset_rect<H: LayoutHost + ?Sized>(
    host: &H,
    method: PagingMethod,
    offset: &ContentOffset,
) -> Option<Rect> {
    if host.is_text(offset.node) {
        let len = host.node_length(offset.node);
        return host.range_rect(offset.node, offset.offset.min(len), len);
    }
    let children = host.children(offset.node);
    let child = children
        .get(offset.offset)
        .or_else(|| offset.offset.checked_sub(1).and_then(|i| children.get(i)));
    let rect = match child {
        Some(&c) if host.is_text(c) => host.range_rect(c, 0, host.node_length(c)),
        Some(&c) => element_rect(host, method, c),
        None => None,
    };
    rect.or_else(|| element_rect(host, method, offset.node))
}

/// Page showing `offset`, from its rect and the current scroll position
pub fn page_for_offset<H: LayoutHost + ?Sized>(
    host: &H,
    frame: Frame,
    geometry: &ContainerGeometry,
    method: PagingMethod,
    offset: &ContentOffset,
) -> Option<usize> {
    let rect = offset_rect(host, method, offset)?;
    Some(geometry.page_for_scroll_pos(frame.axis_position(host, method, rect)))
}

pub fn page_for_node<H: LayoutHost + ?Sized>(
    host: &H,
    frame: Frame,
    geometry: &ContainerGeometry,
    method: PagingMethod,
    node: NodeId,
) -> Option<usize> {
    let rect = if host.is_text(node) {
        host.range_rect(node, 0, host.node_length(node))
    } else {
        element_rect(host, method, node)
    }?;
    Some(geometry.page_for_scroll_pos(frame.axis_position(host, method, rect)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimHost;

    fn tree() -> (SimHost, NodeId, Vec<NodeId>) {
        let mut host = SimHost::new(600.0, 400.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        let p1 = host.append_element(content, "p");
        let t1 = host.append_text(p1, "first paragraph");
        let p2 = host.append_element(content, "p");
        let t2 = host.append_text(p2, "second paragraph");
        (host, content, vec![p1, t1, p2, t2])
    }

    #[test]
    fn test_document_order() {
        let (host, content, n) = tree();
        let (p1, t1, p2, t2) = (n[0], n[1], n[2], n[3]);
        let a = ContentOffset::new(t1, 3);
        let b = ContentOffset::new(t1, 7);
        let c = ContentOffset::new(t2, 0);
        assert!(a.is_before(&host, &b));
        assert!(b.is_before(&host, &c));
        assert_eq!(a.compare(&host, &a), Some(Ordering::Equal));

        // Boundary before p2 precedes anything inside p2
        let before_p2 = ContentOffset::new(content, 1);
        assert!(b.is_before(&host, &before_p2));
        assert!(before_p2.is_before(&host, &c));
        assert!(ContentOffset::start_of(p1).is_before(&host, &ContentOffset::end_of(&host, p2)));
    }

    #[test]
    fn test_detached_not_comparable() {
        let (mut host, _content, n) = tree();
        let loose = host.create_element("span");
        assert_eq!(
            ContentOffset::new(n[1], 0).compare(&host, &ContentOffset::new(loose, 0)),
            None
        );
    }

    #[test]
    fn test_page_range_flags() {
        let (host, _content, n) = tree();
        let range = PageRange::new(&host, ContentOffset::new(n[1], 4), ContentOffset::new(n[3], 16));
        assert!(range.breaks_at_head_text);
        assert!(!range.breaks_at_tail_text);
        assert!(range.is_ordered(&host));
        let reversed = PageRange::new(&host, range.end, range.start);
        assert!(!reversed.is_ordered(&host));
    }

    #[test]
    fn test_validity() {
        let (mut host, content, n) = tree();
        assert!(is_valid_node(&host, content, n[1]));
        assert!(is_valid_node(&host, content, n[0]));
        let blank = host.append_text(content, "   ");
        assert!(!is_valid_node(&host, content, blank));
        let empty = host.append_element(content, "div");
        assert!(!is_valid_node(&host, content, empty));
        let overlay = host.append_element(content, "aside");
        host.set_style(overlay, "position", "absolute");
        host.set_style(overlay, "width", "100px");
        host.set_style(overlay, "height", "100px");
        let inner = host.append_text(overlay, "note");
        assert!(!is_valid_node(&host, content, overlay));
        assert!(!is_valid_node(&host, content, inner));

        let img = host.create_element("img");
        assert!(was_valid_node(&host, img));
        let gone = host.create_element("div");
        assert!(!was_valid_node(&host, gone));
    }
}
