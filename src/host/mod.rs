//! Layout host seam
//!
//! The engine samples and edits a live, laid-out content tree through
//! [`LayoutHost`]. Geometry is reported in viewport coordinates, the way a
//! browser reports client rects: a node scrolled out of view has negative or
//! large coordinates, never clipped ones.

mod font;
mod sim;

pub use font::{wrap_text, FontMetrics, LineSpan};
pub use sim::SimHost;

use crate::{Point, Rect};
use smallvec::SmallVec;

/// Handle to a node owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments, processing instructions and anything else without layout
    Other,
}

/// CSS `position`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "relative" => Position::Relative,
            "absolute" => Position::Absolute,
            "fixed" => Position::Fixed,
            "sticky" => Position::Sticky,
            _ => Position::Static,
        }
    }

    /// Taken out of normal flow
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Position::Absolute | Position::Fixed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
    CharacterData,
}

/// One observed change in an observed subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added: SmallVec<[NodeId; 2]>,
    pub removed: SmallVec<[NodeId; 2]>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added: &[NodeId], removed: &[NodeId]) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added: SmallVec::from_slice(added),
            removed: SmallVec::from_slice(removed),
        }
    }

    pub fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes {
                name: name.to_string(),
            },
            target,
            added: SmallVec::new(),
            removed: SmallVec::new(),
        }
    }

    pub fn character_data(target: NodeId) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added: SmallVec::new(),
            removed: SmallVec::new(),
        }
    }

    /// Nodes were added or removed
    pub fn changes_tree(&self) -> bool {
        self.kind == MutationKind::ChildList && !(self.added.is_empty() && self.removed.is_empty())
    }

    /// Attribute names that can move content around
    pub fn affects_layout(&self) -> bool {
        match &self.kind {
            MutationKind::ChildList | MutationKind::CharacterData => true,
            MutationKind::Attributes { name } => {
                matches!(name.as_str(), "style" | "class" | "width" | "height" | "id")
            }
        }
    }
}

/// Tags whose content is replaced by the host (images, frames, ...)
pub const REPLACED_TAGS: &[&str] = &[
    "img", "video", "audio", "canvas", "svg", "iframe", "embed", "object", "picture", "hr",
    "input", "textarea", "select", "math",
];

/// Tags treated as resizable media inside page items
pub const MEDIA_TAGS: &[&str] = &["img", "video", "iframe", "canvas", "svg", "embed", "object"];

pub fn is_replaced_tag(tag: &str) -> bool {
    REPLACED_TAGS.contains(&tag)
}

pub fn is_media_tag(tag: &str) -> bool {
    MEDIA_TAGS.contains(&tag)
}

/// Parse a CSS pixel length ("12px", "12.5", "auto" -> None)
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Format a pixel length for an inline style
pub fn px(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}px", value as i64)
    } else {
        format!("{value}px")
    }
}

/// Capabilities the engine needs from a laid-out content tree
///
/// Geometry queries take `&self`; a host is free to lay out lazily. All
/// points and rects are viewport coordinates.
pub trait LayoutHost {
    // Tree

    fn node_kind(&self, node: NodeId) -> NodeKind;
    /// Lowercase tag name, empty for non-elements
    fn tag_name(&self, node: NodeId) -> String;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>);
    fn find_by_id(&self, id: &str) -> Option<NodeId>;
    /// Concatenated text of the subtree
    fn text_content(&self, node: NodeId) -> String;
    /// Character length of a text node, child count of an element
    fn node_length(&self, node: NodeId) -> usize;

    // Style

    /// Computed value, empty when the property is unknown
    fn computed_style(&self, node: NodeId, property: &str) -> String;
    fn inline_style(&self, node: NodeId, property: &str) -> Option<String>;
    /// `None` removes the inline declaration
    fn set_inline_style(&mut self, node: NodeId, property: &str, value: Option<&str>);

    // Geometry

    fn client_rects(&self, node: NodeId) -> Vec<Rect>;
    /// Rect covering characters `start..end` of a text node
    fn range_rect(&self, node: NodeId, start: usize, end: usize) -> Option<Rect>;
    fn client_width(&self, node: NodeId) -> f32;
    fn client_height(&self, node: NodeId) -> f32;
    fn scroll_width(&self, node: NodeId) -> f32;
    fn scroll_height(&self, node: NodeId) -> f32;
    fn scroll_left(&self, node: NodeId) -> f32;
    fn scroll_top(&self, node: NodeId) -> f32;
    fn set_scroll_left(&mut self, node: NodeId, value: f32);
    fn set_scroll_top(&mut self, node: NodeId, value: f32);
    fn viewport_size(&self) -> (f32, f32);
    /// Attached, displayed and with a non-zero box
    fn is_visible(&self, node: NodeId) -> bool;
    /// Topmost element accepting pointer events at `point`
    fn element_from_point(&self, point: Point) -> Option<NodeId>;
    /// Content offset under `point`; `None` past the end of content
    fn caret_from_point(&self, point: Point) -> Option<(NodeId, usize)>;

    // Mutation

    fn create_element(&mut self, tag: &str) -> NodeId;
    /// Insert (or move) `node` into `parent` before `reference`, appending when `None`
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);
    /// Detach `node` from its parent
    fn remove(&mut self, node: NodeId);
    /// Split a text node at `offset`, returning the new following node
    fn split_text(&mut self, node: NodeId, offset: usize) -> NodeId;
    /// Merge adjacent text nodes and drop empty ones under `node`
    fn normalize(&mut self, node: NodeId);
    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId;
    /// Put `replacement` where `node` is, detaching `node`
    fn replace_with(&mut self, node: NodeId, replacement: NodeId);

    // Observation and environment

    fn set_observing(&mut self, root: NodeId, observing: bool);
    fn take_mutations(&mut self) -> Vec<MutationRecord>;
    /// Put undelivered records back at the front of the queue
    fn requeue_mutations(&mut self, records: Vec<MutationRecord>);
    fn now_ms(&self) -> f64;
    fn session_get(&self, key: &str) -> Option<String>;
    fn session_set(&mut self, key: &str, value: Option<&str>);

    // Provided helpers

    fn bounding_rect(&self, node: NodeId) -> Rect {
        let rects = self.client_rects(node);
        let mut iter = rects.iter();
        match iter.next() {
            Some(first) => iter.fold(*first, |acc, r| acc.union(r)),
            None => Rect::default(),
        }
    }

    fn is_text(&self, node: NodeId) -> bool {
        self.node_kind(node) == NodeKind::Text
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.node_kind(node) == NodeKind::Element
    }

    fn position(&self, node: NodeId) -> Position {
        if self.is_element(node) {
            Position::parse(&self.computed_style(node, "position"))
        } else {
            Position::Static
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == node)?;
        siblings.get(index + 1).copied()
    }

    fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).into_iter().find(|&c| self.is_element(c))
    }

    fn last_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).into_iter().rev().find(|&c| self.is_element(c))
    }

    /// `node` is `ancestor` or lies inside it
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nearest inclusive ancestor carrying `class`
    fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_element(n) && self.has_class(n, class) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }
}
