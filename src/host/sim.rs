//! In-memory laid-out tree
//!
//! A deliberately small layout model: every element is a block, text wraps
//! with fixed metrics, replaced elements are atoms, and an element carrying
//! `column-width` fragments its content into columns. Each in-flow child of
//! the document root is a scroll container filling the viewport; positioned
//! children of the root are overlays.

use super::font::{wrap_text, FontMetrics};
use super::{is_replaced_tag, parse_px, LayoutHost, MutationRecord, NodeId, NodeKind, Position};
use crate::{Point, Rect};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::cell::RefCell;

const EPSILON: f32 = 0.01;

#[derive(Debug, Clone)]
struct SimNode {
    kind: NodeKind,
    tag: String,
    text: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    intrinsic: Option<(f32, f32)>,
    scroll: (f32, f32),
}

impl SimNode {
    fn new(kind: NodeKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_ascii_lowercase(),
            text: String::new(),
            classes: Vec::new(),
            attributes: Vec::new(),
            style: Vec::new(),
            parent: None,
            children: Vec::new(),
            intrinsic: None,
            scroll: (0.0, 0.0),
        }
    }

    /// Copy without tree links
    fn detached_copy(&self) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            scroll: (0.0, 0.0),
            ..self.clone()
        }
    }

    fn style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }
}

/// Coordinate space a rect was laid out in
#[derive(Debug, Clone, Copy, PartialEq)]
enum Space {
    Client,
    Scrolled(NodeId),
}

#[derive(Debug, Clone, Copy)]
enum UnitKind {
    Line { node: NodeId, start: usize, end: usize },
    Atom { node: NodeId },
}

/// A line box or atomic box, the granularity of caret queries
#[derive(Debug, Clone, Copy)]
struct Unit {
    kind: UnitKind,
    container: NodeId,
    rect: Rect,
    column_x: f32,
}

#[derive(Debug, Default)]
struct Layout {
    frags: FxHashMap<NodeId, (Space, SmallVec<[Rect; 2]>)>,
    client_sizes: FxHashMap<NodeId, (f32, f32)>,
    extents: FxHashMap<NodeId, (f32, f32)>,
    units: Vec<Unit>,
    positioned: Vec<NodeId>,
    in_flow: Vec<(NodeId, u32)>,
    containers: Vec<NodeId>,
    leaves: Vec<Rect>,
}

impl Layout {
    fn set(&mut self, node: NodeId, space: Space, rects: SmallVec<[Rect; 2]>) {
        self.frags.insert(node, (space, rects));
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    height: f32,
    pitch: f32,
}

/// Block formatting cursor, optionally fragmented into columns
#[derive(Debug, Clone, Copy)]
struct Flow {
    x: f32,
    y: f32,
    width: f32,
    cursor: f32,
    columns: Option<Columns>,
    container: NodeId,
}

impl Flow {
    fn column_of(&self, cursor: f32) -> f32 {
        match self.columns {
            Some(c) if c.height > 0.0 => ((cursor + EPSILON) / c.height).floor(),
            _ => 0.0,
        }
    }

    fn point_at(&self, cursor: f32) -> (f32, f32) {
        match self.columns {
            Some(c) if c.height > 0.0 => {
                let col = self.column_of(cursor);
                (self.x + col * c.pitch, self.y + cursor - col * c.height)
            }
            _ => (self.x, self.y + cursor),
        }
    }

    /// Place a box of `height`, moving it to the next column when it would cross one
    fn place(&mut self, height: f32) -> (f32, f32) {
        if let Some(c) = self.columns {
            if c.height > 0.0 {
                let col = self.column_of(self.cursor);
                let within = self.cursor - col * c.height;
                if within > EPSILON && within + height > c.height + EPSILON {
                    self.cursor = (col + 1.0) * c.height;
                }
            }
        }
        let at = self.point_at(self.cursor);
        self.cursor += height;
        at
    }

    fn column_x(&self, x: f32) -> f32 {
        if self.columns.is_some() {
            x
        } else {
            f32::NEG_INFINITY
        }
    }
}

fn same_column(a: f32, b: f32) -> bool {
    a == b || (a - b).abs() < 0.5
}

fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let from = indices.clone().nth(start).unwrap_or(text.len());
    let to = indices.nth(end).unwrap_or(text.len());
    &text[from..to.max(from)]
}

enum CaretSide {
    Inside(f32),
    Start,
    End,
}

/// In-memory [`LayoutHost`]
pub struct SimHost {
    nodes: Vec<SimNode>,
    document: NodeId,
    viewport: (f32, f32),
    metrics: FontMetrics,
    observed: FxHashSet<NodeId>,
    records: Vec<MutationRecord>,
    session: FxHashMap<String, String>,
    clock_ms: f64,
    layout: RefCell<Option<Layout>>,
}

impl SimHost {
    /// Create an empty document with the given viewport size
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            nodes: vec![SimNode::new(NodeKind::Element, "body")],
            document: NodeId(0),
            viewport: (width, height),
            metrics: FontMetrics::default(),
            observed: FxHashSet::default(),
            records: Vec::new(),
            session: FxHashMap::default(),
            clock_ms: 0.0,
            layout: RefCell::new(None),
        }
    }

    pub fn with_metrics(mut self, metrics: FontMetrics) -> Self {
        self.metrics = metrics;
        self.invalidate();
        self
    }

    pub fn document(&self) -> NodeId {
        self.document
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.insert_before(parent, node, None);
        node
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let mut node = SimNode::new(NodeKind::Text, "");
        node.text = text.to_string();
        let id = self.push(node);
        self.insert_before(parent, id, None);
        id
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        self.set_inline_style(node, property, Some(value));
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.text = text.to_string();
        }
        self.record(MutationRecord::character_data(node));
        self.invalidate();
    }

    /// Natural size of a replaced element
    pub fn set_intrinsic_size(&mut self, node: NodeId, width: f32, height: f32) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.intrinsic = Some((width, height));
        }
        self.invalidate();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
        self.invalidate();
    }

    pub fn advance_clock(&mut self, ms: f64) {
        self.clock_ms += ms;
    }

    /// Child-index path from the document root
    pub fn node_path(&self, node: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(index) = self.index_in_parent(current) {
            path.push(index);
            match self.parent(current) {
                Some(p) => current = p,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Markup rendering of a subtree, skipping whitespace-only text
    pub fn serialize(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(node, &mut out);
        out
    }

    fn serialize_into(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.get(node) else {
            return;
        };
        match n.kind {
            NodeKind::Text => {
                if !n.text.trim().is_empty() {
                    out.push_str(&n.text);
                }
            }
            NodeKind::Other => {}
            NodeKind::Element => {
                out.push('<');
                out.push_str(&n.tag);
                if !n.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", n.classes.join(" ")));
                }
                for (k, v) in &n.attributes {
                    out.push_str(&format!(" {k}=\"{v}\""));
                }
                if !n.style.is_empty() {
                    let mut decls: Vec<_> = n.style.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                    decls.sort();
                    out.push_str(&format!(" style=\"{}\"", decls.join(";")));
                }
                out.push('>');
                for &child in &n.children {
                    self.serialize_into(child, out);
                }
                out.push_str(&format!("</{}>", n.tag));
            }
        }
    }

    fn push(&mut self, node: SimNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn get(&self, node: NodeId) -> Option<&SimNode> {
        self.nodes.get(node.0 as usize)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut SimNode> {
        self.nodes.get_mut(node.0 as usize)
    }

    fn invalidate(&mut self) {
        *self.layout.get_mut() = None;
    }

    fn record(&mut self, record: MutationRecord) {
        let observed = self
            .observed
            .iter()
            .any(|&root| self.contains(root, record.target));
        if observed {
            self.records.push(record);
        }
    }

    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent?;
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
        }
        self.record(MutationRecord::child_list(parent, &[], &[node]));
        Some(parent)
    }

    fn style_px(&self, node: NodeId, property: &str) -> Option<f32> {
        parse_px(&self.computed_style(node, property))
    }

    fn is_displayed(&self, node: NodeId) -> bool {
        self.computed_style(node, "display") != "none"
    }

    fn pointer_events_enabled(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.computed_style(n, "pointer-events") == "none" {
                return false;
            }
            current = self.parent(n);
        }
        true
    }

    fn with_layout<R>(&self, f: impl FnOnce(&Layout) -> R) -> R {
        let mut slot = self.layout.borrow_mut();
        let layout = slot.get_or_insert_with(|| self.compute_layout());
        f(layout)
    }

    fn to_client(&self, space: Space, rect: Rect) -> Rect {
        match space {
            Space::Client => rect,
            Space::Scrolled(container) => {
                let (left, top) = self.get(container).map(|n| n.scroll).unwrap_or_default();
                rect.translate(-left, -top)
            }
        }
    }

    // Layout

    fn compute_layout(&self) -> Layout {
        let mut layout = Layout::default();
        let children = self.children(self.document);
        for child in children {
            if !self.is_element(child) || !self.is_displayed(child) {
                continue;
            }
            let position = self.position(child);
            if position.is_out_of_flow() {
                self.layout_positioned(child, Space::Client, &mut layout);
                continue;
            }
            layout.containers.push(child);
            self.layout_container(child, &mut layout);
        }
        layout
    }

    fn layout_positioned(&self, node: NodeId, space: Space, layout: &mut Layout) {
        let rect = Rect::new(
            self.style_px(node, "left").unwrap_or(0.0),
            self.style_px(node, "top").unwrap_or(0.0),
            self.style_px(node, "width").unwrap_or(0.0),
            self.style_px(node, "height").unwrap_or(0.0),
        );
        layout.positioned.push(node);
        layout.client_sizes.insert(node, (rect.width, rect.height));
        layout.set(node, space, SmallVec::from_slice(&[rect]));
    }

    fn layout_container(&self, container: NodeId, layout: &mut Layout) {
        let (vw, vh) = self.viewport;
        let pad = |p: &str| self.style_px(container, p).unwrap_or(0.0);
        let (pt, pr, pb, pl) = (
            pad("padding-top"),
            pad("padding-right"),
            pad("padding-bottom"),
            pad("padding-left"),
        );
        layout.set(
            container,
            Space::Client,
            SmallVec::from_slice(&[Rect::new(0.0, 0.0, vw, vh)]),
        );
        layout.client_sizes.insert(container, (vw, vh));

        let mut flow = Flow {
            x: pl,
            y: pt,
            width: (vw - pl - pr).max(0.0),
            cursor: 0.0,
            columns: None,
            container,
        };
        for child in self.children(container) {
            self.layout_node(child, &mut flow, 1, layout);
        }

        let mut right = vw;
        let mut bottom = vh.max(pt + flow.cursor + pb);
        for unit in layout.units.iter().filter(|u| u.container == container) {
            right = right.max(unit.rect.right() + pr);
            bottom = bottom.max(unit.rect.bottom() + pb);
        }
        for (space, rects) in layout.frags.values() {
            if *space == Space::Scrolled(container) {
                for r in rects {
                    right = right.max(r.right() + pr);
                    bottom = bottom.max(r.bottom() + pb);
                }
            }
        }
        layout.extents.insert(container, (right, bottom));
    }

    fn layout_node(&self, node: NodeId, flow: &mut Flow, depth: u32, layout: &mut Layout) {
        match self.node_kind(node) {
            NodeKind::Text => self.layout_text(node, flow, layout),
            NodeKind::Other => {}
            NodeKind::Element => self.layout_element(node, flow, depth, layout),
        }
    }

    fn layout_text(&self, node: NodeId, flow: &mut Flow, layout: &mut Layout) {
        let space = Space::Scrolled(flow.container);
        let Some(text) = self.get(node).map(|n| n.text.as_str()) else {
            return;
        };
        if text.trim().is_empty() {
            layout.set(node, space, SmallVec::new());
            return;
        }
        let line_height = self.metrics.line_height;
        let mut frags = SmallVec::new();
        for span in wrap_text(text, flow.width, &self.metrics) {
            let (x, y) = flow.place(line_height);
            let rect = Rect::new(x, y, flow.width, line_height);
            layout.units.push(Unit {
                kind: UnitKind::Line {
                    node,
                    start: span.start,
                    end: span.end,
                },
                container: flow.container,
                rect,
                column_x: flow.column_x(x),
            });
            layout.leaves.push(rect);
            frags.push(Rect::new(x, y, span.width, line_height));
        }
        layout.set(node, space, frags);
    }

    fn layout_element(&self, node: NodeId, flow: &mut Flow, depth: u32, layout: &mut Layout) {
        if !self.is_displayed(node) {
            return;
        }
        let space = Space::Scrolled(flow.container);
        let position = self.position(node);
        if position.is_out_of_flow() {
            let space = if position == Position::Fixed {
                Space::Client
            } else {
                space
            };
            self.layout_positioned(node, space, layout);
            return;
        }

        flow.cursor += self.style_px(node, "margin-top").unwrap_or(0.0);

        let tag = self.tag_name(node);
        let children = self.children(node);
        let explicit_height = self.style_px(node, "height");
        let intrinsic = self.get(node).and_then(|n| n.intrinsic);

        if is_replaced_tag(&tag) || (children.is_empty() && explicit_height.is_some()) {
            let height = explicit_height
                .or(intrinsic.map(|(_, h)| h))
                .unwrap_or(0.0)
                .max(0.0);
            let width = self
                .style_px(node, "width")
                .or(intrinsic.map(|(w, _)| w))
                .unwrap_or(flow.width)
                .min(flow.width);
            let (x, y) = flow.place(height);
            let rect = Rect::new(x, y, width, height);
            layout.set(node, space, SmallVec::from_slice(&[rect]));
            layout.client_sizes.insert(node, (width, height));
            layout.in_flow.push((node, depth));
            layout.leaves.push(rect);
            layout.units.push(Unit {
                kind: UnitKind::Atom { node },
                container: flow.container,
                rect,
                column_x: flow.column_x(x),
            });
        } else if let Some(column_width) = self.style_px(node, "column-width") {
            let gap = self.style_px(node, "column-gap").unwrap_or(0.0);
            let height = explicit_height.unwrap_or(self.viewport.1 - flow.y);
            let (x, y) = flow.place(height);
            let mut inner = Flow {
                x,
                y,
                width: column_width,
                cursor: 0.0,
                columns: Some(Columns {
                    height,
                    pitch: column_width + gap,
                }),
                container: flow.container,
            };
            for child in children {
                self.layout_node(child, &mut inner, depth + 1, layout);
            }
            let rect = Rect::new(x, y, column_width, height);
            layout.set(node, space, SmallVec::from_slice(&[rect]));
            layout.client_sizes.insert(node, (column_width, height));
            layout.in_flow.push((node, depth));
            layout.leaves.push(rect);
        } else {
            let start = flow.cursor;
            let mark = layout.leaves.len();
            for child in children {
                self.layout_node(child, flow, depth + 1, layout);
            }
            let mut frags: SmallVec<[Rect; 2]> = SmallVec::new();
            if let Some(h) = explicit_height {
                if flow.cursor < start + h {
                    flow.cursor = start + h;
                }
                let (x, y) = flow.point_at(start);
                frags.push(Rect::new(x, y, flow.width, h));
            } else {
                for leaf in &layout.leaves[mark..] {
                    match frags.last_mut() {
                        Some(last) if same_column(last.x, leaf.x) => {
                            let top = last.y.min(leaf.y);
                            let bottom = last.bottom().max(leaf.bottom());
                            last.y = top;
                            last.height = bottom - top;
                        }
                        _ => frags.push(Rect::new(leaf.x, leaf.y, flow.width, leaf.height)),
                    }
                }
            }
            let (x, y) = flow.point_at(start);
            match frags.first_mut() {
                None => frags.push(Rect::new(x, y, flow.width, 0.0)),
                // Child margins sit inside the box
                Some(first) if same_column(first.x, x) && y < first.y => {
                    first.height += first.y - y;
                    first.y = y;
                }
                Some(_) => {}
            }
            let height = frags.iter().map(|r| r.height).sum();
            layout.client_sizes.insert(node, (flow.width, height));
            layout.set(node, space, frags);
            layout.in_flow.push((node, depth));
        }

        flow.cursor += self.style_px(node, "margin-bottom").unwrap_or(0.0);
    }

    fn caret_for(&self, unit: &Unit, side: CaretSide) -> Option<(NodeId, usize)> {
        match unit.kind {
            UnitKind::Line { node, start, end } => match side {
                CaretSide::Start => Some((node, start)),
                CaretSide::End => Some((node, end)),
                CaretSide::Inside(x) => {
                    let text = self.get(node).map(|n| n.text.as_str()).unwrap_or("");
                    let line = char_slice(text, start, end);
                    let offset = self.metrics.offset_for_x(line, x - unit.rect.x);
                    Some((node, (start + offset).min(end)))
                }
            },
            UnitKind::Atom { node } => {
                let parent = self.parent(node)?;
                let index = self.index_in_parent(node)?;
                match side {
                    CaretSide::End => Some((parent, index + 1)),
                    _ => Some((parent, index)),
                }
            }
        }
    }
}

impl LayoutHost for SimHost {
    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.get(node).map(|n| n.kind).unwrap_or(NodeKind::Other)
    }

    fn tag_name(&self, node: NodeId) -> String {
        match self.get(node) {
            Some(n) if n.kind == NodeKind::Element => n.tag.clone(),
            _ => String::new(),
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get(node)
            .map(|n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        if let Some(n) = self.get_mut(node) {
            n.classes.push(class.to_string());
        }
        self.record(MutationRecord::attribute(node, "class"));
        self.invalidate();
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        if let Some(n) = self.get_mut(node) {
            n.classes.retain(|c| c != class);
        }
        self.record(MutationRecord::attribute(node, "class"));
        self.invalidate();
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.get(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        if let Some(n) = self.get_mut(node) {
            n.attributes.retain(|(k, _)| k != name);
            if let Some(v) = value {
                n.attributes.push((name.to_string(), v.to_string()));
            }
        }
        self.record(MutationRecord::attribute(node, name));
        self.invalidate();
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        (0..self.nodes.len() as u32).map(NodeId).find(|&node| {
            self.attribute(node, "id").as_deref() == Some(id) && self.contains(self.document, node)
        })
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let Some(data) = self.get(n) else {
                continue;
            };
            if data.kind == NodeKind::Text {
                out.push_str(&data.text);
            }
            stack.extend(data.children.iter().rev());
        }
        out
    }

    fn node_length(&self, node: NodeId) -> usize {
        match self.get(node) {
            Some(n) if n.kind == NodeKind::Text => n.text.chars().count(),
            Some(n) => n.children.len(),
            None => 0,
        }
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        let Some(n) = self.get(node) else {
            return String::new();
        };
        if n.kind != NodeKind::Element {
            return match property {
                "display" => "inline".to_string(),
                _ => self
                    .parent(node)
                    .map(|p| self.computed_style(p, property))
                    .unwrap_or_default(),
            };
        }
        if let Some(v) = n.style(property) {
            return v.to_string();
        }
        match property {
            "font-size" => self
                .parent(node)
                .map(|p| self.computed_style(p, property))
                .unwrap_or_else(|| "16px".to_string()),
            "display" => "block".to_string(),
            "position" => "static".to_string(),
            "visibility" => "visible".to_string(),
            "pointer-events" => "auto".to_string(),
            p if p.starts_with("margin") || p.starts_with("padding") => "0px".to_string(),
            "left" | "top" | "width" | "height" => "auto".to_string(),
            _ => String::new(),
        }
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.get(node)?.style(property).map(str::to_string)
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: Option<&str>) {
        if let Some(n) = self.get_mut(node) {
            match value {
                Some(v) => match n.style.iter_mut().find(|(k, _)| k == property) {
                    Some(entry) => entry.1 = v.to_string(),
                    None => n.style.push((property.to_string(), v.to_string())),
                },
                None => n.style.retain(|(k, _)| k != property),
            }
        }
        self.record(MutationRecord::attribute(node, "style"));
        self.invalidate();
    }

    fn client_rects(&self, node: NodeId) -> Vec<Rect> {
        if !self.contains(self.document, node) {
            return Vec::new();
        }
        let placed = self.with_layout(|l| l.frags.get(&node).cloned());
        match placed {
            Some((space, rects)) => rects.iter().map(|r| self.to_client(space, *r)).collect(),
            None => Vec::new(),
        }
    }

    fn range_rect(&self, node: NodeId, start: usize, end: usize) -> Option<Rect> {
        if !self.is_text(node) || !self.contains(self.document, node) {
            return None;
        }
        let lines: Vec<Unit> = self.with_layout(|l| {
            l.units
                .iter()
                .filter(|u| matches!(u.kind, UnitKind::Line { node: n, .. } if n == node))
                .copied()
                .collect()
        });
        let text = self.get(node).map(|n| n.text.as_str()).unwrap_or("");
        let x_at = |unit: &Unit, line_start: usize, offset: usize| {
            unit.rect.x + self.metrics.text_width(char_slice(text, line_start, offset))
        };

        let mut covered: Option<Rect> = None;
        for unit in &lines {
            let UnitKind::Line { start: s, end: e, .. } = unit.kind else {
                continue;
            };
            if e > start && s < end {
                let left = x_at(unit, s, start.max(s));
                let right = x_at(unit, s, end.min(e));
                let rect = Rect::new(left, unit.rect.y, right - left, unit.rect.height);
                covered = Some(covered.map_or(rect, |c| c.union(&rect)));
            }
        }
        let rect = match covered {
            Some(rect) => rect,
            None => {
                let unit = lines.iter().find(|u| {
                    matches!(u.kind, UnitKind::Line { start: s, end: e, .. } if s <= start && start <= e)
                })?;
                let UnitKind::Line { start: s, .. } = unit.kind else {
                    return None;
                };
                Rect::new(x_at(unit, s, start), unit.rect.y, 0.0, unit.rect.height)
            }
        };
        let container = lines.first()?.container;
        Some(self.to_client(Space::Scrolled(container), rect))
    }

    fn client_width(&self, node: NodeId) -> f32 {
        self.with_layout(|l| l.client_sizes.get(&node).map(|s| s.0))
            .unwrap_or(0.0)
    }

    fn client_height(&self, node: NodeId) -> f32 {
        self.with_layout(|l| l.client_sizes.get(&node).map(|s| s.1))
            .unwrap_or(0.0)
    }

    fn scroll_width(&self, node: NodeId) -> f32 {
        self.with_layout(|l| {
            l.extents
                .get(&node)
                .or_else(|| l.client_sizes.get(&node))
                .map(|s| s.0)
        })
        .unwrap_or(0.0)
    }

    fn scroll_height(&self, node: NodeId) -> f32 {
        self.with_layout(|l| {
            l.extents
                .get(&node)
                .or_else(|| l.client_sizes.get(&node))
                .map(|s| s.1)
        })
        .unwrap_or(0.0)
    }

    fn scroll_left(&self, node: NodeId) -> f32 {
        self.get(node).map(|n| n.scroll.0).unwrap_or(0.0)
    }

    fn scroll_top(&self, node: NodeId) -> f32 {
        self.get(node).map(|n| n.scroll.1).unwrap_or(0.0)
    }

    fn set_scroll_left(&mut self, node: NodeId, value: f32) {
        let max = (self.scroll_width(node) - self.client_width(node)).max(0.0);
        if let Some(n) = self.get_mut(node) {
            n.scroll.0 = value.clamp(0.0, max);
        }
    }

    fn set_scroll_top(&mut self, node: NodeId, value: f32) {
        let max = (self.scroll_height(node) - self.client_height(node)).max(0.0);
        if let Some(n) = self.get_mut(node) {
            n.scroll.1 = value.clamp(0.0, max);
        }
    }

    fn viewport_size(&self) -> (f32, f32) {
        self.viewport
    }

    fn is_visible(&self, node: NodeId) -> bool {
        if !self.contains(self.document, node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_element(n)
                && (!self.is_displayed(n) || self.computed_style(n, "visibility") == "hidden")
            {
                return false;
            }
            current = self.parent(n);
        }
        let rect = self.bounding_rect(node);
        rect.width > 0.0 || rect.height > 0.0
    }

    fn element_from_point(&self, point: Point) -> Option<NodeId> {
        let (positioned, container) =
            self.with_layout(|l| (l.positioned.clone(), l.containers.last().copied()));
        for &node in positioned.iter().rev() {
            let hit = self.client_rects(node).iter().any(|r| r.contains_point(point));
            if hit && self.pointer_events_enabled(node) {
                return Some(node);
            }
        }

        let container = container?;
        let (vw, vh) = self.viewport;
        if !Rect::new(0.0, 0.0, vw, vh).contains_point(point) {
            return None;
        }
        let (left, top) = self.get(container)?.scroll;
        let scrolled = point.offset(left, top);
        let best = self.with_layout(|l| {
            l.in_flow
                .iter()
                .filter(|(node, _)| {
                    l.frags.get(node).is_some_and(|(space, rects)| {
                        *space == Space::Scrolled(container)
                            && rects.iter().any(|r| r.contains_point(scrolled))
                    })
                })
                .max_by_key(|(_, depth)| *depth)
                .map(|(node, _)| *node)
        });
        Some(best.unwrap_or(container))
    }

    fn caret_from_point(&self, point: Point) -> Option<(NodeId, usize)> {
        if let Some(hit) = self.element_from_point(point) {
            let is_overlay = self.with_layout(|l| l.positioned.contains(&hit));
            if is_overlay {
                return Some((hit, 0));
            }
        }

        let (container, units) = self.with_layout(|l| {
            let container = l.containers.last().copied();
            let units: Vec<Unit> = l
                .units
                .iter()
                .filter(|u| Some(u.container) == container)
                .copied()
                .collect();
            (container, units)
        });
        let container = container?;
        let (vw, vh) = self.viewport;
        if !Rect::new(0.0, 0.0, vw, vh).contains_point(point) || units.is_empty() {
            return None;
        }
        let (left, top) = self.get(container)?.scroll;
        let p = point.offset(left, top);

        let last_column = units
            .iter()
            .map(|u| u.column_x)
            .fold(f32::NEG_INFINITY, f32::max);
        let column = units
            .iter()
            .map(|u| u.column_x)
            .filter(|&x| x <= p.x + EPSILON)
            .fold(None, |acc: Option<f32>, x| Some(acc.map_or(x, |a| a.max(x))))
            .unwrap_or_else(|| units.iter().map(|u| u.column_x).fold(f32::INFINITY, f32::min));
        let in_column: Vec<&Unit> = units
            .iter()
            .filter(|u| same_column(u.column_x, column))
            .collect();

        if let Some(unit) = in_column
            .iter()
            .find(|u| u.rect.y <= p.y && p.y < u.rect.bottom())
        {
            return self.caret_for(unit, CaretSide::Inside(p.x));
        }
        let below = in_column
            .iter()
            .filter(|u| u.rect.y > p.y)
            .min_by(|a, b| a.rect.y.total_cmp(&b.rect.y));
        if let Some(unit) = below {
            return self.caret_for(unit, CaretSide::Start);
        }
        if same_column(column, last_column) {
            return None;
        }
        let above = in_column
            .iter()
            .max_by(|a, b| a.rect.bottom().total_cmp(&b.rect.bottom()))?;
        self.caret_for(above, CaretSide::End)
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(SimNode::new(NodeKind::Element, tag))
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if self.get(parent).is_none() || self.get(node).is_none() || self.contains(node, parent) {
            return;
        }
        self.detach(node);
        let index = {
            let Some(p) = self.get(parent) else {
                return;
            };
            reference
                .and_then(|r| p.children.iter().position(|&c| c == r))
                .unwrap_or(p.children.len())
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.insert(index, node);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = Some(parent);
        }
        self.record(MutationRecord::child_list(parent, &[node], &[]));
        self.invalidate();
    }

    fn remove(&mut self, node: NodeId) {
        if self.detach(node).is_some() {
            self.invalidate();
        }
    }

    fn split_text(&mut self, node: NodeId, offset: usize) -> NodeId {
        let (head, tail) = match self.get(node) {
            Some(n) if n.kind == NodeKind::Text => {
                let split = n
                    .text
                    .char_indices()
                    .nth(offset)
                    .map(|(i, _)| i)
                    .unwrap_or(n.text.len());
                (n.text[..split].to_string(), n.text[split..].to_string())
            }
            _ => return node,
        };
        if let Some(n) = self.get_mut(node) {
            n.text = head;
        }
        let mut second = SimNode::new(NodeKind::Text, "");
        second.text = tail;
        let second = self.push(second);
        self.record(MutationRecord::character_data(node));
        if let Some(parent) = self.parent(node) {
            let next = self.next_sibling(node);
            self.insert_before(parent, second, next);
        }
        self.invalidate();
        second
    }

    fn normalize(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(element) = stack.pop() {
            let children = self.children(element);
            let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
            let mut dropped: Vec<NodeId> = Vec::new();
            for child in children {
                if self.is_text(child) {
                    let text = self.get(child).map(|n| n.text.clone()).unwrap_or_default();
                    if text.is_empty() {
                        dropped.push(child);
                        continue;
                    }
                    if let Some(&last) = kept.last() {
                        if self.is_text(last) {
                            if let Some(n) = self.get_mut(last) {
                                n.text.push_str(&text);
                            }
                            self.record(MutationRecord::character_data(last));
                            dropped.push(child);
                            continue;
                        }
                    }
                } else if self.is_element(child) {
                    stack.push(child);
                }
                kept.push(child);
            }
            if !dropped.is_empty() {
                if let Some(e) = self.get_mut(element) {
                    e.children = kept;
                }
                for &d in &dropped {
                    if let Some(n) = self.get_mut(d) {
                        n.parent = None;
                    }
                }
                self.record(MutationRecord::child_list(element, &[], &dropped));
                self.invalidate();
            }
        }
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        let Some(copy) = self.get(node).map(SimNode::detached_copy) else {
            return node;
        };
        let root = self.push(copy);
        if deep {
            let mut stack = vec![(node, root)];
            while let Some((source, target)) = stack.pop() {
                for child in self.children(source) {
                    let Some(copy) = self.get(child).map(SimNode::detached_copy) else {
                        continue;
                    };
                    let id = self.push(copy);
                    if let Some(n) = self.get_mut(id) {
                        n.parent = Some(target);
                    }
                    if let Some(t) = self.get_mut(target) {
                        t.children.push(id);
                    }
                    stack.push((child, id));
                }
            }
        }
        root
    }

    fn replace_with(&mut self, node: NodeId, replacement: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if node == replacement {
            return;
        }
        self.detach(replacement);
        let Some(index) = self.index_in_parent(node) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children[index] = replacement;
        }
        if let Some(r) = self.get_mut(replacement) {
            r.parent = Some(parent);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
        }
        self.record(MutationRecord::child_list(parent, &[replacement], &[node]));
        self.invalidate();
    }

    fn set_observing(&mut self, root: NodeId, observing: bool) {
        if observing {
            self.observed.insert(root);
        } else {
            self.observed.remove(&root);
        }
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    fn requeue_mutations(&mut self, mut records: Vec<MutationRecord>) {
        records.append(&mut self.records);
        self.records = records;
    }

    fn now_ms(&self) -> f64 {
        self.clock_ms
    }

    fn session_get(&self, key: &str) -> Option<String> {
        self.session.get(key).cloned()
    }

    fn session_set(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.session.insert(key.to_string(), v.to_string());
            }
            None => {
                self.session.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Viewport 660x800 with one padded container holding `paragraphs` of 20 lines each
    fn column_fixture(paragraphs: usize) -> (SimHost, NodeId, NodeId) {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        host.set_style(container, "padding-top", "20px");
        host.set_style(container, "padding-bottom", "20px");
        host.set_style(container, "padding-left", "30px");
        host.set_style(container, "padding-right", "30px");
        let content = host.append_element(container, "article");
        for _ in 0..paragraphs {
            let p = host.append_element(content, "p");
            host.append_text(p, &"abcd ".repeat(240));
        }
        (host, container, content)
    }

    #[test]
    fn test_vertical_flow_geometry() {
        let (host, container, content) = column_fixture(2);
        assert_eq!(host.client_height(content), 800.0);
        assert_eq!(host.scroll_height(container), 840.0);
        let p = host.children(content)[1];
        assert_eq!(host.bounding_rect(p).y, 420.0);
        assert_eq!(host.client_rects(p).len(), 1);
    }

    #[test]
    fn test_columns_fragment_and_extend_scroll_width() {
        let (mut host, container, content) = column_fixture(5);
        host.set_style(content, "column-width", "600px");
        host.set_style(content, "column-gap", "60px");
        host.set_style(content, "height", "760px");
        assert_eq!(host.scroll_width(container), 1980.0);
        // Paragraph 2 starts at line 20 and is cut after line 38
        let p = host.children(content)[1];
        let rects = host.client_rects(p);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].height, 360.0);
        assert_eq!(rects[1].x, 690.0);
        assert_eq!(rects[1].y, 20.0);

        host.set_scroll_left(container, 660.0);
        assert_eq!(host.client_rects(p)[1].x, 30.0);
        host.set_scroll_left(container, 5000.0);
        assert_eq!(host.scroll_left(container), 1320.0);
    }

    #[test]
    fn test_caret_from_point() {
        let (mut host, container, content) = column_fixture(5);
        host.set_style(content, "column-width", "600px");
        host.set_style(content, "column-gap", "60px");
        host.set_style(content, "height", "760px");
        let first = host.children(host.children(content)[0])[0];
        assert_eq!(
            host.caret_from_point(Point::new(30.0, 25.0)),
            Some((first, 0))
        );
        assert_eq!(
            host.caret_from_point(Point::new(72.0, 45.0)),
            Some((first, 64))
        );

        host.set_scroll_left(container, 1320.0);
        // Column three holds 24 lines; below them is past the end
        assert!(host.caret_from_point(Point::new(330.0, 700.0)).is_none());
    }

    #[test]
    fn test_overlay_and_pointer_events() {
        let (mut host, _container, content) = column_fixture(1);
        let doc = host.document();
        let toolbar = host.append_element(doc, "nav");
        host.set_style(toolbar, "position", "fixed");
        host.set_style(toolbar, "width", "660px");
        host.set_style(toolbar, "height", "50px");
        assert_eq!(host.element_from_point(Point::new(100.0, 30.0)), Some(toolbar));
        assert_eq!(
            host.caret_from_point(Point::new(100.0, 30.0)),
            Some((toolbar, 0))
        );

        host.set_style(toolbar, "pointer-events", "none");
        let p = host.children(content)[0];
        assert_eq!(host.element_from_point(Point::new(100.0, 30.0)), Some(p));
    }

    #[test]
    fn test_split_normalize_and_records() {
        let (mut host, _container, content) = column_fixture(1);
        let p = host.children(content)[0];
        let text = host.children(p)[0];
        host.set_observing(content, true);
        let tail = host.split_text(text, 10);
        assert_eq!(host.node_length(text), 10);
        assert_eq!(host.next_sibling(text), Some(tail));
        host.normalize(content);
        assert_eq!(host.children(p), vec![text]);
        assert_eq!(host.node_length(text), 1200);
        let records = host.take_mutations();
        assert!(records.iter().any(|r| r.changes_tree()));
        host.set_observing(content, false);
        host.set_style(p, "color", "red");
        assert!(host.take_mutations().is_empty());
    }

    #[test]
    fn test_clone_and_replace() {
        let (mut host, container, content) = column_fixture(2);
        let before = host.serialize(content);
        let copy = host.clone_node(content, true);
        assert_eq!(host.serialize(copy), before);
        host.replace_with(content, copy);
        assert_eq!(host.parent(content), None);
        assert_eq!(host.children(container), vec![copy]);
        host.replace_with(copy, content);
        assert_eq!(host.children(container), vec![content]);
        assert_eq!(host.serialize(content), before);
    }

    #[test]
    fn test_range_rect_and_visibility() {
        let (mut host, container, content) = column_fixture(1);
        let text = host.children(host.children(content)[0])[0];
        let rect = host.range_rect(text, 65, 1200).unwrap();
        assert_eq!(rect.y, 40.0);
        assert_eq!(rect.x, 30.0);
        assert_eq!(rect.bottom(), 420.0);
        let rect = host.range_rect(text, 65, 70).unwrap();
        assert_eq!((rect.x, rect.width), (80.0, 50.0));
        assert!(host.is_visible(container));
        host.set_style(container, "display", "none");
        assert!(!host.is_visible(container));
        assert!(!host.is_visible(text));
    }
}
