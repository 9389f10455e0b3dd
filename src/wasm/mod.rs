//! WASM bindings for the pager
//!
//! The browser side implements [`JsHost`]: a plain JS object whose methods
//! answer the [`LayoutHost`] queries against the real DOM, with nodes passed
//! as numeric handles.

use crate::host::{LayoutHost, MutationKind, MutationRecord, NodeId, NodeKind};
use crate::reflow::Suppression;
use crate::registry::{BookId, BookRegistry};
use crate::{BookConfig, PagerError, Point, Rect};
use js_sys::{Float32Array, Function, Uint32Array};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn console_log(message: &str);
    #[wasm_bindgen(js_namespace = console, js_name = warn)]
    fn console_warn(message: &str);
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(message: &str);
}

#[wasm_bindgen]
extern "C" {
    /// Layout host implemented in JavaScript
    pub type JsHost;

    #[wasm_bindgen(method, js_name = nodeKind)]
    fn js_node_kind(this: &JsHost, node: u32) -> u8;
    #[wasm_bindgen(method, js_name = tagName)]
    fn js_tag_name(this: &JsHost, node: u32) -> String;
    #[wasm_bindgen(method, js_name = parent)]
    fn js_parent(this: &JsHost, node: u32) -> Option<u32>;
    #[wasm_bindgen(method, js_name = children)]
    fn js_children(this: &JsHost, node: u32) -> Uint32Array;
    #[wasm_bindgen(method, js_name = hasClass)]
    fn js_has_class(this: &JsHost, node: u32, class: &str) -> bool;
    #[wasm_bindgen(method, js_name = addClass)]
    fn js_add_class(this: &JsHost, node: u32, class: &str);
    #[wasm_bindgen(method, js_name = removeClass)]
    fn js_remove_class(this: &JsHost, node: u32, class: &str);
    #[wasm_bindgen(method, js_name = attribute)]
    fn js_attribute(this: &JsHost, node: u32, name: &str) -> Option<String>;
    #[wasm_bindgen(method, js_name = setAttribute)]
    fn js_set_attribute(this: &JsHost, node: u32, name: &str, value: Option<String>);
    #[wasm_bindgen(method, js_name = findById)]
    fn js_find_by_id(this: &JsHost, id: &str) -> Option<u32>;
    #[wasm_bindgen(method, js_name = textContent)]
    fn js_text_content(this: &JsHost, node: u32) -> String;
    #[wasm_bindgen(method, js_name = nodeLength)]
    fn js_node_length(this: &JsHost, node: u32) -> u32;

    #[wasm_bindgen(method, js_name = computedStyle)]
    fn js_computed_style(this: &JsHost, node: u32, property: &str) -> String;
    #[wasm_bindgen(method, js_name = inlineStyle)]
    fn js_inline_style(this: &JsHost, node: u32, property: &str) -> Option<String>;
    #[wasm_bindgen(method, js_name = setInlineStyle)]
    fn js_set_inline_style(this: &JsHost, node: u32, property: &str, value: Option<String>);

    /// Client rects flattened as `[x, y, width, height, ...]`
    #[wasm_bindgen(method, js_name = clientRects)]
    fn js_client_rects(this: &JsHost, node: u32) -> Float32Array;
    #[wasm_bindgen(method, js_name = rangeRect)]
    fn js_range_rect(this: &JsHost, node: u32, start: u32, end: u32) -> Option<Float32Array>;
    #[wasm_bindgen(method, js_name = clientWidth)]
    fn js_client_width(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = clientHeight)]
    fn js_client_height(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = scrollWidth)]
    fn js_scroll_width(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = scrollHeight)]
    fn js_scroll_height(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = scrollLeft)]
    fn js_scroll_left(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = scrollTop)]
    fn js_scroll_top(this: &JsHost, node: u32) -> f32;
    #[wasm_bindgen(method, js_name = setScrollLeft)]
    fn js_set_scroll_left(this: &JsHost, node: u32, value: f32);
    #[wasm_bindgen(method, js_name = setScrollTop)]
    fn js_set_scroll_top(this: &JsHost, node: u32, value: f32);
    /// `[width, height]`
    #[wasm_bindgen(method, js_name = viewportSize)]
    fn js_viewport_size(this: &JsHost) -> Float32Array;
    #[wasm_bindgen(method, js_name = isVisible)]
    fn js_is_visible(this: &JsHost, node: u32) -> bool;
    #[wasm_bindgen(method, js_name = elementFromPoint)]
    fn js_element_from_point(this: &JsHost, x: f32, y: f32) -> Option<u32>;
    /// `[node, offset]`
    #[wasm_bindgen(method, js_name = caretFromPoint)]
    fn js_caret_from_point(this: &JsHost, x: f32, y: f32) -> Option<Uint32Array>;

    #[wasm_bindgen(method, js_name = createElement)]
    fn js_create_element(this: &JsHost, tag: &str) -> u32;
    #[wasm_bindgen(method, js_name = insertBefore)]
    fn js_insert_before(this: &JsHost, parent: u32, node: u32, reference: Option<u32>);
    #[wasm_bindgen(method, js_name = remove)]
    fn js_remove(this: &JsHost, node: u32);
    #[wasm_bindgen(method, js_name = splitText)]
    fn js_split_text(this: &JsHost, node: u32, offset: u32) -> u32;
    #[wasm_bindgen(method, js_name = normalize)]
    fn js_normalize(this: &JsHost, node: u32);
    #[wasm_bindgen(method, js_name = cloneNode)]
    fn js_clone_node(this: &JsHost, node: u32, deep: bool) -> u32;
    #[wasm_bindgen(method, js_name = replaceWith)]
    fn js_replace_with(this: &JsHost, node: u32, replacement: u32);

    #[wasm_bindgen(method, js_name = setObserving)]
    fn js_set_observing(this: &JsHost, root: u32, observing: bool);
    /// JSON array of [`RawMutation`]
    #[wasm_bindgen(method, js_name = takeMutations)]
    fn js_take_mutations(this: &JsHost) -> String;
    #[wasm_bindgen(method, js_name = requeueMutations)]
    fn js_requeue_mutations(this: &JsHost, records: &str);
    #[wasm_bindgen(method, js_name = now)]
    fn js_now(this: &JsHost) -> f64;
    #[wasm_bindgen(method, js_name = sessionGet)]
    fn js_session_get(this: &JsHost, key: &str) -> Option<String>;
    #[wasm_bindgen(method, js_name = sessionSet)]
    fn js_session_set(this: &JsHost, key: &str, value: Option<String>);
}

/// A mutation record as the JS observer reports it
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMutation {
    #[serde(rename = "type")]
    kind: String,
    target: u32,
    #[serde(default)]
    attribute_name: Option<String>,
    #[serde(default)]
    added: Vec<u32>,
    #[serde(default)]
    removed: Vec<u32>,
}

impl RawMutation {
    fn from_record(record: &MutationRecord) -> Self {
        let (kind, attribute_name) = match &record.kind {
            MutationKind::ChildList => ("childList", None),
            MutationKind::Attributes { name } => ("attributes", Some(name.clone())),
            MutationKind::CharacterData => ("characterData", None),
        };
        Self {
            kind: kind.to_string(),
            target: record.target.0,
            attribute_name,
            added: record.added.iter().map(|n| n.0).collect(),
            removed: record.removed.iter().map(|n| n.0).collect(),
        }
    }

    fn into_record(self) -> Option<MutationRecord> {
        let kind = match self.kind.as_str() {
            "childList" => MutationKind::ChildList,
            "attributes" => MutationKind::Attributes {
                name: self.attribute_name.unwrap_or_default(),
            },
            "characterData" => MutationKind::CharacterData,
            _ => return None,
        };
        Some(MutationRecord {
            kind,
            target: NodeId(self.target),
            added: self.added.into_iter().map(NodeId).collect(),
            removed: self.removed.into_iter().map(NodeId).collect(),
        })
    }
}

fn rects_from(values: &[f32]) -> Vec<Rect> {
    values
        .chunks_exact(4)
        .map(|c| Rect::new(c[0], c[1], c[2], c[3]))
        .collect()
}

impl LayoutHost for JsHost {
    fn node_kind(&self, node: NodeId) -> NodeKind {
        match self.js_node_kind(node.0) {
            1 => NodeKind::Element,
            3 => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn tag_name(&self, node: NodeId) -> String {
        self.js_tag_name(node.0).to_lowercase()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.js_parent(node.0).map(NodeId)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.js_children(node.0).to_vec().into_iter().map(NodeId).collect()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.js_has_class(node.0, class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        self.js_add_class(node.0, class);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        self.js_remove_class(node.0, class);
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.js_attribute(node.0, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        self.js_set_attribute(node.0, name, value.map(str::to_string));
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.js_find_by_id(id).map(NodeId)
    }

    fn text_content(&self, node: NodeId) -> String {
        self.js_text_content(node.0)
    }

    fn node_length(&self, node: NodeId) -> usize {
        self.js_node_length(node.0) as usize
    }

    fn computed_style(&self, node: NodeId, property: &str) -> String {
        self.js_computed_style(node.0, property)
    }

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        self.js_inline_style(node.0, property)
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: Option<&str>) {
        self.js_set_inline_style(node.0, property, value.map(str::to_string));
    }

    fn client_rects(&self, node: NodeId) -> Vec<Rect> {
        rects_from(&self.js_client_rects(node.0).to_vec())
    }

    fn range_rect(&self, node: NodeId, start: usize, end: usize) -> Option<Rect> {
        let values = self.js_range_rect(node.0, start as u32, end as u32)?.to_vec();
        rects_from(&values).into_iter().next()
    }

    fn client_width(&self, node: NodeId) -> f32 {
        self.js_client_width(node.0)
    }

    fn client_height(&self, node: NodeId) -> f32 {
        self.js_client_height(node.0)
    }

    fn scroll_width(&self, node: NodeId) -> f32 {
        self.js_scroll_width(node.0)
    }

    fn scroll_height(&self, node: NodeId) -> f32 {
        self.js_scroll_height(node.0)
    }

    fn scroll_left(&self, node: NodeId) -> f32 {
        self.js_scroll_left(node.0)
    }

    fn scroll_top(&self, node: NodeId) -> f32 {
        self.js_scroll_top(node.0)
    }

    fn set_scroll_left(&mut self, node: NodeId, value: f32) {
        self.js_set_scroll_left(node.0, value);
    }

    fn set_scroll_top(&mut self, node: NodeId, value: f32) {
        self.js_set_scroll_top(node.0, value);
    }

    fn viewport_size(&self) -> (f32, f32) {
        match self.js_viewport_size().to_vec().as_slice() {
            [width, height, ..] => (*width, *height),
            _ => (0.0, 0.0),
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.js_is_visible(node.0)
    }

    fn element_from_point(&self, point: Point) -> Option<NodeId> {
        self.js_element_from_point(point.x, point.y).map(NodeId)
    }

    fn caret_from_point(&self, point: Point) -> Option<(NodeId, usize)> {
        let caret = self.js_caret_from_point(point.x, point.y)?.to_vec();
        match caret.as_slice() {
            [node, offset, ..] => Some((NodeId(*node), *offset as usize)),
            _ => None,
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        NodeId(self.js_create_element(tag))
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.js_insert_before(parent.0, node.0, reference.map(|r| r.0));
    }

    fn remove(&mut self, node: NodeId) {
        self.js_remove(node.0);
    }

    fn split_text(&mut self, node: NodeId, offset: usize) -> NodeId {
        NodeId(self.js_split_text(node.0, offset as u32))
    }

    fn normalize(&mut self, node: NodeId) {
        self.js_normalize(node.0);
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> NodeId {
        NodeId(self.js_clone_node(node.0, deep))
    }

    fn replace_with(&mut self, node: NodeId, replacement: NodeId) {
        self.js_replace_with(node.0, replacement.0);
    }

    fn set_observing(&mut self, root: NodeId, observing: bool) {
        self.js_set_observing(root.0, observing);
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord> {
        let json = self.js_take_mutations();
        match serde_json::from_str::<Vec<RawMutation>>(&json) {
            Ok(raw) => raw.into_iter().filter_map(RawMutation::into_record).collect(),
            Err(e) => {
                log::warn!("unreadable mutation batch: {e}");
                Vec::new()
            }
        }
    }

    fn requeue_mutations(&mut self, records: Vec<MutationRecord>) {
        let raw: Vec<RawMutation> = records.iter().map(RawMutation::from_record).collect();
        match serde_json::to_string(&raw) {
            Ok(json) => self.js_requeue_mutations(&json),
            Err(e) => log::warn!("could not requeue mutations: {e}"),
        }
    }

    fn now_ms(&self) -> f64 {
        self.js_now()
    }

    fn session_get(&self, key: &str) -> Option<String> {
        self.js_session_get(key)
    }

    fn session_set(&mut self, key: &str, value: Option<&str>) {
        self.js_session_set(key, value.map(str::to_string));
    }
}

/// Forwards `log` records to the browser console
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[pageturn] {}", record.args());
        match record.level() {
            log::Level::Error => console_error(&message),
            log::Level::Warn => console_warn(&message),
            _ => console_log(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the panic hook and the console logger
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

/// Change the console log level ("error", "warn", "info", "debug", "trace")
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Info);
    log::set_max_level(filter);
}

fn js_error(e: PagerError) -> JsError {
    JsError::new(&e.to_string())
}

/// WASM-exposed pager over every book of one page
#[wasm_bindgen]
pub struct WasmPager {
    host: JsHost,
    registry: BookRegistry,
    held: FxHashMap<BookId, Suppression>,
}

#[wasm_bindgen]
impl WasmPager {
    #[wasm_bindgen(constructor)]
    pub fn new(host: JsHost) -> Self {
        Self {
            host,
            registry: BookRegistry::new(),
            held: FxHashMap::default(),
        }
    }

    /// Register a container; `config` is a JSON object, empty for defaults
    #[wasm_bindgen(js_name = createBook)]
    pub fn create_book(&mut self, container: u32, content: u32, config: &str) -> Result<u32, JsError> {
        let config = if config.trim().is_empty() {
            BookConfig::default()
        } else {
            BookConfig::from_json(config).map_err(|e| js_error(e.into()))?
        };
        let id = self
            .registry
            .create(&mut self.host, NodeId(container), NodeId(content), config)
            .map_err(js_error)?;
        Ok(id.0)
    }

    #[wasm_bindgen(js_name = removeBook)]
    pub fn remove_book(&mut self, book: u32) -> Result<(), JsError> {
        self.held.remove(&BookId(book));
        self.registry
            .remove(&mut self.host, BookId(book))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = enterPaginatedMode)]
    pub fn enter_paginated_mode(&mut self, book: u32) -> Result<(), JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.enter_paginated(&mut self.host).map_err(js_error)
    }

    #[wasm_bindgen(js_name = enterScrollMode)]
    pub fn enter_scroll_mode(&mut self, book: u32) -> Result<(), JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.enter_scroll(&mut self.host).map_err(js_error)
    }

    /// Returns the number of print sections
    #[wasm_bindgen(js_name = enterPrintMode)]
    pub fn enter_print_mode(&mut self, book: u32) -> Result<usize, JsError> {
        self.registry
            .enter_print(&mut self.host, BookId(book))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = exitPrintMode)]
    pub fn exit_print_mode(&mut self, book: u32) -> Result<(), JsError> {
        self.registry
            .exit_print(&mut self.host, BookId(book))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = resetPages)]
    pub fn reset_pages(&mut self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.reset_pages(&mut self.host).map_err(js_error)
    }

    /// Go to `page`; returns the page now shown
    #[wasm_bindgen(js_name = setCurrentPage)]
    pub fn set_current_page(&mut self, book: u32, page: usize) -> Result<usize, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.set_current_page(&mut self.host, page);
        Ok(book.current_page())
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.next_page(&mut self.host);
        Ok(book.current_page())
    }

    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&mut self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.prev_page(&mut self.host);
        Ok(book.current_page())
    }

    #[wasm_bindgen(js_name = currentPage)]
    pub fn current_page(&self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        Ok(book.current_page())
    }

    #[wasm_bindgen(js_name = totalPages)]
    pub fn total_pages(&self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        Ok(book.total_pages())
    }

    #[wasm_bindgen(js_name = isLarge)]
    pub fn is_large(&self, book: u32) -> Result<bool, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        Ok(book.is_large())
    }

    /// Overflow anchors the last recompute could not resolve
    #[wasm_bindgen(js_name = failureCount)]
    pub fn failure_count(&self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        Ok(book.overflow().failures())
    }

    #[wasm_bindgen(js_name = getPageNumberForOffset)]
    pub fn page_number_for_offset(&self, book: u32, node: u32, offset: usize) -> Result<Option<usize>, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        let offset = crate::ContentOffset::new(NodeId(node), offset);
        Ok(book.page_for_offset(&self.host, &offset))
    }

    /// `[node, offset]` of the current page start seen from a page-local point
    #[wasm_bindgen(js_name = getPageStarter)]
    pub fn page_starter(&mut self, book: u32, x: f32, y: f32) -> Result<Option<Vec<u32>>, JsError> {
        let book = self.registry.book(BookId(book)).map_err(js_error)?;
        let starter = book.page_starter_at(&mut self.host, Point::new(x, y));
        Ok(starter.map(|s| vec![s.node.0, s.offset as u32]))
    }

    #[wasm_bindgen(js_name = onScroll)]
    pub fn on_scroll(&mut self, book: u32) -> Result<usize, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.on_scroll(&mut self.host);
        Ok(book.current_page())
    }

    #[wasm_bindgen(js_name = onResize)]
    pub fn on_resize(&mut self) {
        self.registry.on_resize(&mut self.host);
    }

    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(&mut self, book: u32, visible: bool) -> Result<(), JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.on_visibility_change(&mut self.host, visible);
        Ok(())
    }

    /// Timer tick; returns the number of books that recomputed
    pub fn tick(&mut self) -> usize {
        self.registry.tick(&mut self.host)
    }

    /// Deliver pending mutation records to their books
    #[wasm_bindgen(js_name = pumpMutations)]
    pub fn pump_mutations(&mut self) -> usize {
        self.registry
            .route(&mut self.host)
            .into_iter()
            .filter(|(_, d)| *d == crate::ReflowDecision::Recompute)
            .count()
    }

    /// Ignore the next `batches` mutation notifications of a book
    #[wasm_bindgen(js_name = suppressNext)]
    pub fn suppress_next(&mut self, book: u32, batches: u32) -> Result<(), JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        book.suppress_next(batches);
        Ok(())
    }

    #[wasm_bindgen(js_name = holdMutations)]
    pub fn hold_mutations(&mut self, book: u32) -> Result<(), JsError> {
        let id = BookId(book);
        let previous = self.registry.book_mut(id).map_err(js_error)?.hold_mutations();
        self.held.entry(id).or_insert(previous);
        Ok(())
    }

    #[wasm_bindgen(js_name = releaseMutations)]
    pub fn release_mutations(&mut self, book: u32) -> Result<(), JsError> {
        let id = BookId(book);
        let previous = self.held.remove(&id).unwrap_or_default();
        self.registry
            .book_mut(id)
            .map_err(js_error)?
            .restore_mutations(previous);
        Ok(())
    }

    pub fn focus(&mut self, book: u32) -> Result<(), JsError> {
        self.registry.focus(BookId(book)).map_err(js_error)
    }

    /// Returns the newly focused book, if any
    pub fn blur(&mut self, book: u32) -> Result<Option<u32>, JsError> {
        let next = self
            .registry
            .blur(&self.host, BookId(book))
            .map_err(js_error)?;
        Ok(next.map(|id| id.0))
    }

    #[wasm_bindgen(js_name = focusedBook)]
    pub fn focused_book(&self) -> Option<u32> {
        self.registry.focused().map(|id| id.0)
    }

    /// Call `listener` with each event of a book as a JSON string
    pub fn subscribe(&mut self, book: u32, listener: Function) -> Result<u32, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        let id = book.subscribe(move |event| {
            let payload = JsValue::from_str(&event.to_json());
            if let Err(e) = listener.call1(&JsValue::NULL, &payload) {
                log::warn!("event listener failed: {e:?}");
            }
        });
        Ok(id.0)
    }

    pub fn unsubscribe(&mut self, book: u32, listener: u32) -> Result<bool, JsError> {
        let book = self.registry.book_mut(BookId(book)).map_err(js_error)?;
        Ok(book.unsubscribe(crate::ListenerId(listener)))
    }
}
