//! Overflow handling: fillers and media fitting
//!
//! In vertical mode nothing stops a line of text or an image from straddling
//! the bottom of a page. Each page is sampled on three horizontal lines (the
//! top margin, the bottom margin and the last pixel row) and whatever crosses
//! a line is either shrunk to fit or pushed below it with a filler spacer.
//!
//! Column mode only needs the media fitting part: composite page items that
//! the column layout split across two columns get their media resized.

use crate::config::{BookConfig, PagingMethod};
use crate::host::{is_media_tag, px, LayoutHost, NodeId};
use crate::layout::{ContainerGeometry, Frame};
use crate::locate::GeometricLocator;
use crate::offset::{is_valid_node, ContentOffset};
use crate::undo::StyleLog;
use crate::Point;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

/// Float rounding absorbed by every fit decision
pub const FIT_TOLERANCE_PX: f32 = 3.0;

/// Extra height given to a filler each time its anchor is reported again
const RETRY_STEP_PX: f32 = 5.0;

const MAX_PAGES: usize = 10_000;

/// Class of the spacer that makes the last vertical page reachable
pub const END_FILLER_CLASS: &str = "filler-book-end";

/// Media looked up inside a page item, in order of preference
const FIT_MEDIA: [&str; 3] = ["img", "video", "iframe"];

/// Horizontal line a page is sampled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleLine {
    TopMargin,
    BottomMargin,
    PageEnd,
}

impl SampleLine {
    pub const ALL: [SampleLine; 3] = [
        SampleLine::TopMargin,
        SampleLine::BottomMargin,
        SampleLine::PageEnd,
    ];

    /// Marker class given to fillers inserted on this line
    pub fn class_name(self) -> &'static str {
        match self {
            SampleLine::TopMargin => "filler-top",
            SampleLine::BottomMargin => "filler-bottom",
            SampleLine::PageEnd => "filler-end",
        }
    }

    /// Distance from the container top
    pub fn offset(self, geometry: &ContainerGeometry) -> f32 {
        match self {
            SampleLine::TopMargin => geometry.margins.upper,
            SampleLine::BottomMargin => geometry.page_length - geometry.margins.lower,
            SampleLine::PageEnd => geometry.page_length - 1.0,
        }
    }
}

/// Bounded retries of one filler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts: u32,
    limit: u32,
}

impl RetryBudget {
    pub fn new(limit: u32) -> Self {
        Self { attempts: 0, limit }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts > self.limit
    }

    /// Use one attempt; `false` once the limit is exceeded
    pub fn spend(&mut self) -> bool {
        self.attempts += 1;
        !self.is_exhausted()
    }
}

/// A spacer inserted into the content
#[derive(Debug, Clone, PartialEq)]
pub struct Filler {
    pub id: u32,
    pub node: NodeId,
    pub height_px: f32,
    /// Where the filler was inserted
    pub anchor: ContentOffset,
    /// The node the filler pushes down
    pub owner: NodeId,
    /// `None` for the book-end filler
    pub line: Option<SampleLine>,
    pub page: usize,
}

/// Where a new filler goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerAnchor {
    Before(NodeId),
    /// Inside a text node, splitting it when needed
    AtText { node: NodeId, offset: usize },
}

/// Result of handling one crossing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillerOutcome {
    /// Nothing crossed the line, or nothing needed to move
    Skipped,
    Inserted { id: u32, node: NodeId },
    /// An adjacent filler already existed and was grown
    Grown { id: u32, budget: RetryBudget },
    Resized { media: NodeId, height: f32 },
    /// The same line met its own filler from an earlier page
    EndOfContent,
    /// The retry budget ran out; `anchor` carries the failure class
    Failed { anchor: NodeId, budget: RetryBudget },
}

/// Decision for a page item crossing the bottom of a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossPageFit {
    Resize { media_height: f32 },
    /// Move the whole item to the next page
    Shift,
}

/// Shrink the media when what is left of the page is worth it, or when the
/// item already sits on an otherwise blank page
pub fn cross_page_fit(
    space_left: f32,
    blank_page: f32,
    item_height: f32,
    media_height: f32,
    min_media_height: f32,
) -> CrossPageFit {
    let extra = (item_height - media_height).max(0.0);
    if space_left >= min_media_height + extra
        || (space_left - blank_page).abs() <= FIT_TOLERANCE_PX
    {
        CrossPageFit::Resize {
            media_height: (space_left - extra - FIT_TOLERANCE_PX).max(0.0),
        }
    } else {
        CrossPageFit::Shift
    }
}

/// Inputs shared by one overflow pass
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub frame: Frame,
    pub geometry: ContainerGeometry,
    pub config: &'a BookConfig,
}

/// First descendant (inclusive) matching `pred`, in document order
fn find_descendant<H: LayoutHost + ?Sized>(
    host: &H,
    root: NodeId,
    pred: impl Fn(NodeId) -> bool,
) -> Option<NodeId> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pred(node) {
            return Some(node);
        }
        stack.extend(host.children(node).into_iter().rev());
    }
    None
}

fn find_media<H: LayoutHost + ?Sized>(host: &H, item: NodeId) -> Option<NodeId> {
    if is_media_tag(&host.tag_name(item)) {
        return Some(item);
    }
    FIT_MEDIA
        .iter()
        .find_map(|tag| find_descendant(host, item, |n| host.tag_name(n) == *tag))
}

fn previous_element<H: LayoutHost + ?Sized>(
    host: &H,
    parent: NodeId,
    reference: Option<NodeId>,
) -> Option<NodeId> {
    let children = host.children(parent);
    let end = match reference {
        Some(r) => children.iter().position(|&c| c == r)?,
        None => children.len(),
    };
    children[..end]
        .iter()
        .rev()
        .find(|&&c| host.is_element(c) || !host.text_content(c).trim().is_empty())
        .copied()
        .filter(|&c| host.is_element(c))
}

/// Inserts, grows and removes fillers for one book
#[derive(Debug, Default)]
pub struct OverflowHandler {
    fillers: Vec<Filler>,
    budgets: FxHashMap<NodeId, RetryBudget>,
    failures: usize,
    end_reached: bool,
    next_id: u32,
}

impl OverflowHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fillers(&self) -> &[Filler] {
        &self.fillers
    }

    /// Crossings given up on since the last reset
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    pub fn is_filler(&self, node: NodeId) -> bool {
        self.fillers.iter().any(|f| f.node == node)
    }

    /// Take every filler out of the content and forget all retry state
    pub fn remove_all<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let count = self.fillers.len();
        for filler in self.fillers.drain(..) {
            if host.parent(filler.node).is_some() {
                host.remove(filler.node);
            }
        }
        self.budgets.clear();
        self.failures = 0;
        self.end_reached = false;
        self.next_id = 0;
        count
    }

    /// Walk the vertical pages top to bottom, fixing every crossing
    ///
    /// Stops when the last page is in view, when scrolling no longer
    /// advances, or when a filler reports the end of content. Leaves the
    /// container scrolled to the top; returns the number of pages sampled.
    pub fn paginate_vertical<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
    ) -> usize {
        let container = ctx.frame.container;
        let page_length = ctx.geometry.page_length;
        self.end_reached = false;
        host.set_scroll_top(container, 0.0);

        let mut sampled = 0;
        for page in 1..=MAX_PAGES {
            let scroll = host.scroll_top(container);
            let last = host.scroll_height(container) - page_length;
            if (scroll - last).abs() <= FIT_TOLERANCE_PX {
                break;
            }
            self.process_page(host, ctx, styles, page);
            sampled += 1;
            if self.end_reached {
                debug!("end of content reached on page {page}");
                break;
            }
            host.set_scroll_top(container, page as f32 * page_length);
            if host.scroll_top(container) <= scroll + 0.5 {
                break;
            }
        }
        host.set_scroll_top(container, 0.0);
        sampled
    }

    /// Sample the three lines of the page currently in view
    pub fn process_page<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        page: usize,
    ) {
        let origin = ctx.frame.origin(host);
        let locator = GeometricLocator::new(ctx.frame);
        let x = origin.x + ctx.geometry.margins.left;
        for line in SampleLine::ALL {
            let point = Point::new(x, origin.y + line.offset(&ctx.geometry));
            let outcome = self.handle_crossing(host, ctx, styles, &locator, point, line, page);
            if outcome != FillerOutcome::Skipped {
                debug!("page {page} {line:?}: {outcome:?}");
            }
            if self.end_reached {
                break;
            }
        }
    }

    /// The content node a hit points at, unless it is synthetic
    fn target_node<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        ctx: &PassContext<'_>,
        hit: ContentOffset,
    ) -> Option<NodeId> {
        let target = if host.is_text(hit.node) {
            hit.node
        } else if host.is_element(hit.node) {
            let children = host.children(hit.node);
            children
                .get(hit.offset)
                .or_else(|| hit.offset.checked_sub(1).and_then(|i| children.get(i)))
                .copied()?
        } else {
            return None;
        };
        if host
            .closest_with_class(target, &ctx.config.filler_class)
            .is_some()
        {
            return None;
        }
        (target != ctx.frame.content && host.contains(ctx.frame.content, target)).then_some(target)
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_crossing<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        locator: &GeometricLocator,
        point: Point,
        line: SampleLine,
        page: usize,
    ) -> FillerOutcome {
        let Some(hit) = locator.locate_client(host, point) else {
            return FillerOutcome::Skipped;
        };
        let Some(target) = self.target_node(host, ctx, hit) else {
            return FillerOutcome::Skipped;
        };
        if !is_valid_node(host, ctx.frame.content, target) {
            return FillerOutcome::Skipped;
        }

        let margins = ctx.geometry.margins;
        let origin_y = ctx.frame.origin(host).y;
        let past_lower = point.y >= origin_y + ctx.geometry.page_length - margins.lower;
        let end_bonus = if line == SampleLine::PageEnd {
            margins.upper
        } else {
            0.0
        };

        let item_search = if host.is_text(target) {
            host.parent(target)
        } else {
            Some(target)
        };
        let page_item = item_search
            .and_then(|n| host.closest_with_class(n, &ctx.config.page_item_class))
            .filter(|&item| item != ctx.frame.content && host.contains(ctx.frame.content, item));

        if let Some(item) = page_item {
            if past_lower {
                return self.cross_page_item(host, ctx, styles, item, page);
            }
            let top = host.bounding_rect(item).y;
            let space_left = (point.y - top).round();
            return self.add_filler(
                host,
                ctx,
                styles,
                FillerAnchor::Before(item),
                space_left + end_bonus,
                line,
                page,
            );
        }

        if host.is_text(target) {
            let offset = if hit.node == target { hit.offset } else { 0 };
            return self.handle_text(host, ctx, styles, locator, target, offset, point, line, page);
        }

        if host.tag_name(target) == "img" && past_lower {
            return self.cross_page_item(host, ctx, styles, target, page);
        }
        let top = host.bounding_rect(target).y;
        let space_left = (point.y - top).round();
        let bonus = if past_lower {
            margins.vertical_sum()
        } else {
            end_bonus
        };
        self.add_filler(
            host,
            ctx,
            styles,
            FillerAnchor::Before(target),
            space_left + bonus,
            line,
            page,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_text<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        locator: &GeometricLocator,
        text: NodeId,
        offset: usize,
        point: Point,
        line: SampleLine,
        page: usize,
    ) -> FillerOutcome {
        let Some(parent) = host.parent(text) else {
            return FillerOutcome::Skipped;
        };
        // Fragmented text reports unreliable line boxes
        host.normalize(parent);
        let (text, offset) = if host.parent(text).is_some() {
            (text, offset)
        } else {
            match locator.locate_client(host, point) {
                Some(hit) if host.is_text(hit.node) => (hit.node, hit.offset),
                _ => return FillerOutcome::Skipped,
            }
        };

        let len = host.node_length(text);
        let Some(rect) = host.range_rect(text, offset.min(len), len) else {
            return FillerOutcome::Skipped;
        };
        let margins = ctx.geometry.margins;
        let space_left = (point.y - rect.y).round();
        let past_lower =
            point.y >= ctx.frame.origin(host).y + ctx.geometry.page_length - margins.lower;

        let outcome = if past_lower {
            self.add_filler(
                host,
                ctx,
                styles,
                FillerAnchor::AtText { node: text, offset },
                margins.vertical_sum() + space_left,
                line,
                page,
            )
        } else {
            let end_bonus = if line == SampleLine::PageEnd {
                margins.upper
            } else {
                0.0
            };
            let anchor = match host.parent(text) {
                Some(p) if p != ctx.frame.content => FillerAnchor::Before(p),
                _ => FillerAnchor::Before(text),
            };
            self.add_filler(host, ctx, styles, anchor, space_left + end_bonus, line, page)
        };
        if let FillerOutcome::Inserted { node, .. } = outcome {
            self.adjust_filler_position(host, ctx, node);
        }
        outcome
    }

    /// Hoist a filler out of wrappers that start where it starts
    ///
    /// A filler at the very start of a paragraph belongs before the
    /// paragraph, otherwise the paragraph's own box keeps straddling the line.
    fn adjust_filler_position<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        filler: NodeId,
    ) {
        let top = host.bounding_rect(filler).y;
        let mut target = filler;
        while let Some(parent) = host.parent(target) {
            if parent == ctx.frame.content || !host.contains(ctx.frame.content, parent) {
                break;
            }
            let same_top = (host.bounding_rect(parent).y - top).abs() < 0.5;
            if host.tag_name(parent) == "a" || same_top {
                target = parent;
            } else {
                break;
            }
        }
        if target == filler {
            return;
        }
        let Some(parent) = host.parent(target) else {
            return;
        };
        host.insert_before(parent, filler, Some(target));
        let index = host.index_in_parent(filler).unwrap_or(0);
        if let Some(record) = self.fillers.iter_mut().find(|f| f.node == filler) {
            record.anchor = ContentOffset::new(parent, index);
        }
    }

    /// Resize the media of an item crossing the bottom margin, or move the item
    pub fn cross_page_item<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        item: NodeId,
        page: usize,
    ) -> FillerOutcome {
        let margins = ctx.geometry.margins;
        let page_length = ctx.geometry.page_length;
        let top = host.bounding_rect(item).y - ctx.frame.origin(host).y;
        let space_left = (page_length - margins.lower - top).round();

        if let Some(media) = find_media(host, item) {
            let fit = cross_page_fit(
                space_left,
                page_length - margins.vertical_sum(),
                host.client_height(item),
                host.client_height(media),
                ctx.config.min_media_height,
            );
            if let CrossPageFit::Resize { media_height } = fit {
                let height = px(media_height);
                styles.change_style(
                    host,
                    media,
                    &[("height", height.as_str()), ("width", "auto")],
                );
                let gap = px(margins.vertical_sum());
                styles.set_style(host, item, "margin-bottom", Some(gap.as_str()));
                info!("page {page}: media {media:?} resized to {height}");
                return FillerOutcome::Resized {
                    media,
                    height: media_height,
                };
            }
        }
        self.add_filler(
            host,
            ctx,
            styles,
            FillerAnchor::Before(item),
            space_left + margins.vertical_sum(),
            SampleLine::BottomMargin,
            page,
        )
    }

    /// Insert a filler of `height` at `anchor`
    ///
    /// When a filler already sits right before the anchor it is grown
    /// instead, within the retry budget. If that filler came from the same
    /// line of an earlier page the content has stopped moving, which means
    /// the end of content.
    #[allow(clippy::too_many_arguments)]
    pub fn add_filler<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        anchor: FillerAnchor,
        height: f32,
        line: SampleLine,
        page: usize,
    ) -> FillerOutcome {
        let height = height.round();
        if height <= 0.0 {
            return FillerOutcome::Skipped;
        }

        let (parent, reference, owner) = match anchor {
            FillerAnchor::Before(node) => match host.parent(node) {
                Some(parent) if node != ctx.frame.content => (parent, Some(node), node),
                _ => return FillerOutcome::Skipped,
            },
            FillerAnchor::AtText { node, offset } => {
                let Some(parent) = host.parent(node) else {
                    return FillerOutcome::Skipped;
                };
                if offset == 0 {
                    (parent, Some(node), parent)
                } else if offset >= host.node_length(node) {
                    (parent, host.next_sibling(node), parent)
                } else {
                    let tail = host.split_text(node, offset);
                    (parent, Some(tail), parent)
                }
            }
        };

        if let Some(previous) = previous_element(host, parent, reference) {
            if let Some(index) = self.fillers.iter().position(|f| f.node == previous) {
                return self.retry(host, ctx, styles, index, owner, line, page);
            }
        }

        self.next_id += 1;
        let id = self.next_id;
        let node = host.create_element("div");
        host.add_class(node, &ctx.config.filler_class);
        host.add_class(node, line.class_name());
        host.set_attribute(node, "id", Some(&format!("filler_{id}")));
        host.set_inline_style(node, "margin-top", Some("0px"));
        host.set_inline_style(node, "margin-bottom", Some("0px"));
        host.set_inline_style(node, "height", Some(&px(height)));
        host.insert_before(parent, node, reference);

        if let FillerAnchor::Before(pushed) = anchor {
            let mut current = Some(pushed);
            while let Some(n) = current {
                if host.is_element(n) {
                    styles.set_style(host, n, "margin-top", Some("0px"));
                }
                current = host.first_element_child(n);
            }
        }

        let index = host.index_in_parent(node).unwrap_or(0);
        self.fillers.push(Filler {
            id,
            node,
            height_px: height,
            anchor: ContentOffset::new(parent, index),
            owner,
            line: Some(line),
            page,
        });
        FillerOutcome::Inserted { id, node }
    }

    #[allow(clippy::too_many_arguments)]
    fn retry<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
        index: usize,
        owner: NodeId,
        line: SampleLine,
        page: usize,
    ) -> FillerOutcome {
        let filler = &self.fillers[index];
        if filler.line == Some(line) && filler.page < page {
            debug!(
                "filler {} from page {} met again on page {page}",
                filler.id, filler.page
            );
            self.end_reached = true;
            return FillerOutcome::EndOfContent;
        }

        let node = filler.node;
        let limit = ctx.config.max_filler_retries;
        let budget = self
            .budgets
            .entry(node)
            .or_insert_with(|| RetryBudget::new(limit));
        if budget.spend() {
            let budget = *budget;
            let filler = &mut self.fillers[index];
            filler.height_px += RETRY_STEP_PX;
            host.set_inline_style(node, "height", Some(&px(filler.height_px)));
            return FillerOutcome::Grown {
                id: filler.id,
                budget,
            };
        }

        let budget = *budget;
        if budget.attempts() == budget.limit() + 1 {
            self.failures += 1;
            warn!(
                "filler {} before {owner:?} still overflowing after {} retries",
                self.fillers[index].id,
                budget.limit()
            );
        }
        styles.add_class(host, owner, &ctx.config.failure_class);
        FillerOutcome::Failed {
            anchor: owner,
            budget,
        }
    }

    /// Resize the media of column page items split over two columns
    ///
    /// Returns the number of items touched.
    pub fn fit_column_items<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
        styles: &mut StyleLog,
    ) -> usize {
        let content = ctx.frame.content;
        let class = ctx.config.page_item_class.as_str();
        let mut items = Vec::new();
        let mut stack = vec![content];
        while let Some(node) = stack.pop() {
            if node != content && host.is_element(node) && host.has_class(node, class) {
                items.push(node);
                continue;
            }
            stack.extend(host.children(node).into_iter().rev());
        }

        // Natural sizes, before any item is touched
        let measured: Vec<_> = items
            .into_iter()
            .map(|item| {
                let media = find_media(host, item).map(|m| (m, host.client_height(m)));
                (item, host.client_height(item), media)
            })
            .collect();

        let content_bottom = host
            .client_rects(content)
            .first()
            .map(|r| r.bottom())
            .unwrap_or(0.0);
        let blank_page = ctx.geometry.height;
        let mut touched = 0;
        for (item, item_height, media) in measured {
            let rects = host.client_rects(item);
            if rects.len() < 2 {
                continue;
            }
            let Some((media, media_height)) = media else {
                continue;
            };
            let space_left = (content_bottom - rects[0].y).round();
            let extra = (item_height - media_height).max(0.0);
            let height = match cross_page_fit(
                space_left,
                blank_page,
                item_height,
                media_height,
                ctx.config.min_media_height,
            ) {
                CrossPageFit::Resize { media_height } => media_height,
                CrossPageFit::Shift if item_height > blank_page => {
                    (blank_page - extra - FIT_TOLERANCE_PX).max(0.0)
                }
                CrossPageFit::Shift => media_height,
            };
            let height = px(height);
            styles.change_style(
                host,
                media,
                &[("height", height.as_str()), ("width", "auto")],
            );
            let mut parent = host.parent(media);
            while let Some(p) = parent {
                if p == item {
                    break;
                }
                styles.change_style(host, p, &[("margin-top", "0px"), ("padding-top", "0px")]);
                parent = host.parent(p);
            }
            debug!("column item {item:?}: media {media:?} set to {height}");
            touched += 1;
        }
        touched
    }

    /// Page count once overflow is settled
    ///
    /// Vertical mode pads the content with a final filler so the last page
    /// can be scrolled to exactly.
    pub fn finish_book_end<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &PassContext<'_>,
    ) -> usize {
        let page_length = ctx.geometry.page_length;
        if page_length <= 0.0 {
            return 1;
        }
        match ctx.config.paging_method {
            PagingMethod::Column => {
                let width = host.scroll_width(ctx.frame.container);
                ((width / page_length).ceil() as usize).max(1)
            }
            PagingMethod::Vertical => {
                let height = host.scroll_height(ctx.frame.container);
                let total = (((height - FIT_TOLERANCE_PX) / page_length).ceil() as usize).max(1);
                let missing = (total as f32 * page_length - height).round();
                if missing > 0.0 {
                    self.next_id += 1;
                    let id = self.next_id;
                    let node = host.create_element("div");
                    host.add_class(node, &ctx.config.filler_class);
                    host.add_class(node, END_FILLER_CLASS);
                    host.set_attribute(node, "id", Some(&format!("filler_{id}")));
                    host.set_inline_style(node, "margin-top", Some("0px"));
                    host.set_inline_style(node, "margin-bottom", Some("0px"));
                    host.set_inline_style(node, "height", Some(&px(missing)));
                    host.insert_before(ctx.frame.content, node, None);
                    let index = host.node_length(ctx.frame.content).saturating_sub(1);
                    self.fillers.push(Filler {
                        id,
                        node,
                        height_px: missing,
                        anchor: ContentOffset::new(ctx.frame.content, index),
                        owner: ctx.frame.content,
                        line: None,
                        page: total,
                    });
                    debug!("end filler of {missing}px makes {total} pages");
                }
                total
            }
        }
    }
}
