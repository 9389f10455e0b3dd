//! One paginated container
//!
//! A [`Book`] owns every piece of pagination state for a container/content
//! pair and exposes the commands and queries collaborators use. All work runs
//! synchronously against a borrowed [`LayoutHost`]; recomputation always
//! rebuilds from scratch, so running it again is always safe.

use crate::boundary::{BoundaryResolver, Edge};
use crate::config::{BookConfig, PagingMethod};
use crate::error::PagerError;
use crate::events::{BookEvent, EventBus, ListenerId, ModeKind};
use crate::host::{LayoutHost, MutationRecord, NodeId};
use crate::layout::{ContainerGeometry, Frame, LayoutDriver, Mode};
use crate::locate::GeometricLocator;
use crate::offset::{self, ContentOffset, PageRange};
use crate::overflow::{OverflowHandler, PassContext};
use crate::pages::{session_key, snap_scroll_pos, PageChange, PageEnv, PageIndex};
use crate::reflow::{ClassifiedRecord, ReflowDecision, ReflowScheduler, Suppression};
use crate::section::{PrintParams, Sectioner};
use crate::undo::StyleLog;
use crate::Point;
use log::{debug, info, warn};

/// Marker class on every registered book container
pub const BOOK_CLASS: &str = "book";

/// Pagination state of one container
pub struct Book {
    id: u32,
    frame: Frame,
    config: BookConfig,
    mode: Mode,
    /// Mode to go back to when printing ends
    before_print: Mode,
    driver: LayoutDriver,
    styles: StyleLog,
    overflow: OverflowHandler,
    pages: PageIndex,
    reflow: ReflowScheduler,
    sectioner: Sectioner,
    events: EventBus,
    visible: bool,
    reset_when_visible: bool,
    is_large: bool,
    recomputes: usize,
}

impl Book {
    pub fn new(id: u32, frame: Frame, config: BookConfig) -> Result<Self, PagerError> {
        config.validate()?;
        Ok(Self {
            id,
            frame,
            reflow: ReflowScheduler::new(&config),
            config,
            mode: Mode::Scroll,
            before_print: Mode::Scroll,
            driver: LayoutDriver::new(),
            styles: StyleLog::new(),
            overflow: OverflowHandler::new(),
            pages: PageIndex::new(),
            sectioner: Sectioner::new(),
            events: EventBus::new(),
            visible: true,
            reset_when_visible: false,
            is_large: false,
            recomputes: 0,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Geometry of the last layout; `None` until laid out or while hidden
    pub fn geometry(&self) -> Option<ContainerGeometry> {
        self.driver.geometry()
    }

    pub fn current_page(&self) -> usize {
        self.pages.current()
    }

    pub fn total_pages(&self) -> usize {
        self.pages.total()
    }

    pub fn starters(&self) -> &[ContentOffset] {
        self.pages.starters()
    }

    pub fn overflow(&self) -> &OverflowHandler {
        &self.overflow
    }

    pub fn sectioner(&self) -> &Sectioner {
        &self.sectioner
    }

    pub fn reflow(&self) -> &ReflowScheduler {
        &self.reflow
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The last recompute took longer than the large-book threshold
    pub fn is_large(&self) -> bool {
        self.is_large
    }

    /// Number of completed recomputes
    pub fn recompute_count(&self) -> usize {
        self.recomputes
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&BookEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// `node` lives inside this book's container
    pub fn owns<H: LayoutHost + ?Sized>(&self, host: &H, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.frame.container {
                return true;
            }
            // A nested book's container
            if host.is_element(n) && host.has_class(n, BOOK_CLASS) {
                return false;
            }
            current = host.parent(n);
        }
        false
    }

    // Modes

    /// Lay the content out as pages and resume the last known position
    ///
    /// The page stored in session storage wins; otherwise the content at the
    /// top of the scroll-mode viewport decides.
    pub fn enter_paginated<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<(), PagerError> {
        match self.mode {
            Mode::Print => return Err(PagerError::AlreadyInPrintMode),
            mode if mode.is_paginated() => return Ok(()),
            _ => {}
        }
        self.reflow.cancel_pending();
        let (width, height) = host.viewport_size();
        self.reflow.set_viewport(width, height);

        let stored = host
            .session_get(&session_key(self.id))
            .and_then(|s| s.parse::<usize>().ok());
        let anchor = match stored {
            Some(_) => None,
            None => GeometricLocator::new(self.frame).locate(host, Point::new(0.0, 10.0)),
        };

        self.mode = Mode::paginated(self.config.paging_method);
        self.recompute(host)?;
        let page = stored
            .or_else(|| anchor.map(|a| self.pages.page_of(host, &a)))
            .unwrap_or(1);
        self.set_current_page(host, page);
        info!("book {} paginated: {} pages", self.id, self.pages.total());
        self.events.emit(BookEvent::EnteredMode {
            mode: ModeKind::Paginated,
        });
        Ok(())
    }

    /// Undo everything pagination did to the host
    pub fn enter_scroll<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<(), PagerError> {
        if self.mode == Mode::Print {
            self.exit_print(host)?;
        }
        if self.mode == Mode::Scroll {
            return Ok(());
        }
        self.reflow.cancel_pending();
        host.set_observing(self.frame.content, false);
        self.teardown(host);
        self.driver.forget();
        self.mode = Mode::Scroll;
        host.set_scroll_left(self.frame.container, 0.0);
        host.set_scroll_top(self.frame.container, 0.0);
        info!("book {} back in scroll mode", self.id);
        self.events.emit(BookEvent::EnteredMode {
            mode: ModeKind::Scroll,
        });
        Ok(())
    }

    fn teardown<H: LayoutHost + ?Sized>(&mut self, host: &mut H) {
        self.pages.restore_siblings(host);
        self.overflow.remove_all(host);
        self.styles.recover_all(host);
        host.normalize(self.frame.content);
        self.pages.reset();
    }

    // Recompute

    /// Forget the stored page and rebuild the pages
    pub fn reset_pages<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, PagerError> {
        host.session_set(&session_key(self.id), None);
        self.recompute(host)
    }

    /// Rebuild every page from current content and geometry
    ///
    /// Returns the page count. The mutation subscription is off while this
    /// runs so the engine's own edits cannot schedule another pass.
    pub fn recompute<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, PagerError> {
        if !self.mode.is_paginated() {
            return Ok(self.pages.total());
        }
        let started = host.now_ms();
        let previous = self.pages.current();
        let resume = self.pages.starter(previous);
        let content = self.frame.content;

        self.reflow.begin_recompute();
        host.set_observing(content, false);
        let result = self.rebuild(host);
        host.set_observing(content, true);
        let length = self.frame.scroll_length(host, self.config.paging_method);
        self.reflow.finish_recompute(length);

        let total = match result {
            Ok(total) => total,
            Err(PagerError::NotVisible) => {
                debug!("book {} hidden, reset deferred", self.id);
                self.reset_when_visible = true;
                return Err(PagerError::NotVisible);
            }
            Err(e) => return Err(e),
        };
        self.reset_when_visible = false;
        self.recomputes += 1;

        let elapsed = host.now_ms() - started;
        self.is_large = elapsed > self.config.large_book_threshold_ms;
        info!(
            "book {} recomputed: {total} pages in {elapsed:.1}ms, {} fillers, {} failures",
            self.id,
            self.overflow.fillers().len(),
            self.overflow.failures()
        );

        // Pages inside one tall block share a starter; keep the page number
        // when its starter did not move
        let page = match resume.filter(|r| host.contains(content, r.node)) {
            Some(r) if self.pages.starter(previous) == Some(r) => previous,
            Some(r) => self.pages.page_of(host, &r),
            None => self.pages.current(),
        };
        self.go_to(host, page, true);
        self.events.emit(BookEvent::Reset);
        Ok(total)
    }

    fn rebuild<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, PagerError> {
        self.teardown(host);
        let geometry = self
            .driver
            .apply_layout(host, self.frame, &self.config, &mut self.styles)?;
        let ctx = PassContext {
            frame: self.frame,
            geometry,
            config: &self.config,
        };

        self.styles.begin("overflow");
        match self.config.paging_method {
            PagingMethod::Vertical => {
                let sampled = self.overflow.paginate_vertical(host, &ctx, &mut self.styles);
                debug!("sampled {sampled} vertical pages");
            }
            PagingMethod::Column => {
                let fitted = self.overflow.fit_column_items(host, &ctx, &mut self.styles);
                debug!("fitted {fitted} column page items");
            }
        }
        self.styles.commit();
        let total = self.overflow.finish_book_end(host, &ctx);
        self.pages.set_total(total);

        let method = self.config.paging_method;
        let resolver = BoundaryResolver::new(self.frame, geometry, &self.config);
        let catch = resolver.default_catch(Edge::Start);
        for page in 1..=total {
            self.frame
                .set_scroll_pos(host, method, geometry.scroll_pos_for_page(page));
            let starter = resolver.resolve_start(host, page, catch);
            self.pages.push_starter(host, starter);
        }
        self.frame.set_scroll_pos(host, method, 0.0);
        Ok(total)
    }

    // Navigation

    /// Go to `page`, clamped to the book
    ///
    /// Emits `page-change` when the page moved, and `book-start`/`book-end`
    /// when the request ran off either end.
    pub fn set_current_page<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        page: usize,
    ) -> Option<PageChange> {
        self.go_to(host, page, false)
    }

    pub fn next_page<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Option<PageChange> {
        self.set_current_page(host, self.pages.current() + 1)
    }

    pub fn prev_page<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Option<PageChange> {
        self.set_current_page(host, self.pages.current().saturating_sub(1))
    }

    fn go_to<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        page: usize,
        force: bool,
    ) -> Option<PageChange> {
        if !self.mode.is_paginated() {
            return None;
        }
        let geometry = self.driver.geometry()?;
        if geometry.page_length <= 0.0 {
            return None;
        }
        let env = PageEnv {
            frame: self.frame,
            geometry,
            method: self.config.paging_method,
            book_id: self.id,
            draw_class: &self.config.draw_class,
        };
        let change = if force {
            self.pages.jump(host, &env, page)
        } else {
            self.pages.set_current_page(host, &env, page)?
        };
        if change.moved() {
            self.events.emit(BookEvent::PageChange {
                from: change.from,
                to: change.to,
                direction: change.direction,
            });
        }
        if change.hit_start() {
            self.events.emit(BookEvent::BookStart);
        } else if change.requested > self.pages.total() {
            self.events.emit(BookEvent::BookEnd);
        }
        Some(change)
    }

    /// The host scrolled the container; follow it to the page in view
    pub fn on_scroll<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Option<PageChange> {
        if !self.mode.is_paginated() {
            return None;
        }
        let geometry = self.driver.geometry()?;
        let method = self.config.paging_method;
        let pos = snap_scroll_pos(self.frame.scroll_pos(host, method), geometry.page_length);
        let page = geometry.page_for_scroll_pos(pos);
        let env = PageEnv {
            frame: self.frame,
            geometry,
            method: self.config.paging_method,
            book_id: self.id,
            draw_class: &self.config.draw_class,
        };
        let change = self.pages.set_current_page(host, &env, page)?;
        if change.moved() {
            self.events.emit(BookEvent::PageChange {
                from: change.from,
                to: change.to,
                direction: change.direction,
            });
            if change.to == 1 {
                self.events.emit(BookEvent::BookStart);
            }
            if self.pages.at_end() {
                self.events.emit(BookEvent::BookEnd);
            }
        }
        Some(change)
    }

    // Queries

    /// Page showing `offset`, from its rendered position
    pub fn page_for_offset<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        offset: &ContentOffset,
    ) -> Option<usize> {
        let geometry = self.driver.geometry()?;
        offset::page_for_offset(host, self.frame, &geometry, self.config.paging_method, offset)
    }

    /// Starter of the current page as seen from `catch`
    pub fn page_starter_at<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        catch: Point,
    ) -> Option<ContentOffset> {
        let geometry = self.driver.geometry()?;
        let resolver = BoundaryResolver::new(self.frame, geometry, &self.config);
        Some(resolver.resolve_start(host, self.pages.current(), catch))
    }

    /// Resolve both ends of `page`; the scroll position is left as found
    pub fn page_range<H: LayoutHost + ?Sized>(&self, host: &mut H, page: usize) -> Option<PageRange> {
        if !self.mode.is_paginated() || page == 0 || page > self.pages.total() {
            return None;
        }
        let geometry = self.driver.geometry()?;
        let method = self.config.paging_method;
        let saved = self.frame.scroll_pos(host, method);
        self.frame
            .set_scroll_pos(host, method, geometry.scroll_pos_for_page(page));
        let resolver = BoundaryResolver::new(self.frame, geometry, &self.config);
        let start = resolver.resolve_start(host, page, resolver.default_catch(Edge::Start));
        let end = resolver.resolve_end(host, page, resolver.default_catch(Edge::End));
        self.frame.set_scroll_pos(host, method, saved);
        Some(PageRange::new(host, start, end))
    }

    // Reactivity

    /// Feed mutation records of this book's container
    pub fn handle_mutations<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        records: &[MutationRecord],
    ) -> ReflowDecision {
        if !self.mode.is_paginated() || records.is_empty() {
            return ReflowDecision::Ignore;
        }
        let classified: Vec<ClassifiedRecord> = records
            .iter()
            .map(|r| {
                let related = self.owns(host, r.target);
                ClassifiedRecord::classify(host, self.frame.content, r, related)
            })
            .collect();
        let length = self.frame.scroll_length(host, self.config.paging_method);
        let visible = self.visible && host.is_visible(self.frame.container);
        let decision = self.reflow.on_mutations(&classified, length, visible);
        match decision {
            ReflowDecision::Recompute => self.try_recompute(host),
            ReflowDecision::DeferUntilVisible => self.reset_when_visible = true,
            _ => {}
        }
        decision
    }

    /// Feed this book's queued mutations into [`Book::handle_mutations`]
    ///
    /// Records owned by other books go back to the host queue.
    pub fn pump<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> ReflowDecision {
        let records = host.take_mutations();
        let (own, others): (Vec<MutationRecord>, Vec<MutationRecord>) = records
            .into_iter()
            .partition(|r| self.owns(&*host, r.target));
        if !others.is_empty() {
            host.requeue_mutations(others);
        }
        self.handle_mutations(host, &own)
    }

    /// Run a collaborator edit without triggering a reset
    ///
    /// The host mutation queue is drained before suppression is lifted.
    pub fn with_suppressed<H: LayoutHost + ?Sized, R>(
        &mut self,
        host: &mut H,
        edit: impl FnOnce(&mut H) -> R,
    ) -> R {
        let previous = self.reflow.hold();
        let result = edit(host);
        self.pump(host);
        self.reflow.restore(previous);
        result
    }

    /// Ignore the next `batches` mutation notifications
    pub fn suppress_next(&mut self, batches: u32) {
        self.reflow.suppress_next(batches);
    }

    /// Suppress until [`Book::restore_mutations`] is called with the returned value
    pub fn hold_mutations(&mut self) -> Suppression {
        self.reflow.hold()
    }

    pub fn restore_mutations(&mut self, previous: Suppression) {
        self.reflow.restore(previous);
    }

    pub fn on_visibility_change<H: LayoutHost + ?Sized>(&mut self, host: &mut H, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if !visible {
            self.driver.forget();
            self.events.emit(BookEvent::Hidden);
            return;
        }
        self.events.emit(BookEvent::Visible);
        if self.reset_when_visible || (self.mode.is_paginated() && self.driver.geometry().is_none()) {
            self.try_recompute(host);
        }
    }

    /// The viewport was resized
    pub fn on_resize<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> ReflowDecision {
        if !self.mode.is_paginated() {
            return ReflowDecision::Ignore;
        }
        let (width, height) = host.viewport_size();
        if !self.driver.has_changed(host, self.frame, &self.config) {
            debug!("book {} geometry unchanged by resize", self.id);
            self.reflow.set_viewport(width, height);
            return ReflowDecision::Ignore;
        }
        let decision = self.reflow.on_resize(host.now_ms(), width, height);
        if decision == ReflowDecision::Recompute {
            self.resized(host);
        }
        decision
    }

    fn resized<H: LayoutHost + ?Sized>(&mut self, host: &mut H) {
        self.try_recompute(host);
        self.events.emit(BookEvent::Resize);
    }

    /// Timer tick: runs a due resize and the font-scale poll
    ///
    /// Returns `true` when a recompute ran.
    pub fn tick<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.mode.is_paginated() {
            return false;
        }
        let now = host.now_ms();
        let before = self.recomputes;
        if self.reflow.poll(now) {
            self.resized(host);
        } else if self.visible && self.reflow.font_poll_due(now) {
            let length = self.frame.scroll_length(host, self.config.paging_method);
            if self.reflow.scroll_length_changed(length) {
                debug!("book {} scroll length {length} changed, recomputing", self.id);
                self.try_recompute(host);
            }
        }
        self.recomputes != before
    }

    fn try_recompute<H: LayoutHost + ?Sized>(&mut self, host: &mut H) {
        match self.recompute(host) {
            Ok(_) | Err(PagerError::NotVisible) => {}
            Err(e) => warn!("book {} recompute failed: {e}", self.id),
        }
    }

    // Print

    /// Swap in page sections for printing; returns the section count
    pub fn enter_print<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<usize, PagerError> {
        if self.mode == Mode::Print {
            return Err(PagerError::AlreadyInPrintMode);
        }
        self.reflow.cancel_pending();
        let previous = self.mode;
        if !previous.is_paginated() {
            // Collaborators never see the intermediate layout
            self.events.set_muted(true);
            let entered = self.enter_paginated(host);
            self.events.set_muted(false);
            entered?;
        }
        let geometry = self.driver.geometry().ok_or(PagerError::NotVisible)?;

        host.set_observing(self.frame.content, false);
        let params = PrintParams {
            frame: self.frame,
            geometry,
            config: &self.config,
            book_id: self.id,
            pages: self.pages.total(),
        };
        let count = match self.sectioner.build(host, &params) {
            Ok(count) => count,
            Err(e) => {
                host.set_observing(self.frame.content, true);
                return Err(e);
            }
        };
        self.before_print = previous;
        self.mode = Mode::Print;
        self.events.emit(BookEvent::EnteredMode {
            mode: ModeKind::Print,
        });
        Ok(count)
    }

    /// Restore the original content and the mode printing started from
    pub fn exit_print<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Result<(), PagerError> {
        if self.mode != Mode::Print {
            return Err(PagerError::NotInPrintMode);
        }
        let original = self.sectioner.restore(host)?;
        debug_assert_eq!(original, self.frame.content);
        self.mode = Mode::paginated(self.config.paging_method);
        host.set_observing(self.frame.content, true);

        if self.before_print == Mode::Scroll {
            return self.enter_scroll(host);
        }
        if let Some(geometry) = self.driver.geometry() {
            let pos = geometry.scroll_pos_for_page(self.pages.current());
            self.frame.set_scroll_pos(host, self.config.paging_method, pos);
        }
        self.events.emit(BookEvent::EnteredMode {
            mode: ModeKind::Paginated,
        });
        Ok(())
    }
}

impl std::fmt::Debug for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Book")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("mode", &self.mode)
            .field("current", &self.pages.current())
            .field("total", &self.pages.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Direction;
    use crate::host::SimHost;
    use crate::layout::Margins;
    use crate::offset::page_for_node;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn paragraph(host: &mut SimHost, parent: NodeId, lines: usize) -> NodeId {
        let p = host.append_element(parent, "p");
        host.append_text(p, &"abcd ".repeat(12 * lines));
        p
    }

    fn book_with(config: BookConfig, build: impl FnOnce(&mut SimHost, NodeId)) -> (SimHost, Book) {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        build(&mut host, content);
        let book = Book::new(1, Frame::new(container, content), config).unwrap();
        (host, book)
    }

    fn column_book(paragraphs: usize) -> (SimHost, Book) {
        let config = BookConfig {
            margins: Margins::new(20.0, 20.0, 30.0, 30.0),
            ..BookConfig::default()
        };
        book_with(config, |host, content| {
            for _ in 0..paragraphs {
                paragraph(host, content, 20);
            }
        })
    }

    fn record_events(book: &mut Book) -> Rc<RefCell<Vec<BookEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        book.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        seen
    }

    #[test]
    fn test_column_scenario() {
        let (mut host, mut book) = column_book(5);
        let seen = record_events(&mut book);
        book.enter_paginated(&mut host).unwrap();

        let geometry = book.geometry().unwrap();
        assert_eq!(geometry.width, 600.0);
        assert_eq!(geometry.column_gap, 60.0);
        assert_eq!(geometry.page_length, 660.0);
        let container = book.frame().container;
        assert_eq!(host.scroll_width(container), 1980.0);
        assert_eq!(book.total_pages(), 3);
        assert_eq!(book.starters().len(), 3);

        let change = book.set_current_page(&mut host, 2).unwrap();
        assert_eq!(change.direction, Direction::Next);
        assert_eq!(host.scroll_left(container), 660.0);
        assert_eq!(
            seen.borrow().last(),
            Some(&BookEvent::PageChange {
                from: 1,
                to: 2,
                direction: Direction::Next
            })
        );
        assert!(seen.borrow().contains(&BookEvent::EnteredMode {
            mode: ModeKind::Paginated
        }));
    }

    #[test]
    fn test_vertical_page_item_moves_to_next_page() {
        let mut item = NodeId(0);
        let mut img = NodeId(0);
        let config = BookConfig {
            margins: Margins::new(40.0, 40.0, 30.0, 30.0),
            ..BookConfig::vertical()
        };
        let (mut host, mut book) = book_with(config, |host, content| {
            paragraph(host, content, 30);
            item = host.append_element(content, "div");
            host.add_class(item, "pageItem");
            img = host.append_element(item, "img");
            host.set_intrinsic_size(img, 600.0, 860.0);
            paragraph(host, item, 2);
        });
        book.enter_paginated(&mut host).unwrap();

        let geometry = book.geometry().unwrap();
        assert_eq!(geometry.page_length, 800.0);
        let filler = &book.overflow().fillers()[0];
        assert_eq!(host.previous_sibling(item), Some(filler.node));
        assert_eq!(
            page_for_node(&host, book.frame(), &geometry, PagingMethod::Vertical, img),
            Some(2)
        );
        assert_eq!(book.total_pages(), 3);
        assert_eq!(book.overflow().failures(), 0);

        // Scroll mode leaves no trace of pagination
        book.enter_scroll(&mut host).unwrap();
        assert!(book.overflow().fillers().is_empty());
        assert_eq!(host.inline_style(img, "height"), None);
        assert_eq!(host.previous_sibling(item).map(|n| host.tag_name(n)), Some("p".to_string()));
    }

    #[test]
    fn test_block_spanning_columns_keeps_one_starter_per_page() {
        let (mut host, mut book) = book_with(
            BookConfig {
                margins: Margins::new(20.0, 20.0, 30.0, 30.0),
                ..BookConfig::default()
            },
            |host, content| {
                paragraph(host, content, 20);
                let tall = host.append_element(content, "div");
                host.set_style(tall, "height", "2400px");
                paragraph(host, content, 20);
            },
        );
        book.enter_paginated(&mut host).unwrap();

        let total = book.total_pages();
        assert_eq!(total, 5);
        let starters = book.starters().to_vec();
        assert_eq!(starters.len(), total);
        assert!(starters.windows(2).all(|w| !w[1].is_before(&host, &w[0])));
        assert_eq!(book.page_for_offset(&host, &starters[total - 1]), Some(total));

        // A reset on a page inside the tall block stays there
        book.set_current_page(&mut host, 3);
        book.reset_pages(&mut host).unwrap();
        assert_eq!(book.current_page(), 3);
        assert_eq!(book.starters().to_vec(), starters);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let first = book.starters().to_vec();
        assert_eq!(book.reset_pages(&mut host), Ok(3));
        assert_eq!(book.starters(), first.as_slice());
        assert_eq!(book.recompute_count(), 2);

        // Starters follow document order
        for pair in first.windows(2) {
            assert!(pair[0].is_before(&host, &pair[1]));
        }
    }

    #[test]
    fn test_navigation_clamps_and_flags_book_ends() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let seen = record_events(&mut book);

        let change = book.set_current_page(&mut host, 9).unwrap();
        assert_eq!(change.to, 3);
        assert_eq!(book.current_page(), 3);
        assert_eq!(seen.borrow().last(), Some(&BookEvent::BookEnd));

        book.prev_page(&mut host);
        assert_eq!(book.current_page(), 2);
        book.set_current_page(&mut host, 0);
        assert_eq!(book.current_page(), 1);
        assert_eq!(seen.borrow().last(), Some(&BookEvent::BookStart));
        assert!(book.next_page(&mut host).is_some());
        assert_eq!(book.current_page(), 2);
    }

    #[test]
    fn test_stored_page_is_resumed() {
        let (mut host, mut book) = column_book(5);
        host.session_set("pageNumBook1", Some("3"));
        book.enter_paginated(&mut host).unwrap();
        assert_eq!(book.current_page(), 3);
        assert_eq!(host.scroll_left(book.frame().container), 1320.0);

        book.reset_pages(&mut host).unwrap();
        assert_eq!(book.current_page(), 3);
        assert_eq!(host.session_get("pageNumBook1").as_deref(), Some("3"));
    }

    #[test]
    fn test_scroll_follows_host() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let container = book.frame().container;
        host.set_scroll_left(container, 1318.0);
        let change = book.on_scroll(&mut host).unwrap();
        assert_eq!(change.to, 3);
        assert_eq!(host.scroll_left(container), 1320.0);
        assert!(book.on_scroll(&mut host).is_none());
    }

    #[test]
    fn test_resize_burst_recomputes_once() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        assert_eq!(book.recompute_count(), 1);

        for width in [640.0, 620.0, 600.0] {
            host.resize(width, 800.0);
            assert!(matches!(book.on_resize(&mut host), ReflowDecision::Defer { .. }));
            host.advance_clock(100.0);
        }
        assert!(!book.tick(&mut host));
        host.advance_clock(149.0);
        assert!(!book.tick(&mut host));
        host.advance_clock(1.0);
        assert!(book.tick(&mut host));
        assert_eq!(book.recompute_count(), 2);
        assert_eq!(book.geometry().map(|g| g.width), Some(540.0));
        host.advance_clock(100.0);
        assert!(!book.tick(&mut host));
        assert_eq!(book.recompute_count(), 2);
    }

    #[test]
    fn test_resize_to_same_size_is_ignored() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();

        host.resize(660.0, 800.0);
        assert_eq!(book.on_resize(&mut host), ReflowDecision::Ignore);
        // Sub-pixel jitter stays within tolerance
        host.resize(661.5, 800.0);
        assert_eq!(book.on_resize(&mut host), ReflowDecision::Ignore);
        host.advance_clock(300.0);
        assert!(!book.tick(&mut host));
        assert_eq!(book.recompute_count(), 1);
    }

    #[test]
    fn test_mutations_and_suppression() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let content = book.frame().content;

        paragraph(&mut host, content, 20);
        assert_eq!(book.pump(&mut host), ReflowDecision::Recompute);
        assert_eq!(book.recompute_count(), 2);
        assert_eq!(book.total_pages(), 4);

        book.with_suppressed(&mut host, |h| {
            paragraph(h, content, 20);
        });
        assert_eq!(book.recompute_count(), 2);
        assert!(host.take_mutations().is_empty());

        // An empty element has no geometry and cannot move a page
        host.append_element(content, "div");
        assert_eq!(book.pump(&mut host), ReflowDecision::Ignore);
    }

    #[test]
    fn test_hidden_book_defers_reset() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let seen = record_events(&mut book);

        book.on_visibility_change(&mut host, false);
        assert!(book.geometry().is_none());
        paragraph(&mut host, book.frame().content, 20);
        assert_eq!(book.pump(&mut host), ReflowDecision::DeferUntilVisible);
        assert_eq!(book.recompute_count(), 1);

        book.on_visibility_change(&mut host, true);
        assert_eq!(book.recompute_count(), 2);
        assert_eq!(book.total_pages(), 4);
        let names: Vec<&str> = seen.borrow().iter().map(|e| e.name()).collect();
        assert_eq!(names[0], "hidden");
        assert!(names.contains(&"visible"));
        assert!(names.contains(&"reset"));
    }

    #[test]
    fn test_page_range_query() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        let content = book.frame().content;
        let texts: Vec<NodeId> = host
            .children(content)
            .into_iter()
            .map(|p| host.children(p)[0])
            .collect();

        let range = book.page_range(&mut host, 2).unwrap();
        assert_eq!(range.start, ContentOffset::new(texts[1], 1110));
        assert_eq!(range.end.node, texts[3]);
        assert!(range.is_ordered(&host));
        assert_eq!(host.scroll_left(book.frame().container), 0.0);
        assert_eq!(book.page_for_offset(&host, &range.start), Some(2));
        assert!(book.page_range(&mut host, 4).is_none());
    }

    #[test]
    fn test_print_round_trip() {
        let (mut host, mut book) = column_book(5);
        book.enter_paginated(&mut host).unwrap();
        book.set_current_page(&mut host, 2);
        let content = book.frame().content;
        let container = book.frame().container;
        let before = host.serialize(content);
        let seen = record_events(&mut book);

        assert_eq!(book.enter_print(&mut host), Ok(3));
        assert_eq!(book.mode(), Mode::Print);
        assert_eq!(book.enter_print(&mut host), Err(PagerError::AlreadyInPrintMode));
        assert!(book.set_current_page(&mut host, 3).is_none());
        assert_ne!(host.children(container)[0], content);

        book.exit_print(&mut host).unwrap();
        assert_eq!(host.children(container), vec![content]);
        assert_eq!(host.serialize(content), before);
        assert_eq!(book.mode(), Mode::PaginatedColumn);
        assert_eq!(host.scroll_left(container), 660.0);
        assert_eq!(book.exit_print(&mut host), Err(PagerError::NotInPrintMode));
        assert_eq!(
            *seen.borrow(),
            vec![
                BookEvent::EnteredMode {
                    mode: ModeKind::Print
                },
                BookEvent::EnteredMode {
                    mode: ModeKind::Paginated
                },
            ]
        );
    }

    #[test]
    fn test_print_from_scroll_mode_returns_to_scroll() {
        let (mut host, mut book) = column_book(3);
        let content = book.frame().content;
        let before = host.serialize(content);
        let seen = record_events(&mut book);

        assert_eq!(book.enter_print(&mut host), Ok(2));
        assert_eq!(seen.borrow().len(), 1);
        book.exit_print(&mut host).unwrap();
        assert_eq!(book.mode(), Mode::Scroll);
        assert_eq!(host.serialize(content), before);
    }
}
