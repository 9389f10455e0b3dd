//! Books keyed by container identity
//!
//! Replaces any notion of a global "current book": focus, printing and
//! mutation routing are all answered here from explicit state.

use crate::book::{Book, BOOK_CLASS};
use crate::config::BookConfig;
use crate::error::PagerError;
use crate::host::{LayoutHost, MutationRecord, NodeId};
use crate::layout::Frame;
use crate::reflow::ReflowDecision;
use log::{debug, info};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(pub u32);

/// All books of one host
#[derive(Debug, Default)]
pub struct BookRegistry {
    books: FxHashMap<BookId, Book>,
    by_container: FxHashMap<NodeId, BookId>,
    /// Creation order
    order: Vec<BookId>,
    focused: Option<BookId>,
    printing: Option<BookId>,
    next_id: u32,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[BookId] {
        &self.order
    }

    pub fn focused(&self) -> Option<BookId> {
        self.focused
    }

    /// The book currently showing print sections
    pub fn printing(&self) -> Option<BookId> {
        self.printing
    }

    /// Register a container/content pair
    ///
    /// Registering a container twice returns the existing id.
    pub fn create<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        container: NodeId,
        content: NodeId,
        config: BookConfig,
    ) -> Result<BookId, PagerError> {
        if let Some(&id) = self.by_container.get(&container) {
            debug!("container {container:?} already registered as {id:?}");
            return Ok(id);
        }
        let id = BookId(self.next_id + 1);
        let book = Book::new(id.0, Frame::new(container, content), config)?;
        self.next_id = id.0;

        host.add_class(container, BOOK_CLASS);
        host.add_class(container, &format!("book_{}", id.0));
        host.add_class(content, "bookContents");
        host.add_class(content, &format!("article_{}", id.0));

        self.books.insert(id, book);
        self.by_container.insert(container, id);
        self.order.push(id);
        if self.focused.is_none() {
            self.focused = Some(id);
        }
        info!("registered book {} for container {container:?}", id.0);
        Ok(id)
    }

    /// Return the book to scroll mode and forget it
    pub fn remove<H: LayoutHost + ?Sized>(&mut self, host: &mut H, id: BookId) -> Result<(), PagerError> {
        let book = self.book_mut(id)?;
        book.enter_scroll(host)?;
        let frame = book.frame();
        host.set_observing(frame.content, false);
        host.remove_class(frame.container, BOOK_CLASS);
        host.remove_class(frame.container, &format!("book_{}", id.0));
        host.remove_class(frame.content, "bookContents");
        host.remove_class(frame.content, &format!("article_{}", id.0));

        self.books.remove(&id);
        self.by_container.remove(&frame.container);
        self.order.retain(|&b| b != id);
        if self.printing == Some(id) {
            self.printing = None;
        }
        if self.focused == Some(id) {
            self.focused = self.order.first().copied();
        }
        Ok(())
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn book(&self, id: BookId) -> Result<&Book, PagerError> {
        self.books.get(&id).ok_or(PagerError::UnknownBook(id.0))
    }

    pub fn book_mut(&mut self, id: BookId) -> Result<&mut Book, PagerError> {
        self.books.get_mut(&id).ok_or(PagerError::UnknownBook(id.0))
    }

    pub fn by_container(&self, container: NodeId) -> Option<BookId> {
        self.by_container.get(&container).copied()
    }

    /// Book whose container is the nearest registered ancestor of `node`
    pub fn book_for_node<H: LayoutHost + ?Sized>(&self, host: &H, node: NodeId) -> Option<BookId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(&id) = self.by_container.get(&n) {
                return Some(id);
            }
            current = host.parent(n);
        }
        None
    }

    /// Drain the host's mutations and hand each book its own records
    pub fn route<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> Vec<(BookId, ReflowDecision)> {
        let records = host.take_mutations();
        let mut batches: Vec<(BookId, Vec<MutationRecord>)> = Vec::new();
        for record in records {
            let Some(owner) = self.book_for_node(host, record.target) else {
                continue;
            };
            match batches.iter_mut().find(|(id, _)| *id == owner) {
                Some((_, batch)) => batch.push(record),
                None => batches.push((owner, vec![record])),
            }
        }
        batches
            .into_iter()
            .filter_map(|(id, batch)| {
                let book = self.books.get_mut(&id)?;
                Some((id, book.handle_mutations(host, &batch)))
            })
            .collect()
    }

    pub fn focus(&mut self, id: BookId) -> Result<(), PagerError> {
        self.book(id)?;
        self.focused = Some(id);
        Ok(())
    }

    /// Move focus away from `id`
    ///
    /// Focus goes to the nearest visible book enclosing it, else to the first
    /// visible book.
    pub fn blur<H: LayoutHost + ?Sized>(&mut self, host: &H, id: BookId) -> Result<Option<BookId>, PagerError> {
        let container = self.book(id)?.frame().container;
        if self.focused != Some(id) {
            return Ok(self.focused);
        }
        let visible = |registry: &Self, candidate: BookId| {
            candidate != id
                && registry.books.get(&candidate).is_some_and(|b| {
                    b.is_visible() && host.is_visible(b.frame().container)
                })
        };

        let mut enclosing = host
            .parent(container)
            .and_then(|p| self.book_for_node(host, p));
        while let Some(candidate) = enclosing {
            if visible(self, candidate) {
                break;
            }
            enclosing = self
                .books
                .get(&candidate)
                .and_then(|b| host.parent(b.frame().container))
                .and_then(|p| self.book_for_node(host, p));
        }
        let next = enclosing.or_else(|| self.order.iter().copied().find(|&b| visible(self, b)));
        debug!("focus moves from {id:?} to {next:?}");
        self.focused = next;
        Ok(next)
    }

    /// Enter print mode; only one book prints at a time
    pub fn enter_print<H: LayoutHost + ?Sized>(&mut self, host: &mut H, id: BookId) -> Result<usize, PagerError> {
        if self.printing.is_some_and(|p| p != id) {
            return Err(PagerError::AlreadyInPrintMode);
        }
        let count = self.book_mut(id)?.enter_print(host)?;
        self.printing = Some(id);
        Ok(count)
    }

    pub fn exit_print<H: LayoutHost + ?Sized>(&mut self, host: &mut H, id: BookId) -> Result<(), PagerError> {
        self.book_mut(id)?.exit_print(host)?;
        if self.printing == Some(id) {
            self.printing = None;
        }
        Ok(())
    }

    /// Forward a viewport resize to every book
    pub fn on_resize<H: LayoutHost + ?Sized>(&mut self, host: &mut H) {
        for id in &self.order {
            if let Some(book) = self.books.get_mut(id) {
                book.on_resize(host);
            }
        }
    }

    /// Timer tick for every book; returns how many recomputed
    pub fn tick<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut recomputed = 0;
        for id in &self.order {
            if let Some(book) = self.books.get_mut(id) {
                if book.tick(host) {
                    recomputed += 1;
                }
            }
        }
        recomputed
    }
}
