//! Book events and their listeners
//!
//! Collaborators (annotation, drawing, page counters) learn about page turns
//! and resets here. Events serialize to tagged JSON for the browser binding.

use serde::Serialize;

/// How a page change moved through the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
    Jump,
}

impl Direction {
    /// Classify a move by its page delta
    pub fn between(from: usize, to: usize) -> Self {
        if to == from + 1 {
            Direction::Next
        } else if to + 1 == from {
            Direction::Prev
        } else {
            Direction::Jump
        }
    }
}

/// Mode announced by [`BookEvent::EnteredMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Scroll,
    Paginated,
    Print,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BookEvent {
    PageChange {
        from: usize,
        to: usize,
        direction: Direction,
    },
    Reset,
    Resize,
    EnteredMode {
        mode: ModeKind,
    },
    Visible,
    Hidden,
    BookStart,
    BookEnd,
}

impl BookEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BookEvent::PageChange { .. } => "page-change",
            BookEvent::Reset => "reset",
            BookEvent::Resize => "resize",
            BookEvent::EnteredMode { .. } => "entered-mode",
            BookEvent::Visible => "visible",
            BookEvent::Hidden => "hidden",
            BookEvent::BookStart => "book-start",
            BookEvent::BookEnd => "book-end",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

type Listener = Box<dyn FnMut(&BookEvent)>;

/// Listeners of one book
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u32,
    muted: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&BookEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Events emitted while muted are dropped
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn emit(&mut self, event: BookEvent) {
        if self.muted {
            return;
        }
        log::trace!("emit {}", event.name());
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("muted", &self.muted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_direction_between() {
        assert_eq!(Direction::between(1, 2), Direction::Next);
        assert_eq!(Direction::between(3, 2), Direction::Prev);
        assert_eq!(Direction::between(1, 5), Direction::Jump);
        assert_eq!(Direction::between(2, 2), Direction::Jump);
    }

    #[test]
    fn test_event_json() {
        let event = BookEvent::PageChange {
            from: 1,
            to: 2,
            direction: Direction::Next,
        };
        assert_eq!(
            event.to_json(),
            r#"{"type":"page-change","from":1,"to":2,"direction":"next"}"#
        );
        assert_eq!(
            BookEvent::EnteredMode {
                mode: ModeKind::Print
            }
            .to_json(),
            r#"{"type":"entered-mode","mode":"print"}"#
        );
        assert_eq!(BookEvent::BookEnd.to_json(), r#"{"type":"book-end"}"#);
    }

    #[test]
    fn test_subscribe_emit_mute() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Rc::clone(&seen);
        let id = bus.subscribe(move |e| sink.borrow_mut().push(e.name()));

        bus.emit(BookEvent::Reset);
        bus.set_muted(true);
        bus.emit(BookEvent::Resize);
        bus.set_muted(false);
        bus.emit(BookEvent::Visible);
        assert_eq!(*seen.borrow(), vec!["reset", "visible"]);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(BookEvent::Hidden);
        assert_eq!(seen.borrow().len(), 2);
    }
}
