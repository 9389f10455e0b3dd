//! Undo log for edits the engine makes to host content
//!
//! Every inline style write, created element and added class is recorded
//! with what it replaced. Reverting walks the log backwards, so chained edits
//! of the same property on the same node restore the original value.

use crate::host::{LayoutHost, NodeId};

/// One reversible edit
#[derive(Debug, Clone, PartialEq)]
pub enum StyleEdit {
    Style {
        node: NodeId,
        property: String,
        previous: Option<String>,
    },
    Created {
        node: NodeId,
    },
    Class {
        node: NodeId,
        class: String,
    },
}

impl StyleEdit {
    fn revert<H: LayoutHost + ?Sized>(&self, host: &mut H) {
        match self {
            StyleEdit::Style {
                node,
                property,
                previous,
            } => host.set_inline_style(*node, property, previous.as_deref()),
            StyleEdit::Created { node } => {
                if host.parent(*node).is_some() {
                    host.remove(*node);
                }
            }
            StyleEdit::Class { node, class } => host.remove_class(*node, class),
        }
    }
}

/// A group of edits reverted together
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Description of the operation
    pub description: String,
    pub edits: Vec<StyleEdit>,
}

impl Transaction {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            edits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Undo log for style edits
#[derive(Debug, Default)]
pub struct StyleLog {
    /// Committed transactions, oldest first
    done: Vec<Transaction>,
    /// Current transaction being built
    pending: Option<Transaction>,
}

impl StyleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new transaction, committing any open one
    pub fn begin(&mut self, description: &str) {
        self.commit();
        self.pending = Some(Transaction::new(description));
    }

    /// Commit the current transaction
    pub fn commit(&mut self) {
        if let Some(txn) = self.pending.take() {
            if !txn.is_empty() {
                self.done.push(txn);
            }
        }
    }

    fn record(&mut self, edit: StyleEdit) {
        match self.pending.as_mut() {
            Some(txn) => txn.edits.push(edit),
            None => self.done.push(Transaction {
                description: String::new(),
                edits: vec![edit],
            }),
        }
    }

    /// Write an inline style, remembering the value it replaces
    pub fn set_style<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
        property: &str,
        value: Option<&str>,
    ) {
        let previous = host.inline_style(node, property);
        if previous.as_deref() == value {
            return;
        }
        self.record(StyleEdit::Style {
            node,
            property: property.to_string(),
            previous,
        });
        host.set_inline_style(node, property, value);
    }

    /// Apply several declarations to one node
    pub fn change_style<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
        rules: &[(&str, &str)],
    ) {
        for (property, value) in rules {
            self.set_style(host, node, property, Some(value));
        }
    }

    /// Remember an element the engine inserted so reverting removes it
    pub fn record_created(&mut self, node: NodeId) {
        self.record(StyleEdit::Created { node });
    }

    pub fn add_class<H: LayoutHost + ?Sized>(&mut self, host: &mut H, node: NodeId, class: &str) {
        if host.has_class(node, class) {
            return;
        }
        self.record(StyleEdit::Class {
            node,
            class: class.to_string(),
        });
        host.add_class(node, class);
    }

    /// Revert the most recent transaction
    pub fn undo_last<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> bool {
        self.commit();
        let Some(txn) = self.done.pop() else {
            return false;
        };
        for edit in txn.edits.iter().rev() {
            edit.revert(host);
        }
        true
    }

    /// Revert everything, newest first; returns the number of edits undone
    pub fn recover_all<H: LayoutHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.commit();
        let mut count = 0;
        while let Some(txn) = self.done.pop() {
            for edit in txn.edits.iter().rev() {
                edit.revert(host);
                count += 1;
            }
        }
        count
    }

    /// Number of committed transactions
    pub fn depth(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty() && self.pending.as_ref().map_or(true, Transaction::is_empty)
    }

    /// Forget all history without reverting it
    pub fn clear(&mut self) {
        self.done.clear();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SimHost;

    fn fixture() -> (SimHost, NodeId) {
        let mut host = SimHost::new(400.0, 300.0);
        let doc = host.document();
        let div = host.append_element(doc, "div");
        host.set_style(div, "margin-top", "12px");
        (host, div)
    }

    #[test]
    fn test_chained_edits_restore_original() {
        let (mut host, div) = fixture();
        let mut log = StyleLog::new();

        log.begin("layout");
        log.set_style(&mut host, div, "margin-top", Some("0px"));
        log.commit();
        log.begin("overflow");
        log.set_style(&mut host, div, "margin-top", Some("5px"));
        log.change_style(&mut host, div, &[("height", "10px"), ("width", "auto")]);
        log.commit();

        assert_eq!(log.depth(), 2);
        assert_eq!(log.recover_all(&mut host), 4);
        assert_eq!(host.inline_style(div, "margin-top").as_deref(), Some("12px"));
        assert_eq!(host.inline_style(div, "height"), None);
        assert!(log.is_empty());
    }

    #[test]
    fn test_created_and_class_reverted() {
        let (mut host, div) = fixture();
        let mut log = StyleLog::new();
        let span = host.append_element(div, "span");
        log.record_created(span);
        log.add_class(&mut host, div, "book");
        log.add_class(&mut host, div, "book");

        assert!(host.has_class(div, "book"));
        log.recover_all(&mut host);
        assert!(!host.has_class(div, "book"));
        assert!(host.children(div).is_empty());
    }

    #[test]
    fn test_undo_last_only_reverts_newest() {
        let (mut host, div) = fixture();
        let mut log = StyleLog::new();
        log.begin("first");
        log.set_style(&mut host, div, "color", Some("red"));
        log.begin("second");
        log.set_style(&mut host, div, "color", Some("blue"));
        assert!(log.undo_last(&mut host));
        assert_eq!(host.inline_style(div, "color").as_deref(), Some("red"));
        assert!(log.undo_last(&mut host));
        assert_eq!(host.inline_style(div, "color"), None);
        assert!(!log.undo_last(&mut host));
    }

    #[test]
    fn test_unchanged_write_not_recorded() {
        let (mut host, div) = fixture();
        let mut log = StyleLog::new();
        log.set_style(&mut host, div, "margin-top", Some("12px"));
        assert!(log.is_empty());
    }
}
