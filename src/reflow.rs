//! Reflow scheduling
//!
//! Decides which mutations, resizes and font changes invalidate the current
//! pagination, and when the recompute should run. The scheduler never reads
//! a clock itself: callers pass the host time in milliseconds and poll.

use crate::config::BookConfig;
use crate::host::{LayoutHost, MutationRecord, NodeId};
use crate::offset::{is_valid_node, was_valid_node};
use log::debug;

/// Scroll length drift that does not count as a change
pub const SCROLL_LENGTH_TOLERANCE_PX: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReflowState {
    Idle,
    PendingMutation,
    PendingResize { deadline_ms: f64 },
    Recomputing,
}

/// What the owner should do after a notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReflowDecision {
    Ignore,
    Recompute,
    /// Poll again once the deadline has passed
    Defer { deadline_ms: f64 },
    /// The container is hidden; recompute when it shows again
    DeferUntilVisible,
}

/// Mutation suppression requested by collaborators editing the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Suppression {
    #[default]
    Off,
    /// Ignore this many notification batches
    Count(u32),
    /// Ignore everything until released
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn of(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// A mutation record as seen by one book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedRecord {
    /// The record belongs to this book's content
    pub related: bool,
    pub changes_tree: bool,
    /// Some affected node has geometry pagination can see
    pub touches_valid_node: bool,
}

impl ClassifiedRecord {
    pub fn classify<H: LayoutHost + ?Sized>(
        host: &H,
        content: NodeId,
        record: &MutationRecord,
        related: bool,
    ) -> Self {
        let changes_tree = record.changes_tree();
        let touches_valid_node = if changes_tree {
            record
                .added
                .iter()
                .any(|&n| is_valid_node(host, content, n))
                || record.removed.iter().any(|&n| was_valid_node(host, n))
        } else {
            record.affects_layout() && is_valid_node(host, content, record.target)
        };
        Self {
            related,
            changes_tree,
            touches_valid_node,
        }
    }
}

/// Per-book reflow state machine
#[derive(Debug)]
pub struct ReflowScheduler {
    state: ReflowState,
    suppression: Suppression,
    debounce_ms: f64,
    burst_limit: u32,
    orientation: Option<Orientation>,
    /// Immediate recomputes in the current resize burst
    orientation_changes: u32,
    last_resize_ms: f64,
    scroll_length: f32,
    font_poll_ms: f64,
    last_font_poll_ms: f64,
}

impl ReflowScheduler {
    pub fn new(config: &BookConfig) -> Self {
        Self {
            state: ReflowState::Idle,
            suppression: Suppression::Off,
            debounce_ms: config.resize_debounce_ms,
            burst_limit: config.orientation_burst_limit,
            orientation: None,
            orientation_changes: 0,
            last_resize_ms: f64::NEG_INFINITY,
            scroll_length: 0.0,
            font_poll_ms: config.font_poll_interval_ms,
            last_font_poll_ms: 0.0,
        }
    }

    pub fn state(&self) -> ReflowState {
        self.state
    }

    pub fn suppression(&self) -> Suppression {
        self.suppression
    }

    /// Ignore the next `batches` mutation notifications
    pub fn suppress_next(&mut self, batches: u32) {
        self.suppression = match self.suppression {
            Suppression::Hold => Suppression::Hold,
            Suppression::Count(n) => Suppression::Count(n + batches),
            Suppression::Off if batches == 0 => Suppression::Off,
            Suppression::Off => Suppression::Count(batches),
        };
    }

    /// Ignore all mutations; returns the suppression to restore afterwards
    pub fn hold(&mut self) -> Suppression {
        std::mem::replace(&mut self.suppression, Suppression::Hold)
    }

    pub fn restore(&mut self, previous: Suppression) {
        self.suppression = previous;
    }

    pub fn release(&mut self) {
        self.suppression = Suppression::Off;
    }

    pub fn scroll_length(&self) -> f32 {
        self.scroll_length
    }

    pub fn set_scroll_length(&mut self, length: f32) {
        self.scroll_length = length;
    }

    pub fn scroll_length_changed(&self, length: f32) -> bool {
        (length - self.scroll_length).abs() > SCROLL_LENGTH_TOLERANCE_PX
    }

    /// Classify one notification batch
    ///
    /// `scroll_length` is the current scroll length of the container, used
    /// for changes that do not touch the tree.
    pub fn on_mutations(
        &mut self,
        records: &[ClassifiedRecord],
        scroll_length: f32,
        visible: bool,
    ) -> ReflowDecision {
        if self.state == ReflowState::Recomputing {
            return ReflowDecision::Ignore;
        }
        match self.suppression {
            Suppression::Hold => return ReflowDecision::Ignore,
            Suppression::Count(n) => {
                self.suppression = if n <= 1 {
                    Suppression::Off
                } else {
                    Suppression::Count(n - 1)
                };
                return ReflowDecision::Ignore;
            }
            Suppression::Off => {}
        }

        let structural = records
            .iter()
            .any(|r| r.related && r.changes_tree && r.touches_valid_node);
        let restyled = records
            .iter()
            .any(|r| r.related && !r.changes_tree && r.touches_valid_node)
            && self.scroll_length_changed(scroll_length);
        if !structural && !restyled {
            return ReflowDecision::Ignore;
        }
        debug!("mutation invalidates pages (structural: {structural})");
        self.state = ReflowState::PendingMutation;
        if visible {
            ReflowDecision::Recompute
        } else {
            ReflowDecision::DeferUntilVisible
        }
    }

    /// Remember the viewport shape without scheduling anything
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.orientation = Some(Orientation::of(width, height));
    }

    /// A viewport resize
    ///
    /// The first few orientation flips of a burst recompute at once;
    /// everything else is debounced from the latest event. A burst ends once
    /// no resize arrived for a whole debounce delay.
    pub fn on_resize(&mut self, now_ms: f64, width: f32, height: f32) -> ReflowDecision {
        if now_ms - self.last_resize_ms > self.debounce_ms {
            self.orientation_changes = 0;
        }
        self.last_resize_ms = now_ms;
        let orientation = Orientation::of(width, height);
        let flipped = self.orientation.is_some_and(|o| o != orientation);
        self.orientation = Some(orientation);
        if flipped && self.orientation_changes < self.burst_limit {
            self.orientation_changes += 1;
            debug!("orientation changed to {orientation:?}, recomputing now");
            self.state = ReflowState::Idle;
            return ReflowDecision::Recompute;
        }
        let deadline_ms = now_ms + self.debounce_ms;
        self.state = ReflowState::PendingResize { deadline_ms };
        ReflowDecision::Defer { deadline_ms }
    }

    /// `true` once a debounced resize is due; the pending state is consumed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.state {
            ReflowState::PendingResize { deadline_ms } if now_ms >= deadline_ms => {
                self.state = ReflowState::Idle;
                self.orientation_changes = 0;
                true
            }
            _ => false,
        }
    }

    /// Drop pending work before a mode transition
    pub fn cancel_pending(&mut self) {
        if matches!(
            self.state,
            ReflowState::PendingMutation | ReflowState::PendingResize { .. }
        ) {
            self.state = ReflowState::Idle;
        }
    }

    pub fn begin_recompute(&mut self) {
        self.state = ReflowState::Recomputing;
    }

    pub fn finish_recompute(&mut self, scroll_length: f32) {
        self.scroll_length = scroll_length;
        self.state = ReflowState::Idle;
    }

    /// `true` at most once per font poll interval
    pub fn font_poll_due(&mut self, now_ms: f64) -> bool {
        if now_ms - self.last_font_poll_ms >= self.font_poll_ms {
            self.last_font_poll_ms = now_ms;
            true
        } else {
            false
        }
    }
}
