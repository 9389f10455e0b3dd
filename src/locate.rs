//! Point to content offset queries

use crate::host::{LayoutHost, NodeId, Position};
use crate::layout::Frame;
use crate::offset::ContentOffset;
use crate::Point;
use log::debug;
use smallvec::SmallVec;
use std::ops::{Deref, DerefMut};

/// Overlays disabled per query before giving up
const MAX_SHIELDED: usize = 16;

/// Host borrow that disables pointer interception on foreign overlays
///
/// Every disabled element gets its previous inline `pointer-events` back when
/// the shield drops, whichever way the query ends.
struct PointerShield<'h, H: LayoutHost + ?Sized> {
    host: &'h mut H,
    disabled: SmallVec<[(NodeId, Option<String>); 4]>,
}

impl<'h, H: LayoutHost + ?Sized> PointerShield<'h, H> {
    fn new(host: &'h mut H) -> Self {
        Self {
            host,
            disabled: SmallVec::new(),
        }
    }

    fn disable(&mut self, node: NodeId) -> bool {
        if self.disabled.iter().any(|(n, _)| *n == node) {
            return false;
        }
        let previous = self.host.inline_style(node, "pointer-events");
        self.host.set_inline_style(node, "pointer-events", Some("none"));
        self.disabled.push((node, previous));
        true
    }
}

impl<H: LayoutHost + ?Sized> Deref for PointerShield<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: LayoutHost + ?Sized> DerefMut for PointerShield<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: LayoutHost + ?Sized> Drop for PointerShield<'_, H> {
    fn drop(&mut self) {
        while let Some((node, previous)) = self.disabled.pop() {
            self.host
                .set_inline_style(node, "pointer-events", previous.as_deref());
        }
    }
}

/// Maps points to content offsets of one book
#[derive(Debug, Clone, Copy)]
pub struct GeometricLocator {
    frame: Frame,
}

impl GeometricLocator {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }

    /// Offset under a page-local point of the page in view
    pub fn locate<H: LayoutHost + ?Sized>(&self, host: &mut H, local: Point) -> Option<ContentOffset> {
        let point = self.frame.to_client(host, local);
        self.locate_client(host, point)
    }

    /// Offset under a viewport point
    pub fn locate_client<H: LayoutHost + ?Sized>(
        &self,
        host: &mut H,
        point: Point,
    ) -> Option<ContentOffset> {
        let mut shield = PointerShield::new(host);
        for _ in 0..MAX_SHIELDED {
            let Some(hit) = shield.element_from_point(point) else {
                break;
            };
            if self.is_owned(&*shield, hit) {
                break;
            }
            let Some(target) = self.interceptor(&*shield, hit) else {
                break;
            };
            debug!("disabling pointer events on {target:?} at {point:?}");
            if !shield.disable(target) {
                break;
            }
        }
        shield
            .caret_from_point(point)
            .map(|(node, offset)| ContentOffset::new(node, offset))
    }

    fn is_owned<H: LayoutHost + ?Sized>(&self, host: &H, node: NodeId) -> bool {
        node == self.frame.container || host.contains(self.frame.content, node)
    }

    /// The element whose pointer events must go for `hit` to stop intercepting
    fn interceptor<H: LayoutHost + ?Sized>(&self, host: &H, hit: NodeId) -> Option<NodeId> {
        if host.position(hit) != Position::Static {
            return Some(hit);
        }
        let mut current = host.parent(hit);
        while let Some(n) = current {
            if self.is_owned(host, n) || host.parent(n).is_none() {
                return None;
            }
            if host.position(n) != Position::Static {
                return Some(n);
            }
            current = host.parent(n);
        }
        None
    }
}
