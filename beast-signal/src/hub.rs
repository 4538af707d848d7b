//! Circular, reference-counted list of callback links.
//!
//! The list always runs through an embedded sentinel node, even when empty
//! (the sentinel then points at itself). Nodes are owned by their
//! predecessor's `next` pointer and by any dispatch cursor positioned on them.
//!
//! Disconnecting a node splices it out of the ring but keeps its own `next`
//! and `prev` pointers, so a cursor currently standing on it can still step
//! off. The node is freed once the last cursor releases it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr;
use std::rc::{Rc, Weak};

/// One connected observer in an [`EventHub`] ring.
pub struct CallbackLink<S> {
    next: RefCell<Option<Rc<CallbackLink<S>>>>,
    prev: RefCell<Weak<CallbackLink<S>>>,
    callable: Cell<bool>,
    with_emitter: Cell<bool>,
    /// `None` only for the sentinel.
    slot: Option<S>,
}

impl<S> CallbackLink<S> {
    /// Create an unlinked node wrapping `slot`.
    pub fn new(slot: S) -> Rc<Self> {
        Rc::new(Self::unlinked(Some(slot)))
    }

    fn sentinel() -> Rc<Self> {
        Rc::new(Self::unlinked(None))
    }

    fn unlinked(slot: Option<S>) -> Self {
        Self {
            next: RefCell::new(None),
            prev: RefCell::new(Weak::new()),
            callable: Cell::new(true),
            with_emitter: Cell::new(false),
            slot,
        }
    }

    pub fn slot(&self) -> Option<&S> {
        self.slot.as_ref()
    }

    /// False once the node has been disconnected.
    pub fn is_callable(&self) -> bool {
        self.callable.get()
    }

    /// Whether the observer expects the emitter as its first argument.
    pub fn with_emitter(&self) -> bool {
        self.with_emitter.get()
    }

    pub fn is_sentinel(&self) -> bool {
        self.slot.is_none()
    }

    /// True while the node carries ring pointers (including stale ones).
    pub fn is_linked(&self) -> bool {
        self.next.borrow().is_some()
    }

    pub(crate) fn next(&self) -> Option<Rc<Self>> {
        self.next.borrow().clone()
    }

    /// Mark the node dead and splice it out, keeping its own pointers.
    /// Returns false if it was already disconnected.
    pub(crate) fn disconnect(&self) -> bool {
        if self.is_sentinel() || !self.callable.replace(false) {
            return false;
        }
        self.splice_out();
        log::trace!(target: "signal::hub", "disconnected link (with_emitter: {})", self.with_emitter());
        true
    }

    /// Join `prev` and `next` around this node. Own pointers are left alone.
    fn splice_out(&self) {
        let next = self.next.borrow().clone();
        let prev = self.prev.borrow().upgrade();
        if let (Some(next), Some(prev)) = (next, prev) {
            *next.prev.borrow_mut() = Rc::downgrade(&prev);
            let old = prev.next.replace(Some(next));
            drop(old);
        }
    }
}

impl<S> fmt::Debug for CallbackLink<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackLink")
            .field("sentinel", &self.is_sentinel())
            .field("callable", &self.callable.get())
            .field("with_emitter", &self.with_emitter.get())
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// Owner of the sentinel and of the connect/disconnect operations.
pub struct EventHub<S> {
    start: Rc<CallbackLink<S>>,
}

impl<S> EventHub<S> {
    pub fn new() -> Self {
        let start = CallbackLink::sentinel();
        *start.next.borrow_mut() = Some(Rc::clone(&start));
        *start.prev.borrow_mut() = Rc::downgrade(&start);
        Self { start }
    }

    /// The fixed head/tail marker of the ring.
    pub fn sentinel(&self) -> &Rc<CallbackLink<S>> {
        &self.start
    }

    /// Append `link` right before the sentinel.
    ///
    /// The link must be unlinked; connecting a node twice is a caller bug.
    pub fn connect(&self, link: &Rc<CallbackLink<S>>, with_emitter: bool) {
        debug_assert!(!link.is_linked(), "callback link is already connected");
        let last = self
            .start
            .prev
            .borrow()
            .upgrade()
            .unwrap_or_else(|| Rc::clone(&self.start));
        *link.prev.borrow_mut() = Rc::downgrade(&last);
        *link.next.borrow_mut() = Some(Rc::clone(&self.start));
        let old = last.next.replace(Some(Rc::clone(link)));
        drop(old);
        *self.start.prev.borrow_mut() = Rc::downgrade(link);
        link.with_emitter.set(with_emitter);
        log::trace!(target: "signal::hub", "connected link (with_emitter: {})", with_emitter);
    }

    /// Remove the first node, head to tail, whose `with_emitter` flag matches
    /// and which `matches` accepts. Returns the number removed (0 or 1).
    ///
    /// The removed node keeps its stale ring pointers for in-flight cursors.
    pub fn disconnect_equal<F>(&self, with_emitter: bool, mut matches: F) -> usize
    where
        F: FnMut(&CallbackLink<S>) -> bool,
    {
        let mut walk = self.start.next();
        while let Some(link) = walk {
            if Rc::ptr_eq(&link, &self.start) {
                break;
            }
            if link.with_emitter.get() == with_emitter
                && link.is_callable()
                && matches(&link)
                && link.disconnect()
            {
                return 1;
            }
            walk = link.next();
        }
        0
    }

    /// Number of callable nodes in the ring.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut walk = self.start.next();
        while let Some(link) = walk {
            if Rc::ptr_eq(&link, &self.start) {
                break;
            }
            if link.is_callable() {
                count += 1;
            }
            walk = link.next();
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.start
            .next
            .borrow()
            .as_ref()
            .map_or(true, |next| ptr::eq(Rc::as_ptr(next), Rc::as_ptr(&self.start)))
    }

    fn destruct_link(&self, link: &Rc<CallbackLink<S>>) {
        link.callable.set(false);
        link.splice_out();
        let next = link.next.replace(None);
        link.prev.replace(Weak::new());
        drop(next);
    }
}

impl<S> Default for EventHub<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Drop for EventHub<S> {
    fn drop(&mut self) {
        let mut released = 0usize;
        while let Some(first) = self.start.next() {
            if Rc::ptr_eq(&first, &self.start) {
                break;
            }
            self.destruct_link(&first);
            released += 1;
        }
        debug_assert!(self.is_empty(), "event hub ring not empty at teardown");
        let next = self.start.next.replace(None);
        self.start.prev.replace(Weak::new());
        drop(next);
        debug_assert_eq!(
            Rc::strong_count(&self.start),
            1,
            "sentinel still referenced at teardown (emission in progress?)"
        );
        if released > 0 {
            log::debug!(target: "signal::hub", "released {} links at teardown", released);
        }
    }
}

impl<S> fmt::Debug for EventHub<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub").field("len", &self.len()).finish()
    }
}
