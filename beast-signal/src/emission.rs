//! Per-emission state and the cursor that walks a hub ring during dispatch.

use std::cell::Cell;
use std::fmt;
use std::ptr;
use std::rc::Rc;

use crate::hub::CallbackLink;

/// Ephemeral flags for one emission.
#[derive(Debug)]
pub struct EmissionState {
    restart_emission: Cell<bool>,
    stop_emission: Cell<bool>,
}

impl EmissionState {
    pub fn new() -> Self {
        Self {
            restart_emission: Cell::new(true),
            stop_emission: Cell::new(false),
        }
    }

    /// Request early termination; the next cursor step jumps to the end.
    pub fn stop(&self) {
        self.stop_emission.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_emission.get()
    }

    /// Re-arm: the next cursor step starts over from the first link.
    pub fn restart(&self) {
        self.restart_emission.set(true);
        self.stop_emission.set(false);
    }

    pub fn is_restarting(&self) -> bool {
        self.restart_emission.get()
    }
}

impl Default for EmissionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward cursor over a hub ring that tolerates structural changes made by
/// the callbacks it visits.
///
/// Two cursors are equal when they belong to the same emission and stand on
/// the same node, so a cursor built at the sentinel doubles as the end marker.
pub struct DispatchIterator<'a, S> {
    emission: &'a EmissionState,
    current: Rc<CallbackLink<S>>,
    start: Rc<CallbackLink<S>>,
}

impl<'a, S> DispatchIterator<'a, S> {
    /// Cursor positioned on the sentinel. Positioning is deferred to the first
    /// [`advance`](Self::advance) while the emission is restarting.
    pub fn new(emission: &'a EmissionState, start: &Rc<CallbackLink<S>>) -> Self {
        Self {
            emission,
            current: Rc::clone(start),
            start: Rc::clone(start),
        }
    }

    pub fn advance(&mut self) {
        if self.emission.restart_emission.replace(false) {
            self.current = self.start.next().unwrap_or_else(|| Rc::clone(&self.start));
        } else {
            loop {
                // a hard-removed node has no next; only possible after hub teardown
                let next = self.current.next();
                debug_assert!(next.is_some(), "dispatch cursor on an unlinked node");
                self.current = next.unwrap_or_else(|| Rc::clone(&self.start));
                if self.current.is_callable() || self.at_start() {
                    break;
                }
            }
        }
        if self.emission.is_stopped() {
            self.current = Rc::clone(&self.start);
        }
    }

    pub fn current(&self) -> &CallbackLink<S> {
        &self.current
    }

    /// Slot of the current node if it is a live observer.
    pub fn callable_slot(&self) -> Option<&S> {
        if self.current.is_callable() {
            self.current.slot()
        } else {
            None
        }
    }

    pub fn at_start(&self) -> bool {
        Rc::ptr_eq(&self.current, &self.start)
    }
}

impl<S> Clone for DispatchIterator<'_, S> {
    fn clone(&self) -> Self {
        Self {
            emission: self.emission,
            current: Rc::clone(&self.current),
            start: Rc::clone(&self.start),
        }
    }
}

impl<S> PartialEq for DispatchIterator<'_, S> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.emission, other.emission) && Rc::ptr_eq(&self.current, &other.current)
    }
}

impl<S> Eq for DispatchIterator<'_, S> {}

impl<S> fmt::Debug for DispatchIterator<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchIterator")
            .field("emission", &self.emission)
            .field("at_start", &self.at_start())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::EventHub;

    fn hub_with(values: &[u32]) -> (EventHub<u32>, Vec<Rc<CallbackLink<u32>>>) {
        let hub = EventHub::new();
        let links: Vec<_> = values.iter().map(|v| CallbackLink::new(*v)).collect();
        for link in &links {
            hub.connect(link, false);
        }
        (hub, links)
    }

    fn walk(hub: &EventHub<u32>, emission: &EmissionState) -> Vec<u32> {
        let end = DispatchIterator::new(emission, hub.sentinel());
        let mut cursor = end.clone();
        let mut seen = Vec::new();
        cursor.advance();
        while cursor != end {
            if let Some(v) = cursor.callable_slot() {
                seen.push(*v);
            }
            cursor.advance();
        }
        seen
    }

    #[test]
    fn test_begin_equals_end_until_first_advance() {
        let (hub, _links) = hub_with(&[1]);
        let emission = EmissionState::new();
        let end = DispatchIterator::new(&emission, hub.sentinel());
        let mut cursor = end.clone();
        assert!(cursor == end);
        cursor.advance();
        assert!(cursor != end);
        assert!(!emission.is_restarting());
    }

    #[test]
    fn test_walk_visits_in_connection_order() {
        let (hub, _links) = hub_with(&[1, 2, 3]);
        assert_eq!(walk(&hub, &EmissionState::new()), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_ring_terminates_immediately() {
        let (hub, _links) = hub_with(&[]);
        assert!(walk(&hub, &EmissionState::new()).is_empty());
    }

    #[test]
    fn test_cursor_steps_off_removed_node() {
        let (hub, links) = hub_with(&[1, 2, 3]);
        let emission = EmissionState::new();
        let end = DispatchIterator::new(&emission, hub.sentinel());
        let mut cursor = end.clone();
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.callable_slot(), Some(&2));
        hub.disconnect_equal(false, |l| l.slot() == Some(&2));
        drop(links);
        assert_eq!(cursor.callable_slot(), None);
        cursor.advance();
        assert_eq!(cursor.callable_slot(), Some(&3));
    }

    #[test]
    fn test_cursor_skips_nodes_removed_ahead() {
        let (hub, _links) = hub_with(&[1, 2, 3, 4]);
        let emission = EmissionState::new();
        let end = DispatchIterator::new(&emission, hub.sentinel());
        let mut cursor = end.clone();
        cursor.advance();
        hub.disconnect_equal(false, |l| l.slot() == Some(&2));
        hub.disconnect_equal(false, |l| l.slot() == Some(&3));
        cursor.advance();
        assert_eq!(cursor.callable_slot(), Some(&4));
    }

    #[test]
    fn test_stop_forces_end() {
        let (hub, _links) = hub_with(&[1, 2, 3]);
        let emission = EmissionState::new();
        let end = DispatchIterator::new(&emission, hub.sentinel());
        let mut cursor = end.clone();
        cursor.advance();
        emission.stop();
        cursor.advance();
        assert!(cursor == end);
    }

    #[test]
    fn test_cursors_of_different_emissions_differ() {
        let (hub, _links) = hub_with(&[1]);
        let a = EmissionState::new();
        let b = EmissionState::new();
        assert!(DispatchIterator::new(&a, hub.sentinel()) != DispatchIterator::new(&b, hub.sentinel()));
    }

    #[test]
    fn test_restart_rewinds_to_first_link() {
        let (hub, _links) = hub_with(&[1, 2]);
        let emission = EmissionState::new();
        let end = DispatchIterator::new(&emission, hub.sentinel());
        let mut cursor = end.clone();
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.callable_slot(), Some(&2));
        emission.restart();
        cursor.advance();
        assert_eq!(cursor.callable_slot(), Some(&1));
    }
}
