//! Callable shapes stored in hub links, and the caller-held connection handle.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::hub::CallbackLink;

/// Identity of a subscription, used to find it again for disconnection.
#[derive(Clone)]
pub enum SlotKey {
    /// A closure; only its own connection handle matches it.
    Closure,
    /// A plain function, compared by address.
    Function(usize),
    /// A method bound to an instance, compared by instance and method address.
    Method { instance: usize, method: usize },
    /// A function with bound trailing data, compared by address and data.
    Data {
        function: usize,
        data: Rc<dyn Any>,
        eq: fn(&dyn Any, &dyn Any) -> bool,
    },
}

impl SlotKey {
    pub fn data<D: PartialEq + 'static>(function: usize, data: Rc<D>) -> Self {
        SlotKey::Data {
            function,
            data,
            eq: data_eq::<D>,
        }
    }

    /// Whether both keys denote the same subscription.
    pub fn same_subscription(&self, other: &SlotKey) -> bool {
        match (self, other) {
            (SlotKey::Function(a), SlotKey::Function(b)) => a == b,
            (
                SlotKey::Method { instance, method },
                SlotKey::Method {
                    instance: other_instance,
                    method: other_method,
                },
            ) => instance == other_instance && method == other_method,
            (
                SlotKey::Data { function, data, eq },
                SlotKey::Data {
                    function: other_function,
                    data: other_data,
                    ..
                },
            ) => function == other_function && eq(&**data, &**other_data),
            _ => false,
        }
    }
}

fn data_eq<D: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<D>(), b.downcast_ref::<D>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Closure => f.write_str("Closure"),
            SlotKey::Function(addr) => write!(f, "Function({:#x})", addr),
            SlotKey::Method { instance, method } => {
                write!(f, "Method {{ instance: {:#x}, method: {:#x} }}", instance, method)
            }
            SlotKey::Data { function, .. } => write!(f, "Data {{ function: {:#x} }}", function),
        }
    }
}

/// A connected callable: its identity plus a uniform invoker.
///
/// Every shape is stored as `Fn(&E, &A) -> R`; shapes that do not take the
/// emitter ignore it, and argument tuples are cloned apart per observer.
pub struct Slot<E, A, R> {
    key: SlotKey,
    invoke: Box<dyn Fn(&E, &A) -> R>,
}

impl<E, A, R> Slot<E, A, R> {
    pub fn new<F>(key: SlotKey, invoke: F) -> Self
    where
        F: Fn(&E, &A) -> R + 'static,
    {
        Self {
            key,
            invoke: Box::new(invoke),
        }
    }

    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    pub fn invoke(&self, emitter: &E, args: &A) -> R {
        (self.invoke)(emitter, args)
    }
}

impl<E, A, R> fmt::Debug for Slot<E, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("key", &self.key).finish()
    }
}

/// Type-erased view of a link, enough for a handle to query and identify it.
pub(crate) trait LinkState {
    fn is_callable(&self) -> bool;
    fn with_emitter(&self) -> bool;
    fn disconnect(&self) -> bool;
}

impl<S> LinkState for CallbackLink<S> {
    fn is_callable(&self) -> bool {
        CallbackLink::is_callable(self)
    }

    fn with_emitter(&self) -> bool {
        CallbackLink::with_emitter(self)
    }

    fn disconnect(&self) -> bool {
        CallbackLink::disconnect(self)
    }
}

/// Caller-held handle to one subscription.
///
/// The handle does not keep the subscription alive: once it is disconnected
/// and no emission stands on it, it is gone and the handle reports so.
#[derive(Clone)]
pub struct Connection {
    link: Weak<dyn LinkState>,
}

impl Connection {
    pub(crate) fn new<S: 'static>(link: &Rc<CallbackLink<S>>) -> Self {
        let link: Rc<dyn LinkState> = Rc::clone(link) as Rc<dyn LinkState>;
        Self {
            link: Rc::downgrade(&link),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link
            .upgrade()
            .map_or(false, |link| link.is_callable())
    }

    /// Remove the subscription from its event. Safe to call from inside an
    /// emission, including from the handler itself.
    pub fn disconnect(&self) -> bool {
        self.link.upgrade().map_or(false, |link| link.disconnect())
    }

    /// Whether this handle refers to `link`.
    pub(crate) fn refers_to<S>(&self, link: &CallbackLink<S>) -> bool {
        self.addr() == link as *const CallbackLink<S> as *const () as usize
    }

    pub(crate) fn with_emitter(&self) -> Option<bool> {
        self.link.upgrade().map(|link| link.with_emitter())
    }

    fn addr(&self) -> usize {
        self.link.as_ptr() as *const () as usize
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Connection {}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::EventHub;

    fn double(x: i32) -> i32 {
        x * 2
    }

    fn triple(x: i32) -> i32 {
        x * 3
    }

    #[test]
    fn test_function_keys_compare_by_address() {
        let a = SlotKey::Function(double as fn(i32) -> i32 as usize);
        let b = SlotKey::Function(double as fn(i32) -> i32 as usize);
        let c = SlotKey::Function(triple as fn(i32) -> i32 as usize);
        assert!(a.same_subscription(&b));
        assert!(!a.same_subscription(&c));
    }

    #[test]
    fn test_closure_keys_never_match() {
        assert!(!SlotKey::Closure.same_subscription(&SlotKey::Closure));
    }

    #[test]
    fn test_data_keys_compare_data() {
        let f = double as fn(i32) -> i32 as usize;
        let a = SlotKey::data(f, Rc::new(String::from("x")));
        let b = SlotKey::data(f, Rc::new(String::from("x")));
        let c = SlotKey::data(f, Rc::new(String::from("y")));
        let d = SlotKey::data(f, Rc::new(7u8));
        assert!(a.same_subscription(&b));
        assert!(!a.same_subscription(&c));
        assert!(!a.same_subscription(&d));
    }

    #[test]
    fn test_slot_invokes_with_tuple() {
        let slot: Slot<(), (i32, i32), i32> = Slot::new(SlotKey::Closure, |_, (a, b)| a + b);
        assert_eq!(slot.invoke(&(), &(2, 3)), 5);
    }

    #[test]
    fn test_connection_tracks_link() {
        let hub = EventHub::new();
        let link = CallbackLink::new(1u8);
        hub.connect(&link, false);
        let conn = Connection::new(&link);
        assert!(conn.is_connected());
        assert!(conn.refers_to(&link));
        assert_eq!(conn, conn.clone());
        hub.disconnect_equal(false, |l| conn.refers_to(l));
        assert!(!conn.is_connected());
        assert!(!conn.disconnect());
        drop(link);
        assert_eq!(conn.with_emitter(), None);
    }

    #[test]
    fn test_connection_disconnects_without_hub() {
        let hub = EventHub::new();
        let first = CallbackLink::new(1u8);
        let second = CallbackLink::new(2u8);
        hub.connect(&first, false);
        hub.connect(&second, true);
        let conn = Connection::new(&second);
        assert!(conn.disconnect());
        assert!(!conn.disconnect());
        assert_eq!(hub.len(), 1);
        assert!(Rc::ptr_eq(&first.next().unwrap(), hub.sentinel()));
    }
}
