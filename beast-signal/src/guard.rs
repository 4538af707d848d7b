//! Emitter lifetime protection across an emission.

use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

/// Implemented by emitters that fire an event from their own teardown.
pub trait Finalize {
    /// True once the object has entered its `Drop`.
    fn finalizing(&self) -> bool;
}

/// How an event protects its emitter while observers run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardMode {
    /// Hold a strong reference for the whole emission.
    #[default]
    Retain,
    /// The emitter is already being torn down; check that instead of
    /// re-referencing it.
    Finalization,
}

/// Keeps the emitter reachable for the duration of one emission.
pub enum ScopeGuard<'a, E> {
    Retained(Rc<E>),
    Finalizing {
        emitter: &'a E,
        finalizing: fn(&E) -> bool,
    },
}

impl<'a, E> ScopeGuard<'a, E> {
    /// Take a strong reference; `None` if the emitter is already gone.
    pub fn retain(emitter: &Weak<E>) -> Option<Self> {
        emitter.upgrade().map(ScopeGuard::Retained)
    }

    /// Guard for an emission fired from the emitter's own teardown.
    pub fn finalizing(emitter: &'a E) -> Self
    where
        E: Finalize,
    {
        debug_assert!(
            emitter.finalizing(),
            "finalization event fired outside of teardown"
        );
        ScopeGuard::Finalizing {
            emitter,
            finalizing: E::finalizing,
        }
    }

    pub fn mode(&self) -> GuardMode {
        match self {
            ScopeGuard::Retained(_) => GuardMode::Retain,
            ScopeGuard::Finalizing { .. } => GuardMode::Finalization,
        }
    }
}

impl<E> Deref for ScopeGuard<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        match self {
            ScopeGuard::Retained(emitter) => emitter,
            ScopeGuard::Finalizing { emitter, .. } => emitter,
        }
    }
}

impl<E> Drop for ScopeGuard<'_, E> {
    fn drop(&mut self) {
        if let ScopeGuard::Finalizing {
            emitter,
            finalizing,
        } = *self
        {
            debug_assert!(
                finalizing(emitter),
                "emitter left finalization during its finalization event"
            );
        }
    }
}

impl<E> fmt::Debug for ScopeGuard<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeGuard").field(&self.mode()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Object {
        finalizing: Cell<bool>,
    }

    impl Finalize for Object {
        fn finalizing(&self) -> bool {
            self.finalizing.get()
        }
    }

    #[test]
    fn test_retain_holds_strong_reference() {
        let object = Rc::new(Object {
            finalizing: Cell::new(false),
        });
        let weak = Rc::downgrade(&object);
        let guard = ScopeGuard::retain(&weak).unwrap();
        assert_eq!(Rc::strong_count(&object), 2);
        drop(object);
        assert!(weak.upgrade().is_some());
        assert!(!guard.finalizing.get());
        drop(guard);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_retain_of_dropped_emitter() {
        let weak = Rc::downgrade(&Rc::new(Object {
            finalizing: Cell::new(false),
        }));
        assert!(ScopeGuard::retain(&weak).is_none());
    }

    #[test]
    fn test_finalizing_takes_no_reference() {
        let object = Rc::new(Object {
            finalizing: Cell::new(true),
        });
        let guard = ScopeGuard::finalizing(&*object);
        assert_eq!(guard.mode(), GuardMode::Finalization);
        assert_eq!(Rc::strong_count(&object), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "outside of teardown")]
    fn test_finalizing_requires_teardown() {
        let object = Object {
            finalizing: Cell::new(false),
        };
        let _guard = ScopeGuard::finalizing(&object);
    }
}
