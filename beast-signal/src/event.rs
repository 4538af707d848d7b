//! Typed events bound to one emitter.
//!
//! An [`Event`] owns a hub of subscriptions for one callback signature and
//! folds the observers' results through a [`Collector`]. Observers may connect
//! and disconnect (themselves included) while an emission is running:
//!
//! - an observer appended during an emission is still visited by it, as long
//!   as the cursor has not reached the end yet;
//! - an observer disconnected before the cursor reaches it is skipped;
//! - the emitter is kept alive until the emission returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::collector::{Collector, Last};
use crate::config::EventOptions;
use crate::emission::{DispatchIterator, EmissionState};
use crate::guard::{Finalize, GuardMode, ScopeGuard};
use crate::hub::{CallbackLink, EventHub};
use crate::signature::Signature;
use crate::slot::{Connection, Slot, SlotKey};

type SlotFor<E, S> = Slot<E, <S as Signature>::Args, <S as Signature>::Output>;

/// An event of emitter type `E`, callback signature `S` (a function pointer
/// type such as `fn(i32) -> bool`) and result policy `C`.
///
/// Argument types must be owned or `'static`: a signature such as `fn(&str)`
/// is generic over the borrow's lifetime and has no `emit`. Use `String`,
/// `Rc<str>` or `&'static str` instead.
pub struct Event<E, S: Signature, C = Last<<S as Signature>::Output>> {
    hub: EventHub<SlotFor<E, S>>,
    emitter: Weak<E>,
    mode: GuardMode,
    options: EventOptions,
    /// In-progress emissions, innermost last.
    emissions: RefCell<Vec<Rc<EmissionState>>>,
    collector: PhantomData<fn() -> C>,
}

/// Zero-argument event without a result.
pub type VoidEvent<E> = Event<E, fn()>;

/// Zero-argument predicate event ("did you handle this", "can this proceed").
pub type BoolEvent<E, C = Last<bool>> = Event<E, fn() -> bool, C>;

/// Pops the innermost emission when dispatch returns or unwinds.
struct EmissionFrame<'a> {
    stack: &'a RefCell<Vec<Rc<EmissionState>>>,
}

impl Drop for EmissionFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

impl<E, S, C> Event<E, S, C>
where
    E: 'static,
    S: Signature,
    S::Args: 'static,
    S::Output: 'static,
    C: Collector<S::Output>,
{
    /// Bind to `emitter` with this thread's [`EventOptions::current`].
    pub fn new(emitter: Weak<E>) -> Self {
        Self::with_options(emitter, EventOptions::current())
    }

    pub fn with_options(emitter: Weak<E>, options: EventOptions) -> Self {
        Self {
            hub: EventHub::new(),
            emitter,
            mode: GuardMode::Retain,
            options,
            emissions: RefCell::new(Vec::new()),
            collector: PhantomData,
        }
    }

    /// An event fired from the emitter's own teardown; see [`FinalizeEvent`].
    pub fn finalization(emitter: Weak<E>) -> Self {
        Self {
            mode: GuardMode::Finalization,
            ..Self::new(emitter)
        }
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub fn options(&self) -> EventOptions {
        self.options
    }

    /// Number of live subscriptions.
    pub fn handler_count(&self) -> usize {
        self.hub.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hub.is_empty()
    }

    pub fn is_emitting(&self) -> bool {
        !self.emissions.borrow().is_empty()
    }

    /// Stop the innermost running emission after the current observer.
    /// Returns false if no emission is running.
    pub fn stop_emission(&self) -> bool {
        match self.emissions.borrow().last() {
            Some(state) => {
                state.stop();
                true
            }
            None => false,
        }
    }

    /// Remove the subscription behind `connection`.
    pub fn disconnect(&self, connection: &Connection) -> bool {
        let Some(with_emitter) = connection.with_emitter() else {
            return false;
        };
        self.hub
            .disconnect_equal(with_emitter, |link| connection.refers_to(link))
            == 1
    }

    /// Fire with an argument tuple. The emitter is retained for the duration.
    pub fn emit_args(&self, args: S::Args) -> C::Output {
        debug_assert_eq!(
            self.mode,
            GuardMode::Retain,
            "finalization events are fired with an explicit emitter"
        );
        match ScopeGuard::retain(&self.emitter) {
            Some(guard) => self.dispatch(&guard, &args),
            None => {
                log::warn!(target: "signal::emit", "emitter already dropped; emission skipped");
                C::default().finish()
            }
        }
    }

    /// Fire from the emitter's teardown, without re-referencing it.
    pub fn emit_args_finalizing(&self, emitter: &E, args: S::Args) -> C::Output
    where
        E: Finalize,
    {
        debug_assert_eq!(
            self.mode,
            GuardMode::Finalization,
            "only finalization events are fired during teardown"
        );
        let guard = ScopeGuard::finalizing(emitter);
        self.dispatch(&guard, &args)
    }

    fn connect_slot(&self, slot: SlotFor<E, S>, with_emitter: bool) -> Connection {
        let link = CallbackLink::new(slot);
        self.hub.connect(&link, with_emitter);
        Connection::new(&link)
    }

    fn disconnect_key(&self, pattern: &SlotKey, with_emitter: bool) -> bool {
        self.hub.disconnect_equal(with_emitter, |link| {
            link.slot()
                .map_or(false, |slot| slot.key().same_subscription(pattern))
        }) == 1
    }

    fn dispatch(&self, emitter: &E, args: &S::Args) -> C::Output {
        let mut collector = C::default();
        let depth = self.emissions.borrow().len();
        if depth == self.options.warn_emission_depth {
            log::warn!(target: "signal::emit", "event re-entered {} levels deep", depth);
        }
        if self.options.log_emissions {
            log::trace!(
                target: "signal::emit",
                "emission at depth {} over {} handlers",
                depth,
                self.hub.len()
            );
        }

        let state = Rc::new(EmissionState::new());
        self.emissions.borrow_mut().push(Rc::clone(&state));
        let _frame = EmissionFrame {
            stack: &self.emissions,
        };

        let end = DispatchIterator::new(&state, self.hub.sentinel());
        let mut cursor = end.clone();
        cursor.advance();
        while cursor != end {
            if let Some(slot) = cursor.callable_slot() {
                if collector.collect(slot.invoke(emitter, args)).is_break() {
                    state.stop();
                }
            }
            cursor.advance();
        }
        collector.finish()
    }
}

macro_rules! event_arity {
    ($($arg:ident $val:ident),*) => {
        impl<E, R, C, $($arg,)*> Event<E, fn($($arg),*) -> R, C>
        where
            E: 'static,
            R: 'static,
            C: Collector<R>,
            $($arg: Clone + 'static,)*
        {
            /// Invoke every live observer in connection order.
            pub fn emit(&self, $($val: $arg),*) -> C::Output {
                self.emit_args(($($val,)*))
            }

            /// Fire a finalization event from the emitter's `Drop`.
            pub fn emit_finalizing(&self, emitter: &E, $($val: $arg),*) -> C::Output
            where
                E: Finalize,
            {
                self.emit_args_finalizing(emitter, ($($val,)*))
            }

            pub fn connect<F>(&self, handler: F) -> Connection
            where
                F: Fn($($arg),*) -> R + 'static,
            {
                let slot = Slot::new(SlotKey::Closure, move |_: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    handler($($val.clone()),*)
                });
                self.connect_slot(slot, false)
            }

            /// Connect an observer that also receives the emitter.
            pub fn connect_with_emitter<F>(&self, handler: F) -> Connection
            where
                F: Fn(&E, $($arg),*) -> R + 'static,
            {
                let slot = Slot::new(SlotKey::Closure, move |emitter: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    handler(emitter, $($val.clone()),*)
                });
                self.connect_slot(slot, true)
            }

            pub fn connect_fn(&self, function: fn($($arg),*) -> R) -> Connection {
                let key = SlotKey::Function(function as usize);
                let slot = Slot::new(key, move |_: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    function($($val.clone()),*)
                });
                self.connect_slot(slot, false)
            }

            pub fn connect_fn_with_emitter(&self, function: fn(&E, $($arg),*) -> R) -> Connection {
                let key = SlotKey::Function(function as usize);
                let slot = Slot::new(key, move |emitter: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    function(emitter, $($val.clone()),*)
                });
                self.connect_slot(slot, true)
            }

            /// Remove the first subscription of `function`.
            pub fn disconnect_fn(&self, function: fn($($arg),*) -> R) -> bool {
                self.disconnect_key(&SlotKey::Function(function as usize), false)
            }

            pub fn disconnect_fn_with_emitter(&self, function: fn(&E, $($arg),*) -> R) -> bool {
                self.disconnect_key(&SlotKey::Function(function as usize), true)
            }

            /// Connect `method` bound to `instance`. The subscription keeps the
            /// instance alive until it is disconnected.
            pub fn connect_method<T: 'static>(
                &self,
                instance: &Rc<T>,
                method: fn(&T, $($arg),*) -> R,
            ) -> Connection {
                let key = SlotKey::Method {
                    instance: Rc::as_ptr(instance) as *const () as usize,
                    method: method as usize,
                };
                let target = Rc::clone(instance);
                let slot = Slot::new(key, move |_: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    method(&target, $($val.clone()),*)
                });
                self.connect_slot(slot, false)
            }

            pub fn connect_method_with_emitter<T: 'static>(
                &self,
                instance: &Rc<T>,
                method: fn(&T, &E, $($arg),*) -> R,
            ) -> Connection {
                let key = SlotKey::Method {
                    instance: Rc::as_ptr(instance) as *const () as usize,
                    method: method as usize,
                };
                let target = Rc::clone(instance);
                let slot = Slot::new(key, move |emitter: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    method(&target, emitter, $($val.clone()),*)
                });
                self.connect_slot(slot, true)
            }

            pub fn disconnect_method<T>(&self, instance: &Rc<T>, method: fn(&T, $($arg),*) -> R) -> bool {
                let key = SlotKey::Method {
                    instance: Rc::as_ptr(instance) as *const () as usize,
                    method: method as usize,
                };
                self.disconnect_key(&key, false)
            }

            pub fn disconnect_method_with_emitter<T>(
                &self,
                instance: &Rc<T>,
                method: fn(&T, &E, $($arg),*) -> R,
            ) -> bool {
                let key = SlotKey::Method {
                    instance: Rc::as_ptr(instance) as *const () as usize,
                    method: method as usize,
                };
                self.disconnect_key(&key, true)
            }

            /// Connect `function`, passing `data` after the call arguments.
            pub fn connect_with_data<D: PartialEq + 'static>(
                &self,
                function: fn($($arg,)* &D) -> R,
                data: D,
            ) -> Connection {
                let data = Rc::new(data);
                let key = SlotKey::data(function as usize, Rc::clone(&data));
                let slot = Slot::new(key, move |_: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    function($($val.clone(),)* &data)
                });
                self.connect_slot(slot, false)
            }

            /// Remove the first subscription of `function` bound to data equal to `data`.
            pub fn disconnect_with_data<D: PartialEq + 'static>(
                &self,
                function: fn($($arg,)* &D) -> R,
                data: D,
            ) -> bool {
                self.disconnect_key(&SlotKey::data(function as usize, Rc::new(data)), false)
            }

            pub fn connect_with_data_with_emitter<D: PartialEq + 'static>(
                &self,
                function: fn(&E, $($arg,)* &D) -> R,
                data: D,
            ) -> Connection {
                let data = Rc::new(data);
                let key = SlotKey::data(function as usize, Rc::clone(&data));
                let slot = Slot::new(key, move |emitter: &E, args: &($($arg,)*)| {
                    let ($($val,)*) = args;
                    function(emitter, $($val.clone(),)* &data)
                });
                self.connect_slot(slot, true)
            }

            pub fn disconnect_with_data_with_emitter<D: PartialEq + 'static>(
                &self,
                function: fn(&E, $($arg,)* &D) -> R,
                data: D,
            ) -> bool {
                self.disconnect_key(&SlotKey::data(function as usize, Rc::new(data)), true)
            }
        }
    };
}

event_arity!();
event_arity!(A1 a1);
event_arity!(A1 a1, A2 a2);
event_arity!(A1 a1, A2 a2, A3 a3);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12, A13 a13);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14, A15 a15);
event_arity!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10, A11 a11, A12 a12, A13 a13, A14 a14, A15 a15, A16 a16);

impl<E, C> Event<E, fn(), C>
where
    E: 'static,
    C: Collector<()>,
{
    /// A void event with one of the emitter's own handlers already connected.
    pub fn with_handler(emitter: Weak<E>, handler: fn(&E)) -> Self {
        let event = Self::new(emitter);
        event.connect_fn_with_emitter(handler);
        event
    }
}

impl<E, S: Signature, C> fmt::Debug for Event<E, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handlers", &self.hub.len())
            .field("mode", &self.mode)
            .field("emitting", &!self.emissions.borrow().is_empty())
            .finish()
    }
}

/// Zero-argument event fired exactly once, from the emitter's own `Drop`.
///
/// The emitter is passed explicitly since it can no longer be upgraded, and
/// must report [`Finalize::finalizing`] for the whole emission.
pub struct FinalizeEvent<E> {
    event: Event<E, fn()>,
    fired: Cell<bool>,
}

impl<E: 'static> FinalizeEvent<E> {
    pub fn new(emitter: Weak<E>) -> Self {
        Self {
            event: Event::finalization(emitter),
            fired: Cell::new(false),
        }
    }

    /// Connect `handler` (typically the emitter's own teardown hook) up front.
    pub fn with_handler(emitter: Weak<E>, handler: fn(&E)) -> Self {
        let finalize = Self::new(emitter);
        finalize.event.connect_fn_with_emitter(handler);
        finalize
    }

    pub fn emit(&self, emitter: &E)
    where
        E: Finalize,
    {
        let already = self.fired.replace(true);
        debug_assert!(!already, "finalize event fired twice");
        self.event.emit_finalizing(emitter);
    }

    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}

impl<E> Deref for FinalizeEvent<E> {
    type Target = Event<E, fn()>;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

impl<E> fmt::Debug for FinalizeEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizeEvent")
            .field("event", &self.event)
            .field("fired", &self.fired.get())
            .finish()
    }
}
