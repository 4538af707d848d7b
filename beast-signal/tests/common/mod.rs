#![allow(dead_code)]
//! Shared emitters for beast-signal integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use beast_signal::{Event, Finalize, FinalizeEvent, VoidEvent};

/// Ordered record of what observers did.
#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// A model object with a value-change event and a teardown event.
pub struct Widget {
    pub name: String,
    pub changed: Event<Widget, fn(i32) -> i32>,
    pub activated: VoidEvent<Widget>,
    pub destroyed: FinalizeEvent<Widget>,
    finalizing: Cell<bool>,
}

impl Finalize for Widget {
    fn finalizing(&self) -> bool {
        self.finalizing.get()
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        self.finalizing.set(true);
        self.destroyed.emit(self);
    }
}

pub fn widget(name: &str) -> Rc<Widget> {
    Rc::new_cyclic(|weak| Widget {
        name: name.to_string(),
        changed: Event::new(weak.clone()),
        activated: Event::new(weak.clone()),
        destroyed: FinalizeEvent::new(weak.clone()),
        finalizing: Cell::new(false),
    })
}

/// Connect an observer that records `label` and returns `value`.
pub fn record(widget: &Widget, trace: &Trace, label: &'static str, value: i32) {
    let trace = trace.clone();
    widget.changed.connect(move |_| {
        trace.push(label);
        value
    });
}
