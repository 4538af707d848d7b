//! # beast-signal
//!
//! Signal/slot runtime used by widgets and model objects to publish state
//! changes. Any number of observers of any callback signature can subscribe,
//! unsubscribe and react, including while an emission is in progress.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use beast_signal::{Event, Until0};
//!
//! struct Track {
//!     renamed: Event<Track, fn(String)>,
//!     can_delete: Event<Track, fn() -> bool, Until0<bool>>,
//! }
//!
//! let track = Rc::new_cyclic(|weak| Track {
//!     renamed: Event::new(weak.clone()),
//!     can_delete: Event::new(weak.clone()),
//! });
//!
//! let conn = track.renamed.connect(|name| log::info!("renamed to {}", name));
//! track.can_delete.connect(|| true);
//!
//! track.renamed.emit("Bass".into());
//! assert!(track.can_delete.emit());
//! track.renamed.disconnect(&conn);
//! ```
//!
//! ## Module Overview
//!
//! - [`hub`]: `CallbackLink` and `EventHub`, the circular subscriber ring
//!   with lazy removal
//! - [`emission`]: `EmissionState` and `DispatchIterator`, the cursor that
//!   survives observers mutating the ring
//! - [`collector`]: result policies `Last`, `Sum`, `While0`, `Until0`
//! - [`guard`]: `ScopeGuard`, keeping the emitter alive (or checking its
//!   teardown) across an emission
//! - [`signature`]: type-level decomposition of `fn(A1, ..., An) -> R`
//! - [`slot`]: callable shapes and the `Connection` handle
//! - [`event`]: `Event`, `VoidEvent`, `BoolEvent`, `FinalizeEvent`
//! - [`config`]: TOML dispatch settings (embedded + user override)
//!
//! Emissions are single-threaded and synchronous; nothing here is `Send`.

pub mod collector;
pub mod config;
pub mod emission;
pub mod event;
pub mod guard;
pub mod hub;
pub mod signature;
pub mod slot;

pub use collector::{Accumulate, Collector, DefaultCollector, Last, Sum, Truth, Until0, While0};
pub use config::{Config, EventOptions};
pub use event::{BoolEvent, Event, FinalizeEvent, VoidEvent};
pub use guard::{Finalize, GuardMode, ScopeGuard};
pub use signature::{Argument, Signature};
pub use slot::Connection;
