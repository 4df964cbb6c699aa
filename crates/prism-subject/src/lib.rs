#![forbid(unsafe_code)]

//! Named-signal observer dispatch for the Prism image-analysis application.
//!
//! Every long-lived application object (a raster element, a spatial view, an
//! animation controller) owns a [`Subject`] and publishes state changes
//! through it as named signals. Interested code subscribes a [`Slot`] — an
//! observer object plus one of its handler functions — to a signal name and
//! receives each matching notification together with a type-checked
//! [`Payload`].
//!
//! The pieces:
//!
//! - [`Subject`] / [`Publisher`]: the publishing side. `Publisher` is the
//!   trait objects implement by exposing their owned `Subject`; it offers
//!   attach/detach but not notify, which stays with the owner.
//! - [`Slot`]: a weak observer binding. Attaching never extends the
//!   observer's lifetime.
//! - [`SafeSlot`] / [`SlotInvalidator`]: automatic detach. Dropping the
//!   invalidator token disarms its slots without any call back into the
//!   subject.
//! - [`Signal`]: a slot that forwards notifications to another subject,
//!   optionally under a new name.
//! - [`Payload`]: a cheaply clonable type-erased value; reading it as the
//!   wrong type yields a [`PayloadError`] instead of garbage.
//!
//! Dispatch is single-threaded and fully reentrant: handlers may attach,
//! detach (including themselves), and notify on the subject that is
//! currently notifying them.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use prism_subject::{Observer, Payload, Slot, SlotResult, Subject};
//!
//! struct Counter {
//!     hits: Cell<u32>,
//! }
//!
//! impl Observer for Counter {}
//!
//! impl Counter {
//!     fn on_frame(&self, _subject: &Subject, _signal: &str, payload: &Payload) -> SlotResult {
//!         let frame: &u32 = payload.get()?;
//!         self.hits.set(self.hits.get() + frame);
//!         Ok(())
//!     }
//! }
//!
//! let subject = Subject::new();
//! let counter = Rc::new(Counter { hits: Cell::new(0) });
//!
//! assert!(subject.attach("FrameLoaded", Slot::new(&counter, Counter::on_frame)));
//! subject.notify("FrameLoaded", &Payload::new(3u32));
//! assert_eq!(counter.hits.get(), 3);
//! ```

pub mod payload;
mod registry;
pub mod safe_slot;
pub mod signal;
pub mod slot;
pub mod subject;

pub use payload::{Payload, PayloadError};
pub use safe_slot::{SafeSlot, SlotInvalidator};
pub use signal::Signal;
pub use slot::{Observer, Slot, SlotHandler, SlotResult};
pub use subject::{Publisher, SignalBlocker, SignalEnabler, Subject, WeakSubject};
