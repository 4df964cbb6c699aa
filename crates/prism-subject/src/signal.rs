#![forbid(unsafe_code)]

//! Forwarding slots: re-publish one subject's event on another subject.
//!
//! A [`Signal`] is attached to subject A like any slot, but its invocation
//! calls `notify` on subject B instead of a handler — either under a fixed
//! replacement name ([`Signal::renamed`]) or under the original incoming
//! name ([`Signal::new`]). Pipelines compose this way without A and B
//! knowing about each other beyond the relay itself.
//!
//! The relay holds the target subject weakly; if B is dropped first, the
//! relay goes inert and is swept like any dead slot.

use std::any::Any;
use std::rc::Rc;

use crate::payload::Payload;
use crate::safe_slot::SafeSlot;
use crate::slot::{Slot, SlotResult, SlotWrapper};
use crate::subject::{Subject, WeakSubject};

/// A slot that re-publishes notifications on another subject.
#[derive(Clone)]
pub struct Signal {
    slot: Slot,
}

impl Signal {
    /// Forward events to `target` under their original signal names.
    #[must_use]
    pub fn new(target: &Subject) -> Self {
        Self::build(target, None)
    }

    /// Forward events to `target`, renaming every one to `signal`.
    #[must_use]
    pub fn renamed(target: &Subject, signal: impl Into<String>) -> Self {
        Self::build(target, Some(signal.into()))
    }

    fn build(target: &Subject, rename: Option<String>) -> Self {
        Self {
            slot: Slot::from_wrapper(Rc::new(SignalValue {
                target: target.downgrade(),
                rename,
            })),
        }
    }

    /// The underlying slot binding, e.g. for equality checks.
    #[must_use]
    pub fn slot(&self) -> &Slot {
        &self.slot
    }
}

impl From<Signal> for Slot {
    fn from(signal: Signal) -> Self {
        signal.slot
    }
}

impl From<Signal> for SafeSlot {
    fn from(signal: Signal) -> Self {
        SafeSlot::from(signal.slot)
    }
}

struct SignalValue {
    target: WeakSubject,
    rename: Option<String>,
}

impl SlotWrapper for SignalValue {
    fn invoke(&self, _subject: &Subject, signal: &str, payload: &Payload) -> SlotResult {
        if let Some(target) = self.target.upgrade() {
            target.notify(self.rename.as_deref().unwrap_or(signal), payload);
        }
        Ok(())
    }

    fn matches(&self, other: &dyn SlotWrapper) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|rhs| self.target.ptr_eq(&rhs.target) && self.rename == rhs.rename)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_bound(&self) -> bool {
        self.target.upgrade().is_some()
    }

    fn call_attached(&self, _subject: &Subject, _signal: &str, _slot: &Slot) -> SlotResult {
        Ok(())
    }

    fn call_detached(&self, _subject: &Subject, _signal: &str, _slot: &Slot) -> SlotResult {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
