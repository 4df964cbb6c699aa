#![forbid(unsafe_code)]

//! Slots that disarm themselves when a guard token dies.
//!
//! A [`SafeSlot`] wraps a [`Slot`] with an optional link to a
//! [`SlotInvalidator`] owned by the observer. Dropping the invalidator
//! disarms the slot immediately: pending and future invocations become
//! no-ops, and the registry sweeps the inert entry out of its lists during
//! the next dispatch pass. The observer never has to remember to call
//! `detach`.
//!
//! The link is a plain `Rc`/`Weak` pair. The token owns the `Rc` anchor and
//! each guarded slot holds a `Weak`; there is no back-pointer bookkeeping on
//! either side, so drop order between token, observer, and subject is
//! irrelevant.
//!
//! A token guards every slot ever constructed against it, not just the most
//! recent one. There is no replace-on-reuse: guarding a second slot with the
//! same token does not release the first, and dropping the token disarms all
//! of them at once. Call sites ported from frameworks where re-registering a
//! guard supersedes the previous registration need one token per slot to get
//! that behavior.
//!
//! # Invariants
//!
//! 1. A slot guarded by a live invalidator delivers; once the invalidator
//!    drops, the slot never delivers again.
//! 2. Equality requires the same target and handler *and* agreement on
//!    whether an active invalidator is present. Which token it is does not
//!    matter.
//! 3. A `SafeSlot` built from a plain [`Slot`] behaves exactly like that
//!    slot.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::payload::Payload;
use crate::slot::{Observer, Slot, SlotHandler, SlotResult};
use crate::subject::Subject;

/// Guard token owned by an observer; dropping it disarms every [`SafeSlot`]
/// constructed against it.
///
/// Typically embedded as a field so that observer destruction disarms its
/// subscriptions as a side effect. One token may guard several slots.
#[derive(Default)]
pub struct SlotInvalidator {
    anchor: Rc<()>,
}

impl SlotInvalidator {
    /// Create a fresh token with no guarded slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn watch(&self) -> Weak<()> {
        Rc::downgrade(&self.anchor)
    }
}

impl fmt::Debug for SlotInvalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotInvalidator")
            .field("guarded", &(Rc::weak_count(&self.anchor)))
            .finish()
    }
}

/// A [`Slot`] with an optional invalidator guard.
///
/// Everything the registry stores is a `SafeSlot`; plain slots and forwarding
/// signals convert into the unguarded form via `From`.
#[derive(Clone, Default)]
pub struct SafeSlot {
    slot: Slot,
    guard: Option<Weak<()>>,
}

impl SafeSlot {
    /// Bind `handler` to `target`, guarded by `invalidator`.
    #[must_use]
    pub fn new<T: Observer + 'static>(
        target: &Rc<T>,
        handler: SlotHandler<T>,
        invalidator: &SlotInvalidator,
    ) -> Self {
        Self::guarded(Slot::new(target, handler), invalidator)
    }

    /// Guard an existing slot with `invalidator`.
    #[must_use]
    pub fn guarded(slot: Slot, invalidator: &SlotInvalidator) -> Self {
        Self {
            slot,
            guard: Some(invalidator.watch()),
        }
    }

    /// The underlying slot binding.
    #[must_use]
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// Whether this slot is linked to an invalidator that is still alive.
    #[must_use]
    pub fn invalidator_active(&self) -> bool {
        self.guard.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    /// Whether invocation would deliver: the slot is valid and its guard, if
    /// any, is still alive.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.is_valid() && self.guard.as_ref().is_none_or(|w| w.strong_count() > 0)
    }

    /// Armed and the target is still alive. Entries failing this are dead
    /// weight and get swept by the registry.
    pub(crate) fn is_live(&self) -> bool {
        self.is_armed() && self.slot.is_bound()
    }

    /// Invoke the bound handler, or do nothing if the slot is disarmed.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`crate::PayloadError`], if any.
    pub fn invoke(&self, subject: &Subject, signal: &str, payload: &Payload) -> SlotResult {
        if self.is_armed() {
            self.slot.invoke(subject, signal, payload)
        } else {
            Ok(())
        }
    }

    pub(crate) fn call_attached(&self, subject: &Subject, signal: &str) -> SlotResult {
        if self.is_armed() {
            self.slot.call_attached(subject, signal)
        } else {
            Ok(())
        }
    }

    pub(crate) fn call_detached(&self, subject: &Subject, signal: &str) -> SlotResult {
        if self.is_armed() {
            self.slot.call_detached(subject, signal)
        } else {
            Ok(())
        }
    }
}

impl PartialEq for SafeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot && self.invalidator_active() == other.invalidator_active()
    }
}

impl From<Slot> for SafeSlot {
    fn from(slot: Slot) -> Self {
        Self { slot, guard: None }
    }
}

impl fmt::Debug for SafeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeSlot")
            .field("armed", &self.is_armed())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
