#![forbid(unsafe_code)]

//! Bound, type-erased subscriber callbacks.
//!
//! A [`Slot`] binds an observer object (held as a `Weak<T>`) to one of its
//! handler functions and erases both behind a uniform interface so the
//! registry can store, compare, and invoke slots for any observer type.
//!
//! Two slots are equal when they bind the same target object (pointer
//! identity) and the same handler function. Equality is what `attach` uses to
//! reject duplicates and what `detach` uses to find the entry to remove, so
//! an observer can detach itself by constructing a fresh slot with the same
//! arguments it attached with.
//!
//! # Invariants
//!
//! 1. An empty slot (`Slot::default()`) is equal only to other empty slots
//!    and invoking it is a no-op.
//! 2. Invoking a slot whose target has been dropped is a no-op, never a
//!    dangling call.
//! 3. Cloning a slot preserves equality with the original.
//!
//! # Failure Modes
//!
//! - Handler returns [`PayloadError`]: propagated to the dispatcher, which
//!   logs it and continues with the next slot.
//! - Target dropped between attach and notify: invocation silently skips.
//!
//! Handlers must be plain `fn` pointers, not closures: the fn pointer is the
//! slot's method identity, and two closures are never comparable. Observers
//! that need state reach it through `&self` (use `Cell`/`RefCell` fields for
//! mutation, as dispatch may re-enter).

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::payload::{Payload, PayloadError};
use crate::subject::Subject;

/// Result of one slot invocation.
pub type SlotResult = Result<(), PayloadError>;

/// Signature every slot handler must have.
///
/// Arguments are the notifying subject, the signal name as originally
/// published (wildcard subscribers see the real name, not `"Modified"`), and
/// the payload.
///
/// Slot identity treats the handler's function address as its method
/// identity. Rust does not guarantee a stable address per `fn` item: the
/// compiler may merge functions with identical bodies or duplicate a generic
/// instantiation across codegen units, so two handlers with the same body can
/// compare equal, and the same handler can in principle compare unequal
/// across crate boundaries. Keep handlers that must stay distinct
/// structurally distinct, and detach with a slot built in the same crate that
/// attached it.
pub type SlotHandler<T> = fn(&T, &Subject, &str, &Payload) -> SlotResult;

/// Optional lifecycle hooks for slot targets.
///
/// The registry calls [`attached`](Observer::attached) right after a slot on
/// this observer is registered and [`detached`](Observer::detached) when it
/// is removed. The defaults do nothing; most observers never override them.
/// A hook may itself attach, detach, or notify.
///
/// An `Err` from a hook is logged by the subject and otherwise ignored; it
/// never undoes the attach or detach that triggered it.
pub trait Observer {
    /// Called after a slot bound to this observer is attached.
    fn attached(&self, _subject: &Subject, _signal: &str, _slot: &Slot) -> SlotResult {
        Ok(())
    }

    /// Called after a slot bound to this observer is detached.
    fn detached(&self, _subject: &Subject, _signal: &str, _slot: &Slot) -> SlotResult {
        Ok(())
    }
}

/// Type-erasure seam between the registry and concrete observer types.
///
/// `SlotValue<T>` implements this for ordinary observer bindings; the
/// forwarding `Signal` supplies its own implementation.
pub(crate) trait SlotWrapper {
    /// Invoke the bound handler. Must be a no-op if the target is gone.
    fn invoke(&self, subject: &Subject, signal: &str, payload: &Payload) -> SlotResult;

    /// Structural equality against another wrapper of any concrete type.
    fn matches(&self, other: &dyn SlotWrapper) -> bool;

    /// Downcast support for [`matches`](SlotWrapper::matches).
    fn as_any(&self) -> &dyn Any;

    /// Whether the bound target is still alive.
    fn is_bound(&self) -> bool;

    /// Run the target's [`Observer::attached`] hook, if the target is alive.
    fn call_attached(&self, subject: &Subject, signal: &str, slot: &Slot) -> SlotResult;

    /// Run the target's [`Observer::detached`] hook, if the target is alive.
    fn call_detached(&self, subject: &Subject, signal: &str, slot: &Slot) -> SlotResult;
}

struct SlotValue<T: Observer + 'static> {
    target: Weak<T>,
    handler: SlotHandler<T>,
}

impl<T: Observer + 'static> SlotWrapper for SlotValue<T> {
    fn invoke(&self, subject: &Subject, signal: &str, payload: &Payload) -> SlotResult {
        match self.target.upgrade() {
            Some(target) => (self.handler)(&target, subject, signal, payload),
            None => Ok(()),
        }
    }

    fn matches(&self, other: &dyn SlotWrapper) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|rhs| {
            Weak::ptr_eq(&self.target, &rhs.target)
                && self.handler as usize == rhs.handler as usize
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_bound(&self) -> bool {
        self.target.strong_count() > 0
    }

    fn call_attached(&self, subject: &Subject, signal: &str, slot: &Slot) -> SlotResult {
        match self.target.upgrade() {
            Some(target) => target.attached(subject, signal, slot),
            None => Ok(()),
        }
    }

    fn call_detached(&self, subject: &Subject, signal: &str, slot: &Slot) -> SlotResult {
        match self.target.upgrade() {
            Some(target) => target.detached(subject, signal, slot),
            None => Ok(()),
        }
    }
}

/// A bound subscriber callback.
///
/// Created with [`Slot::new`] from an `Rc` observer and a handler function.
/// The slot holds only a `Weak` reference: attaching never extends the
/// observer's lifetime, and a dropped observer leaves a harmless inert slot
/// behind (swept by the registry on the next dispatch).
#[derive(Clone, Default)]
pub struct Slot {
    wrapper: Option<Rc<dyn SlotWrapper>>,
}

impl Slot {
    /// Bind `handler` to `target`.
    #[must_use]
    pub fn new<T: Observer + 'static>(target: &Rc<T>, handler: SlotHandler<T>) -> Self {
        Self {
            wrapper: Some(Rc::new(SlotValue {
                target: Rc::downgrade(target),
                handler,
            })),
        }
    }

    pub(crate) fn from_wrapper(wrapper: Rc<dyn SlotWrapper>) -> Self {
        Self {
            wrapper: Some(wrapper),
        }
    }

    /// Whether the slot was constructed with a binding. Empty slots are
    /// rejected by `attach`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.wrapper.is_some()
    }

    /// Whether the bound target is still alive.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.wrapper.as_ref().is_some_and(|w| w.is_bound())
    }

    /// Invoke the bound handler with the publishing subject, the signal name
    /// as originally published, and the payload.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns; a [`PayloadError`] means the
    /// handler read the payload as the wrong type.
    pub fn invoke(&self, subject: &Subject, signal: &str, payload: &Payload) -> SlotResult {
        match &self.wrapper {
            Some(wrapper) => wrapper.invoke(subject, signal, payload),
            None => Ok(()),
        }
    }

    pub(crate) fn call_attached(&self, subject: &Subject, signal: &str) -> SlotResult {
        match &self.wrapper {
            Some(wrapper) => wrapper.call_attached(subject, signal, self),
            None => Ok(()),
        }
    }

    pub(crate) fn call_detached(&self, subject: &Subject, signal: &str) -> SlotResult {
        match &self.wrapper {
            Some(wrapper) => wrapper.call_detached(subject, signal, self),
            None => Ok(()),
        }
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (&self.wrapper, &other.wrapper) {
            (None, None) => true,
            (Some(lhs), Some(rhs)) => lhs.matches(rhs.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("valid", &self.is_valid())
            .field("bound", &self.is_bound())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
