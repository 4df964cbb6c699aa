#![forbid(unsafe_code)]

//! The publisher facade: attach, detach, and notify.
//!
//! A [`Subject`] is a shared handle (`Rc` inside) to one slot registry.
//! Owning objects embed a `Subject` and implement [`Publisher`] by returning
//! it; "is a publisher" is delegation, not inheritance. External code going
//! through the `Publisher` trait can attach and detach but not notify —
//! publishing stays with the owner, which calls [`Subject::notify`] on its
//! own field.
//!
//! Two signal names are reserved:
//!
//! - [`Subject::MODIFIED`] is the wildcard fallback. Its subscribers receive
//!   every signal the subject emits (under the *original* name) except the
//!   two reserved ones.
//! - [`Subject::DELETED`] announces destruction of the owning object. It is
//!   terminal (no wildcard fan-out) and is delivered even while signals are
//!   disabled, so observers can always sever their references.
//!
//! Dropping a `Subject` notifies nothing; an owner that wants a destruction
//! signal emits [`Subject::DELETED`] itself (typically from its own `Drop`).
//!
//! # Invariants
//!
//! 1. Slots on one signal fire in attachment order, every time.
//! 2. A structurally duplicate attach is rejected; the original entry and
//!    its position survive.
//! 3. `notify` never panics out of a mis-typed subscriber; the error is
//!    logged and the remaining slots still run.
//! 4. Signal-state guards restore the flag they saw on construction, even
//!    if the subject dies first.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::payload::Payload;
use crate::registry::{self, Registry};
use crate::safe_slot::SafeSlot;

struct SubjectInner {
    registry: RefCell<Registry>,
    signals_enabled: Cell<bool>,
}

/// A named-signal publisher. Cloning yields another handle to the same
/// registry.
pub struct Subject {
    inner: Rc<SubjectInner>,
}

impl Subject {
    /// Wildcard fallback signal name. Subscribers attached here receive
    /// every non-reserved signal this subject emits.
    pub const MODIFIED: &'static str = "Modified";

    /// Terminal destruction signal name. Never fanned out to wildcard
    /// subscribers, and delivered even while signals are disabled.
    pub const DELETED: &'static str = "Deleted";

    /// Create a subject with no subscribers and signals enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                registry: RefCell::new(Registry::new()),
                signals_enabled: Cell::new(true),
            }),
        }
    }

    /// Subscribe `slot` to `signal`.
    ///
    /// Returns `false` for an empty signal name, an unbound slot, or a slot
    /// structurally equal to one already registered under `signal`. On
    /// success the target's `attached` hook runs; an error from the hook is
    /// logged but the attach stands.
    pub fn attach(&self, signal: &str, slot: impl Into<SafeSlot>) -> bool {
        let slot = slot.into();
        if signal.is_empty() {
            tracing::debug!("attach rejected: empty signal name");
            return false;
        }
        if !slot.slot().is_valid() {
            tracing::debug!(signal, "attach rejected: unbound slot");
            return false;
        }

        let inserted = self.inner.registry.borrow_mut().attach(signal, slot.clone());
        if inserted {
            if let Err(error) = slot.call_attached(self, signal) {
                tracing::warn!(signal, %error, "attached hook failed");
            }
        }
        inserted
    }

    /// Unsubscribe the slot structurally equal to `slot` from `signal`.
    ///
    /// Safe to call from within that slot's own invocation: the entry stops
    /// delivering immediately and is physically removed once the enclosing
    /// dispatch finishes. Returns `false` when no matching live entry
    /// exists.
    pub fn detach(&self, signal: &str, slot: impl Into<SafeSlot>) -> bool {
        let slot = slot.into();
        if signal.is_empty() {
            return false;
        }
        let removed = self.inner.registry.borrow_mut().detach_one(signal, &slot);
        match removed {
            Some(stored) => {
                if let Err(error) = stored.call_detached(self, signal) {
                    tracing::warn!(signal, %error, "detached hook failed");
                }
                true
            }
            None => false,
        }
    }

    /// Unsubscribe every slot under `signal`, firing each detached hook.
    pub fn detach_all(&self, signal: &str) -> bool {
        if signal.is_empty() {
            return false;
        }
        let removed = self.inner.registry.borrow_mut().detach_every(signal);
        for stored in removed {
            if let Err(error) = stored.call_detached(self, signal) {
                tracing::warn!(signal, %error, "detached hook failed");
            }
        }
        true
    }

    /// Publish `signal` with `payload` to subscribers.
    ///
    /// Exact-match subscribers run first, then — unless `signal` is one of
    /// the two reserved names — wildcard subscribers on
    /// [`Subject::MODIFIED`], each receiving the original `signal` string.
    /// Intended for the owning object; external collaborators use the
    /// [`Publisher`] surface, which does not expose it.
    pub fn notify(&self, signal: &str, payload: &Payload) {
        if signal.is_empty() {
            tracing::debug!("notify ignored: empty signal name");
            return;
        }
        if !self.signals_enabled() && signal != Self::DELETED {
            return;
        }

        registry::dispatch(self, signal, signal, payload);
        if signal != Self::MODIFIED && signal != Self::DELETED {
            registry::dispatch(self, Self::MODIFIED, signal, payload);
        }
    }

    /// Whether `notify` currently delivers (destruction always does).
    #[must_use]
    pub fn signals_enabled(&self) -> bool {
        self.inner.signals_enabled.get()
    }

    /// Enable or suppress delivery. Prefer the scoped [`SignalBlocker`] /
    /// [`SignalEnabler`] guards over calling this directly.
    pub fn enable_signals(&self, enabled: bool) {
        self.inner.signals_enabled.set(enabled);
    }

    /// Registered slots under `signal`, including slots already disarmed by
    /// a dead observer or invalidator but not yet swept.
    #[must_use]
    pub fn slot_count(&self, signal: &str) -> usize {
        self.inner.registry.borrow().slot_count(signal)
    }

    /// Whether `self` and `other` are handles to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A weak handle that does not keep the registry alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakSubject {
        WeakSubject {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn registry(&self) -> &RefCell<Registry> {
        &self.inner.registry
    }
}

impl Clone for Subject {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("signals", &self.inner.registry.borrow().signal_count())
            .field("enabled", &self.signals_enabled())
            .finish()
    }
}

/// Weak counterpart of [`Subject`]; used by forwarding signals and the
/// signal-state guards so neither keeps a dead publisher alive.
#[derive(Clone, Default)]
pub struct WeakSubject {
    inner: Weak<SubjectInner>,
}

impl WeakSubject {
    /// Recover a strong handle if the subject still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<Subject> {
        self.inner.upgrade().map(|inner| Subject { inner })
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for WeakSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSubject")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Implemented by objects that own a [`Subject`].
///
/// Default methods forward the subscription surface; `notify` is
/// deliberately absent so that only the owning object publishes.
pub trait Publisher {
    /// The owned subject.
    fn subject(&self) -> &Subject;

    /// See [`Subject::attach`].
    fn attach(&self, signal: &str, slot: SafeSlot) -> bool {
        self.subject().attach(signal, slot)
    }

    /// See [`Subject::detach`].
    fn detach(&self, signal: &str, slot: SafeSlot) -> bool {
        self.subject().detach(signal, slot)
    }

    /// See [`Subject::detach_all`].
    fn detach_all(&self, signal: &str) -> bool {
        self.subject().detach_all(signal)
    }
}

/// Scoped override of a subject's signal-enabled flag; restores the prior
/// value on drop. Holds the subject weakly, so it may outlive it.
#[must_use = "the previous signal state is restored when the guard drops"]
pub struct SignalEnabler {
    subject: WeakSubject,
    previous: bool,
}

impl SignalEnabler {
    /// Set the flag to `enabled` for the guard's lifetime.
    pub fn new(subject: &Subject, enabled: bool) -> Self {
        let previous = subject.signals_enabled();
        subject.enable_signals(enabled);
        Self {
            subject: subject.downgrade(),
            previous,
        }
    }

    /// Leave the flag as-is now, but restore today's value on drop. Useful
    /// around code that toggles the flag itself.
    pub fn hold(subject: &Subject) -> Self {
        Self {
            subject: subject.downgrade(),
            previous: subject.signals_enabled(),
        }
    }
}

impl Drop for SignalEnabler {
    fn drop(&mut self) {
        if let Some(subject) = self.subject.upgrade() {
            subject.enable_signals(self.previous);
        }
    }
}

/// Scoped suppression of a subject's signals; restores the prior state on
/// drop. Equivalent to `SignalEnabler::new(subject, false)`.
#[must_use = "signals are re-enabled when the guard drops"]
pub struct SignalBlocker {
    _enabler: SignalEnabler,
}

impl SignalBlocker {
    /// Suppress signals for the guard's lifetime.
    pub fn new(subject: &Subject) -> Self {
        Self {
            _enabler: SignalEnabler::new(subject, false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{Observer, Slot, SlotResult};
    use std::cell::RefCell as StdRefCell;

    struct Recorder {
        seen: StdRefCell<Vec<String>>,
    }

    impl Observer for Recorder {}

    impl Recorder {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                seen: StdRefCell::new(Vec::new()),
            })
        }

        fn on_event(&self, _subject: &Subject, signal: &str, _payload: &Payload) -> SlotResult {
            self.seen.borrow_mut().push(signal.to_string());
            Ok(())
        }

        fn on_alternate(&self, _subject: &Subject, signal: &str, _payload: &Payload) -> SlotResult {
            self.seen.borrow_mut().push(format!("alt:{signal}"));
            Ok(())
        }
    }

    #[test]
    fn attach_rejects_empty_signal_and_unbound_slot() {
        let subject = Subject::new();
        let recorder = Recorder::new();

        assert!(!subject.attach("", Slot::new(&recorder, Recorder::on_event)));
        assert!(!subject.attach("ZoomChanged", Slot::default()));
        assert_eq!(subject.slot_count("ZoomChanged"), 0);
    }

    #[test]
    fn attach_deduplicates() {
        let subject = Subject::new();
        let recorder = Recorder::new();

        assert!(subject.attach("ZoomChanged", Slot::new(&recorder, Recorder::on_event)));
        assert!(!subject.attach("ZoomChanged", Slot::new(&recorder, Recorder::on_event)));
        assert_eq!(subject.slot_count("ZoomChanged"), 1);

        subject.notify("ZoomChanged", &Payload::empty());
        assert_eq!(recorder.seen.borrow().len(), 1);
    }

    #[test]
    fn same_target_different_handlers_both_deliver() {
        let subject = Subject::new();
        let recorder = Recorder::new();

        assert!(subject.attach("PanChanged", Slot::new(&recorder, Recorder::on_event)));
        assert!(subject.attach("PanChanged", Slot::new(&recorder, Recorder::on_alternate)));

        subject.notify("PanChanged", &Payload::empty());
        assert_eq!(
            *recorder.seen.borrow(),
            vec![String::from("PanChanged"), String::from("alt:PanChanged")]
        );
    }

    #[test]
    fn detach_stops_delivery() {
        let subject = Subject::new();
        let recorder = Recorder::new();

        subject.attach("ZoomChanged", Slot::new(&recorder, Recorder::on_event));
        assert!(subject.detach("ZoomChanged", Slot::new(&recorder, Recorder::on_event)));
        assert!(!subject.detach("ZoomChanged", Slot::new(&recorder, Recorder::on_event)));

        subject.notify("ZoomChanged", &Payload::empty());
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn wildcard_receives_original_signal_name() {
        let subject = Subject::new();
        let wildcard = Recorder::new();
        let exact = Recorder::new();

        subject.attach(Subject::MODIFIED, Slot::new(&wildcard, Recorder::on_event));
        subject.attach("Custom", Slot::new(&exact, Recorder::on_event));

        subject.notify("Custom", &Payload::empty());
        assert_eq!(*exact.seen.borrow(), vec![String::from("Custom")]);
        assert_eq!(*wildcard.seen.borrow(), vec![String::from("Custom")]);
    }

    #[test]
    fn reserved_signals_skip_wildcard_fanout() {
        let subject = Subject::new();
        let wildcard = Recorder::new();

        subject.attach(Subject::MODIFIED, Slot::new(&wildcard, Recorder::on_event));

        subject.notify(Subject::DELETED, &Payload::empty());
        assert!(wildcard.seen.borrow().is_empty(), "Deleted must not fan out");

        subject.notify(Subject::MODIFIED, &Payload::empty());
        assert_eq!(
            wildcard.seen.borrow().len(),
            1,
            "Modified delivers exactly once, not once per pass"
        );
    }

    #[test]
    fn disabled_signals_suppress_all_but_deleted() {
        let subject = Subject::new();
        let recorder = Recorder::new();

        subject.attach(Subject::MODIFIED, Slot::new(&recorder, Recorder::on_event));
        subject.attach(Subject::DELETED, Slot::new(&recorder, Recorder::on_alternate));

        subject.enable_signals(false);
        subject.notify(Subject::MODIFIED, &Payload::empty());
        assert!(recorder.seen.borrow().is_empty());

        subject.notify(Subject::DELETED, &Payload::empty());
        assert_eq!(*recorder.seen.borrow(), vec![String::from("alt:Deleted")]);
    }

    #[test]
    fn enabler_and_blocker_restore_state() {
        let subject = Subject::new();
        assert!(subject.signals_enabled());

        {
            let _blocker = SignalBlocker::new(&subject);
            assert!(!subject.signals_enabled());
        }
        assert!(subject.signals_enabled());

        {
            let _enabler = SignalEnabler::new(&subject, false);
            assert!(!subject.signals_enabled());
        }
        assert!(subject.signals_enabled());

        {
            let _hold = SignalEnabler::hold(&subject);
            subject.enable_signals(false);
        }
        assert!(subject.signals_enabled(), "hold restores the snapshot");
    }

    #[test]
    fn blocker_may_outlive_subject() {
        let subject = Subject::new();
        let blocker = SignalBlocker::new(&subject);
        drop(subject);
        drop(blocker);
    }

    #[test]
    fn notify_with_empty_signal_is_ignored() {
        let subject = Subject::new();
        let recorder = Recorder::new();
        subject.attach(Subject::MODIFIED, Slot::new(&recorder, Recorder::on_event));

        subject.notify("", &Payload::empty());
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn clone_shares_registry() {
        let subject = Subject::new();
        let twin = subject.clone();
        let recorder = Recorder::new();

        twin.attach("FrameLoaded", Slot::new(&recorder, Recorder::on_event));
        subject.notify("FrameLoaded", &Payload::empty());
        assert_eq!(recorder.seen.borrow().len(), 1);
        assert!(subject.ptr_eq(&twin));
    }

    #[test]
    fn publisher_trait_delegates() {
        struct Document {
            subject: Subject,
        }

        impl Publisher for Document {
            fn subject(&self) -> &Subject {
                &self.subject
            }
        }

        let doc = Document {
            subject: Subject::new(),
        };
        let recorder = Recorder::new();

        let publisher: &dyn Publisher = &doc;
        assert!(publisher.attach("Saved", Slot::new(&recorder, Recorder::on_event).into()));

        doc.subject().notify("Saved", &Payload::empty());
        assert_eq!(*recorder.seen.borrow(), vec![String::from("Saved")]);

        assert!(publisher.detach("Saved", Slot::new(&recorder, Recorder::on_event).into()));
        doc.subject().notify("Saved", &Payload::empty());
        assert_eq!(recorder.seen.borrow().len(), 1);
    }
}
