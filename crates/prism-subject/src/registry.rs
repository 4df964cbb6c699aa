#![forbid(unsafe_code)]

//! Per-subject slot registry and dispatch driver.
//!
//! One registry per [`Subject`], mapping signal name to the ordered list of
//! attached [`SafeSlot`]s. Everything reentrancy-related lives here:
//!
//! - While a dispatch pass walks a list, an *active frame* for that list sits
//!   on a stack. Frames are pushed immediately before each slot invocation
//!   and popped immediately after, so the stack mirrors the nested call tree
//!   (a handler notifying the same signal pushes a second frame for the same
//!   list).
//! - Any detach that targets a list with a frame on the stack removes the
//!   entry *logically* (tombstone) and leaves physical removal to the sweep
//!   at the end of the outermost pass. Detaches on idle lists remove
//!   immediately. Either way the entry stops matching and stops delivering
//!   at the moment of the detach call.
//! - A pass snapshots the list length when it starts; slots attached during
//!   the pass land beyond the snapshot and are first invoked by the next
//!   notify.
//!
//! # Invariants
//!
//! 1. Delivery order within one list is attachment order.
//! 2. No entry index shifts while any frame for its list is on the stack.
//! 3. Tombstoned entries are never invoked, never match attach/detach
//!    lookups, and are gone once the stack has no frame for their list.
//! 4. The sweep also culls entries whose target or invalidator has died.
//!
//! # Failure Modes
//!
//! - A slot handler returning [`PayloadError`](crate::PayloadError) is
//!   logged with the signal name; remaining slots still run.
//! - Registry borrows are released around every invocation, so handlers may
//!   freely attach, detach, or notify on the same subject.

use std::collections::HashMap;

use crate::payload::Payload;
use crate::safe_slot::SafeSlot;
use crate::subject::Subject;

struct Entry {
    slot: SafeSlot,
    tombstone: bool,
}

struct Frame {
    key: String,
}

/// Slot storage for one subject.
pub(crate) struct Registry {
    lists: HashMap<String, Vec<Entry>>,
    active: Vec<Frame>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            lists: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Append `slot` to `signal`'s list unless a structurally equal live
    /// entry already exists.
    pub(crate) fn attach(&mut self, signal: &str, slot: SafeSlot) -> bool {
        let list = self.lists.entry(signal.to_string()).or_default();
        if list.iter().any(|e| !e.tombstone && e.slot == slot) {
            return false;
        }
        list.push(Entry {
            slot,
            tombstone: false,
        });
        true
    }

    /// Remove the one live entry equal to `slot`, returning the stored slot
    /// so the caller can fire its detached hook.
    pub(crate) fn detach_one(&mut self, signal: &str, slot: &SafeSlot) -> Option<SafeSlot> {
        let deferred = self.is_dispatching(signal);
        let list = self.lists.get_mut(signal)?;
        let index = list.iter().position(|e| !e.tombstone && e.slot == *slot)?;
        let removed = if deferred {
            list[index].tombstone = true;
            list[index].slot.clone()
        } else {
            let entry = list.remove(index);
            if list.is_empty() {
                self.lists.remove(signal);
            }
            entry.slot
        };
        Some(removed)
    }

    /// Remove every live entry under `signal`, returning the stored slots in
    /// order.
    pub(crate) fn detach_every(&mut self, signal: &str) -> Vec<SafeSlot> {
        let deferred = self.is_dispatching(signal);
        let Some(list) = self.lists.get_mut(signal) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        if deferred {
            for entry in list.iter_mut().filter(|e| !e.tombstone) {
                entry.tombstone = true;
                removed.push(entry.slot.clone());
            }
        } else {
            removed.extend(list.drain(..).filter(|e| !e.tombstone).map(|e| e.slot));
            self.lists.remove(signal);
        }
        removed
    }

    /// Registered (non-tombstoned) entries under `signal`, including slots
    /// already disarmed but not yet swept.
    pub(crate) fn slot_count(&self, signal: &str) -> usize {
        self.lists
            .get(signal)
            .map_or(0, |list| list.iter().filter(|e| !e.tombstone).count())
    }

    /// Number of signals with at least one registered entry.
    pub(crate) fn signal_count(&self) -> usize {
        self.lists.len()
    }

    fn is_dispatching(&self, signal: &str) -> bool {
        self.active.iter().any(|frame| frame.key == signal)
    }

    fn pass_len(&self, signal: &str) -> usize {
        self.lists.get(signal).map_or(0, Vec::len)
    }

    /// The slot at `index`, unless it has been tombstoned since the pass
    /// began.
    fn slot_at(&self, signal: &str, index: usize) -> Option<SafeSlot> {
        let entry = self.lists.get(signal)?.get(index)?;
        (!entry.tombstone).then(|| entry.slot.clone())
    }

    fn begin_invoke(&mut self, signal: &str) {
        self.active.push(Frame {
            key: signal.to_string(),
        });
    }

    fn end_invoke(&mut self) {
        self.active.pop();
    }

    /// Drop tombstoned and dead entries for `signal`, but only once no pass
    /// over that list remains in progress anywhere on the call stack.
    fn sweep_if_idle(&mut self, signal: &str) {
        if self.is_dispatching(signal) {
            return;
        }
        if let Some(list) = self.lists.get_mut(signal) {
            list.retain(|e| !e.tombstone && e.slot.is_live());
            if list.is_empty() {
                self.lists.remove(signal);
            }
        }
    }
}

/// Walk `key`'s list once, delivering `original` as the signal name.
///
/// `key` and `original` differ only during the wildcard pass, where the
/// `"Modified"` list is walked but subscribers receive the real signal name.
pub(crate) fn dispatch(subject: &Subject, key: &str, original: &str, payload: &Payload) {
    let registry = subject.registry();
    let pass_len = registry.borrow().pass_len(key);

    for index in 0..pass_len {
        let slot = {
            let mut reg = registry.borrow_mut();
            let slot = reg.slot_at(key, index);
            if slot.is_some() {
                reg.begin_invoke(key);
            }
            slot
        };
        let Some(slot) = slot else { continue };

        // No registry borrow is held here: the handler may attach, detach,
        // or notify on this same subject.
        let result = slot.invoke(subject, original, payload);
        registry.borrow_mut().end_invoke();

        if let Err(error) = result {
            tracing::warn!(
                signal = original,
                %error,
                "slot could not consume notification payload"
            );
        }
    }

    registry.borrow_mut().sweep_if_idle(key);
}
