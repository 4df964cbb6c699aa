#![forbid(unsafe_code)]

//! Type-erased notification payloads with checked downcasts.
//!
//! A [`Payload`] carries an arbitrary `'static` value from a publisher to its
//! subscribers. The subscriber names the concrete type it expects via
//! [`Payload::get`]; a wrong guess is a typed, recoverable [`PayloadError`],
//! never a panic. The dispatcher catches these errors per slot, so one
//! mis-typed subscriber cannot abort delivery to the others.
//!
//! # Invariants
//!
//! 1. The stored type tag always names the concrete type the payload was
//!    constructed with.
//! 2. `get::<T>()` succeeds iff the payload holds exactly `T`.
//! 3. Cloning a payload shares the value; it never re-boxes it.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Wrong type requested | `get::<T>()` on a non-`T` payload | `Err(TypeMismatch)` |
//! | Empty payload read | `get::<T>()` on `Payload::empty()` | `Err(Empty)` |

use std::any::{self, Any};
use std::fmt;
use std::rc::Rc;

/// Errors produced when a subscriber reads a [`Payload`] as the wrong type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload holds a value of a different concrete type.
    TypeMismatch {
        /// Type the subscriber asked for.
        expected: &'static str,
        /// Type the publisher actually stored.
        actual: &'static str,
    },
    /// The payload holds no value at all.
    Empty {
        /// Type the subscriber asked for.
        expected: &'static str,
    },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, actual } => {
                write!(f, "payload holds {actual}, not {expected}")
            }
            Self::Empty { expected } => write!(f, "empty payload read as {expected}"),
        }
    }
}

impl std::error::Error for PayloadError {}

/// A type-erased value passed from a publisher to its subscribers.
///
/// Payloads are cheap to clone (`Rc` inside) and carry a runtime type tag so
/// mismatched reads report both sides of the disagreement.
#[derive(Clone, Default)]
pub struct Payload {
    value: Option<Rc<dyn Any>>,
    type_name: &'static str,
}

impl Payload {
    /// Wrap a value for delivery.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            value: Some(Rc::new(value)),
            type_name: any::type_name::<T>(),
        }
    }

    /// A payload carrying no value, for signals that are pure events.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            value: None,
            type_name: "",
        }
    }

    /// Whether the payload carries no value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Name of the concrete type stored, or the empty string for
    /// [`Payload::empty`].
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Read the payload as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::TypeMismatch`] if the stored value is not a
    /// `T`, or [`PayloadError::Empty`] if there is no stored value.
    pub fn get<T: 'static>(&self) -> Result<&T, PayloadError> {
        match &self.value {
            Some(value) => value.downcast_ref::<T>().ok_or(PayloadError::TypeMismatch {
                expected: any::type_name::<T>(),
                actual: self.type_name,
            }),
            None => Err(PayloadError::Empty {
                expected: any::type_name::<T>(),
            }),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.debug_struct("Payload").field("value", &"<empty>").finish()
        } else {
            f.debug_struct("Payload")
                .field("type", &self.type_name)
                .finish()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
