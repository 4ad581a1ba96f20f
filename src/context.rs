//! Differentiation context: the recording and arbitrary-order switches.
//!
//! Both switches are thread-local, so concurrent evaluations on different
//! threads never observe each other's settings. Prefer [`DiffContext::activate`]
//! or [`RecordingGuard`] over the raw setters: the guards restore the previous
//! state on drop, mirroring how a tape guard scopes the active tape.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static RECORDING: Cell<bool> = const { Cell::new(true) };
    static ARBITRARY_ORDER: Cell<bool> = const { Cell::new(false) };
}

/// Whether assignments currently accumulate gradients.
#[inline]
pub fn is_recording() -> bool {
    RECORDING.with(Cell::get)
}

/// Enable or disable gradient bookkeeping. Returns the previous setting.
///
/// With recording disabled, assigning into a [`Variable`](crate::Variable)
/// stores the value only and leaves the Variable without derivatives.
#[inline]
pub fn set_recording(on: bool) -> bool {
    RECORDING.with(|cell| cell.replace(on))
}

/// Whether assignments also record a statement tape.
#[inline]
pub fn supports_arbitrary_order() -> bool {
    ARBITRARY_ORDER.with(Cell::get)
}

/// Enable or disable statement-tape recording. Returns the previous setting.
#[inline]
pub fn set_support_arbitrary_order(on: bool) -> bool {
    ARBITRARY_ORDER.with(|cell| cell.replace(on))
}

/// A snapshot of both switches, passed explicitly to whoever owns an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffContext {
    /// Accumulate gradients on assignment.
    pub recording: bool,
    /// Record statement tapes on assignment.
    pub arbitrary_order: bool,
}

impl Default for DiffContext {
    fn default() -> Self {
        DiffContext {
            recording: true,
            arbitrary_order: false,
        }
    }
}

impl DiffContext {
    /// The context currently active on this thread.
    pub fn current() -> Self {
        DiffContext {
            recording: is_recording(),
            arbitrary_order: supports_arbitrary_order(),
        }
    }

    /// Context with tape recording enabled.
    pub fn with_tape() -> Self {
        DiffContext {
            recording: true,
            arbitrary_order: true,
        }
    }

    /// Make this context active on the current thread until the guard drops.
    pub fn activate(self) -> ContextGuard {
        let prev = DiffContext {
            recording: set_recording(self.recording),
            arbitrary_order: set_support_arbitrary_order(self.arbitrary_order),
        };
        ContextGuard {
            prev,
            _not_send: PhantomData,
        }
    }
}

/// RAII guard restoring the previous [`DiffContext`] on drop.
pub struct ContextGuard {
    prev: DiffContext,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        set_recording(self.prev.recording);
        set_support_arbitrary_order(self.prev.arbitrary_order);
    }
}

/// RAII guard that sets only the recording switch and restores it on drop.
pub struct RecordingGuard {
    prev: bool,
    _not_send: PhantomData<*const ()>,
}

impl RecordingGuard {
    pub fn new(on: bool) -> Self {
        RecordingGuard {
            prev: set_recording(on),
            _not_send: PhantomData,
        }
    }
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        set_recording(self.prev);
    }
}
