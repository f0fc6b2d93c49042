//! Call Limits
//!
//! Per-thread depth and step accounting for one invocation. Recursive bodies
//! open a frame with [`enter_frame`]; loop bodies yield with [`checkpoint`].
//! Both are no-ops beyond a counter when no limit is installed.

use crate::ops::raise;
use crate::outcome::{Fault, Interrupted};
use std::cell::{Cell, RefCell};
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default maximum call depth before `StackOverflow` is raised.
pub const DEFAULT_MAX_DEPTH: u32 = 1_000;

/// Limits applied to a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimits {
    /// Maximum frames opened with [`enter_frame`]
    pub max_depth: u32,
    /// Maximum [`checkpoint`] calls, if any
    pub max_steps: Option<u64>,
}

impl Default for CallLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_steps: None,
        }
    }
}

struct GuardState {
    depth: Cell<u32>,
    max_depth: Cell<u32>,
    steps: Cell<u64>,
    max_steps: Cell<Option<u64>>,
    cancel: RefCell<Option<Arc<AtomicBool>>>,
}

thread_local! {
    static STATE: GuardState = const {
        GuardState {
            depth: Cell::new(0),
            max_depth: Cell::new(DEFAULT_MAX_DEPTH),
            steps: Cell::new(0),
            max_steps: Cell::new(None),
            cancel: RefCell::new(None),
        }
    };
}

/// Restores the previous thread state when an invocation ends.
#[must_use]
pub struct LimitScope {
    prev_max_depth: u32,
    prev_max_steps: Option<u64>,
    prev_cancel: Option<Arc<AtomicBool>>,
}

/// Install `limits` and an optional cancellation flag for the current thread.
pub fn install(limits: CallLimits, cancel: Option<Arc<AtomicBool>>) -> LimitScope {
    STATE.with(|state| {
        let scope = LimitScope {
            prev_max_depth: state.max_depth.replace(limits.max_depth),
            prev_max_steps: state.max_steps.replace(limits.max_steps),
            prev_cancel: state.cancel.replace(cancel),
        };
        state.depth.set(0);
        state.steps.set(0);
        scope
    })
}

impl Drop for LimitScope {
    fn drop(&mut self) {
        STATE.with(|state| {
            state.depth.set(0);
            state.steps.set(0);
            state.max_depth.set(self.prev_max_depth);
            state.max_steps.set(self.prev_max_steps);
            state.cancel.replace(self.prev_cancel.take());
        });
    }
}

/// An open call frame; dropping it pops the frame.
#[must_use]
pub struct FrameGuard {
    _private: (),
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        STATE.with(|state| state.depth.set(state.depth.get().saturating_sub(1)));
    }
}

/// Open a call frame, raising [`Fault::StackOverflow`] past the depth limit.
///
/// ```ignore
/// fn recurse(n: i32) -> i32 {
///     let _frame = enter_frame();
///     recurse(n + 1)
/// }
/// ```
#[track_caller]
pub fn enter_frame() -> FrameGuard {
    let overflow = STATE.with(|state| {
        let depth = state.depth.get() + 1;
        if depth > state.max_depth.get() {
            true
        } else {
            state.depth.set(depth);
            false
        }
    });
    if overflow {
        raise(Fault::StackOverflow);
    }
    FrameGuard { _private: () }
}

/// Current depth of open frames on this thread.
pub fn current_depth() -> u32 {
    STATE.with(|state| state.depth.get())
}

/// Cooperative budget point.
///
/// Unwinds with an [`Interrupted`] payload when the harness abandoned the
/// call or the step budget ran out.
pub fn checkpoint() {
    let interrupted = STATE.with(|state| {
        let cancelled = state
            .cancel
            .borrow()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if cancelled {
            return Some(Interrupted::Cancelled);
        }
        let steps = state.steps.get() + 1;
        state.steps.set(steps);
        match state.max_steps.get() {
            Some(max) if steps > max => Some(Interrupted::StepsExhausted),
            _ => None,
        }
    });
    if let Some(reason) = interrupted {
        panic::panic_any(reason);
    }
}
