//! The active call's context envelope, scoped to one `observe` invocation.
//!
//! A `thread_local!` stack (not a mutable process-global) holds the
//! envelope currently in effect; the guest is single-threaded, so this is
//! equivalent in practice to a per-invocation value, pushed on entry to
//! `observe` and popped on exit via an RAII guard.

use reglet_types::ContextEnvelope;
use std::cell::RefCell;

thread_local! {
    static STACK: RefCell<Vec<ContextEnvelope>> = const { RefCell::new(Vec::new()) };
}

/// Returns a clone of the context envelope active for the current call, or
/// the default (no deadline, not canceled) envelope if none was pushed —
/// e.g. when SDK code runs outside of an `observe` activation, such as in
/// a unit test.
pub fn current() -> ContextEnvelope {
    STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_default())
}

/// Pushes `envelope` as the active context for the duration of `f`, and
/// pops it on return — including on panic unwind, since the pop happens in
/// the guard's `Drop`.
pub fn with_context<T>(envelope: ContextEnvelope, f: impl FnOnce() -> T) -> T {
    STACK.with(|stack| stack.borrow_mut().push(envelope));
    let _guard = PopOnDrop;
    f()
}

struct PopOnDrop;

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
