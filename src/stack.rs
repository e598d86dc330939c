//! Host stack growth for the recursive tree walks.
//!
//! The parser, resolver and evaluator all recurse once per level of syntactic
//! nesting.  Each recursive entry point goes through [`ensure_sufficient_stack`]
//! so deep but valid programs never exhaust the thread's stack.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if less than the red zone
/// remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
