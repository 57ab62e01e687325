//! The wait-word facility that [`Completion`](crate::Completion) is built on.
//!
//! A wait word is a plain `AtomicI32` used purely as a rendezvous point: threads block on it only
//! while it holds an expected value, and are released by a matching wake or requeue issued against
//! the same address. The three operations are abstracted behind the [`Futex`] trait so that the
//! same completion logic can run on top of the raw Linux `futex(2)` syscall or on top of the
//! portable parking lot provided by `parking_lot_core`.
//!
//! Waiters and wakers of any one word must agree on the backend: a thread parked by one
//! implementation will never observe a wake issued through another.
use crate::Deadline;
use std::sync::atomic::AtomicI32;

mod parking_lot;
pub use self::parking_lot::ParkingLot;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::LinuxFutex;

/// The backend used by [`Completion`](crate::Completion) when no type parameter is given.
#[cfg(all(feature = "native-futex", target_os = "linux"))]
pub type DefaultFutex = LinuxFutex;

/// The backend used by [`Completion`](crate::Completion) when no type parameter is given.
#[cfg(not(all(feature = "native-futex", target_os = "linux")))]
pub type DefaultFutex = ParkingLot;

/// Passed as a wake or requeue count to affect every thread blocked on a word.
pub const WAKE_ALL: u32 = u32::MAX;

/// The outcome of [`Futex::wait_if_equal()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    /// The thread blocked and was later woken. This says nothing about the current value of the
    /// word; wakes may be spurious and the caller is expected to re-check.
    Woken,
    /// The word did not hold the expected value when the backend inspected it, so the thread
    /// never blocked.
    StateChanged,
    /// The deadline elapsed while the thread was blocked.
    TimedOut,
    /// The backend rejected the arguments. Under correct usage this cannot happen.
    Invalid,
}

/// The outcome of [`Futex::requeue()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequeueStatus {
    /// The source word held the expected value; this many waiters were moved over.
    Requeued(usize),
    /// The source word did not hold the expected value and nothing was moved.
    StateChanged,
    /// The backend rejected the arguments, e.g. requeueing a word onto itself.
    Invalid,
}

/// A kernel-assisted (or kernel-emulating) facility for blocking on a 32-bit word.
///
/// # Safety
///
/// Implementations must check the value of the word and enqueue the waiting thread atomically with
/// respect to [`Futex::wake()`] and [`Futex::requeue()`] on the same word. If a store to the word
/// followed by a wake can slip in between the check and the enqueue, a waiter can sleep through
/// the only signal it will ever get.
pub unsafe trait Futex {
    /// Blocks the calling thread if and only if `word` holds `expected` at the moment of the
    /// check, until it is woken or `deadline` elapses.
    fn wait_if_equal(word: &AtomicI32, expected: i32, deadline: Deadline) -> WaitStatus;

    /// Wakes up to `count` threads blocked on `word`, returning how many were woken.
    fn wake(word: &AtomicI32, count: u32) -> usize;

    /// Atomically checks that `from` holds `expected` and, if so, moves up to `count` threads
    /// blocked on `from` over to `to` without waking them.
    fn requeue(from: &AtomicI32, expected: i32, to: &AtomicI32, count: u32) -> RequeueStatus;
}
