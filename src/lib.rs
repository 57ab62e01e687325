//! `rscompletion` provides a [`Completion`]: a one-shot, resettable signal that lets any number of
//! threads block until another thread announces that some event has happened.
//!
//! A completion is a single 32-bit word that is either unsignaled or signaled. Waiting on a
//! signaled completion returns immediately without a syscall, waiting on an unsignaled one
//! suspends the thread in the kernel (or in `parking_lot_core`'s parking lot) until a call to
//! [`Completion::signal()`] releases every waiter at once. Once signaled, a completion stays
//! signaled until it is explicitly [`reset()`](Completion::reset), so a signal can never be missed
//! by a thread that starts waiting late.
//!
//! Completions are deliberately minimal. They are not condition variables, they do not count, and
//! they have no notion of which signaller came first: any number of `signal()` calls collapse into
//! the same signaled state.
//!
//! ```
//! use rscompletion::Completion;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let done = Arc::new(Completion::new());
//! let worker = {
//!     let done = done.clone();
//!     thread::spawn(move || {
//!         // ... do some work ...
//!         done.signal();
//!     })
//! };
//!
//! done.wait();
//! worker.join().unwrap();
//! ```
//!
//! The blocking itself is delegated to a [`Futex`] backend. By default that is the portable
//! [`ParkingLot`]; enabling the `native-futex` feature switches the default on Linux to
//! [`LinuxFutex`](futex::LinuxFutex), which issues `futex(2)` syscalls directly.
extern crate log;
extern crate parking_lot_core;

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

mod deadline;
pub mod futex;

pub use deadline::Deadline;
pub use futex::{DefaultFutex, Futex, ParkingLot, RequeueStatus, WaitStatus, WAKE_ALL};


/// The value of the wait word of a completion that has not been signaled.
pub const UNSIGNALED: i32 = 0;
/// The value of the wait word of a completion that has been signaled.
pub const SIGNALED: i32 = 1;

/// A timeout that never elapses, for use with [`Completion::wait_for()`].
pub const INFINITE: Duration = Duration::MAX;

/// The observable state of a [`Completion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Calls to [`Completion::wait()`] block until the completion is signaled.
    Unsignaled,
    /// Calls to [`Completion::wait()`] return immediately.
    Signaled,
}

/// Returned by the timed waits of a [`Completion`] when the deadline elapsed before the completion
/// was signaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("timed out waiting for completion")
    }
}

impl Error for TimedOut {}

/// A one-shot signal that releases every past and future waiter once it is signaled, until it is
/// reset.
///
/// A `Completion` is exactly one `AtomicI32` wide and its unsignaled state is all zeroes, so it
/// can be embedded in other structures or statics and zero-initialized. The type parameter selects
/// the [`Futex`] backend used to block; every party touching a given completion uses the same one
/// by construction.
///
/// Dropping a completion while threads are still blocked on it is impossible in safe code, since
/// waiters borrow it.
#[repr(transparent)]
pub struct Completion<F = DefaultFutex> {
    word: AtomicI32,
    futex: PhantomData<fn() -> F>,
}

impl Completion<DefaultFutex> {
    /// Creates a new, unsignaled completion backed by the [`DefaultFutex`].
    pub const fn new() -> Self {
        Self::with_futex()
    }
}

impl<F> Completion<F> {
    /// Creates a new, unsignaled completion backed by the backend `F`.
    pub const fn with_futex() -> Self {
        Self {
            word: AtomicI32::new(UNSIGNALED),
            futex: PhantomData,
        }
    }

    /// Checks whether the completion has been signaled, without blocking.
    pub fn is_signaled(&self) -> bool {
        self.word.load(Ordering::SeqCst) == SIGNALED
    }

    /// Returns the current [`State`] of the completion, without blocking.
    pub fn state(&self) -> State {
        if self.is_signaled() {
            State::Signaled
        } else {
            State::Unsignaled
        }
    }

    /// Returns the completion to the unsignaled state, so that it may be reused.
    ///
    /// Nothing is woken, and threads that were already released by an earlier signal are
    /// unaffected. Resetting concurrently with a [`signal()`](Completion::signal), or while some
    /// thread still expects to see the completion signaled, is a race whose outcome this type does
    /// not arbitrate.
    pub fn reset(&self) {
        self.word.store(UNSIGNALED, Ordering::SeqCst);
    }
}

impl<F: Futex> Completion<F> {
    /// Blocks the calling thread until the completion is signaled. Returns immediately if it
    /// already is.
    pub fn wait(&self) {
        let result = self.wait_deadline(Deadline::INFINITE);
        debug_assert!(result.is_ok(), "futex backend timed out an infinite wait");
    }

    /// Blocks the calling thread until the completion is signaled or `timeout` elapses.
    ///
    /// A `timeout` of [`INFINITE`] never elapses. Returns [`TimedOut`] if the completion was not
    /// signaled in time, in which case its state is left untouched.
    pub fn wait_for(&self, timeout: Duration) -> Result<(), TimedOut> {
        self.wait_deadline(Deadline::after(timeout))
    }

    /// Blocks the calling thread until the completion is signaled or `deadline` is reached.
    ///
    /// This is the primitive form of [`wait_for()`](Completion::wait_for); a deadline that has
    /// already passed still succeeds if the completion is signaled.
    pub fn wait_deadline(&self, deadline: Deadline) -> Result<(), TimedOut> {
        loop {
            let current = self.word.load(Ordering::SeqCst);
            if current == SIGNALED {
                return Ok(());
            }

            match F::wait_if_equal(&self.word, current, deadline) {
                // Possibly spurious, check the word again.
                WaitStatus::Woken => continue,
                // The word no longer held what we loaded, and only a signal changes it.
                WaitStatus::StateChanged => return Ok(()),
                WaitStatus::TimedOut => return Err(TimedOut),
                WaitStatus::Invalid => invalid_wait_word("wait"),
            }
        }
    }

    /// Signals the completion, releasing every thread currently blocked in a wait and letting all
    /// future waits return immediately.
    ///
    /// Signaling an already-signaled completion has no further effect.
    pub fn signal(&self) {
        self.word.store(SIGNALED, Ordering::SeqCst);
        F::wake(&self.word, WAKE_ALL);
    }

    /// Signals the completion, but instead of waking the threads blocked on it, moves them over to
    /// wait on `other` in a single atomic step.
    ///
    /// This hands waiters off to another wait word (which must be used through the same backend
    /// `F`) without waking them only for them to block again immediately. Future waits on this
    /// completion return immediately, exactly as after [`signal()`](Completion::signal).
    ///
    /// The requeue only happens if the completion is still signaled when the backend inspects it.
    /// That can only fail if a [`reset()`](Completion::reset) races with this call, which is not a
    /// supported combination; the waiters are then left alone, as they would observe the
    /// unsignaled word and block again anyway.
    ///
    /// Passing this completion's own wait word as `other` aborts the process.
    pub fn signal_and_requeue(&self, other: &AtomicI32) {
        self.word.store(SIGNALED, Ordering::SeqCst);
        match F::requeue(&self.word, SIGNALED, other, WAKE_ALL) {
            RequeueStatus::Requeued(_) => {}
            RequeueStatus::StateChanged => {
                log::trace!("completion reset during requeue, waiters left in place");
            }
            RequeueStatus::Invalid => invalid_wait_word("requeue"),
        }
    }
}

impl<F> Default for Completion<F> {
    fn default() -> Self {
        Self::with_futex()
    }
}

impl<F> fmt::Debug for Completion<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state())
            .finish()
    }
}

/// The backend rejected a wait word that, under correct usage, is always valid. Continuing would
/// risk threads sleeping forever, so the process is torn down rather than unwound.
#[cold]
#[inline(never)]
fn invalid_wait_word(operation: &str) -> ! {
    log::error!("futex {} rejected a completion's wait word, aborting", operation);
    std::process::abort()
}
