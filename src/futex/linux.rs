use super::{Futex, RequeueStatus, WaitStatus};
use crate::Deadline;
use libc::{
    c_long,
    syscall,
    time_t,
    timespec,
    SYS_futex,
    FUTEX_CMP_REQUEUE,
    FUTEX_PRIVATE_FLAG,
    FUTEX_WAIT,
    FUTEX_WAKE,
    EAGAIN,
    EINTR,
    ETIMEDOUT,
};
use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::AtomicI32;

/// A [`Futex`] that goes straight to the Linux `futex(2)` syscall.
///
/// All operations are process-private (`FUTEX_PRIVATE_FLAG`), so words must not be shared with
/// other processes through shared memory.
#[derive(Debug)]
pub enum LinuxFutex {}

fn addr(word: &AtomicI32) -> *const i32 {
    word as *const AtomicI32 as *const i32
}

fn clamp(count: u32) -> i32 {
    count.min(i32::MAX as u32) as i32
}

fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

unsafe impl Futex for LinuxFutex {
    fn wait_if_equal(word: &AtomicI32, expected: i32, deadline: Deadline) -> WaitStatus {
        // FUTEX_WAIT takes a relative timeout measured against CLOCK_MONOTONIC, as does Instant.
        let timeout = deadline.remaining().map(|remaining| {
            // Some targets pad timespec with private fields, so it cannot be built literally.
            let mut ts: timespec = unsafe { mem::zeroed() };
            ts.tv_sec = remaining.as_secs().min(time_t::MAX as u64) as time_t;
            ts.tv_nsec = remaining.subsec_nanos() as c_long;
            ts
        });
        let timeout_ptr = timeout
            .as_ref()
            .map_or(ptr::null(), |ts| ts as *const timespec);

        let r = unsafe {
            syscall(
                SYS_futex,
                addr(word),
                FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
                expected,
                timeout_ptr,
            )
        };
        if r == 0 {
            return WaitStatus::Woken;
        }

        match errno() {
            EAGAIN => WaitStatus::StateChanged,
            ETIMEDOUT => WaitStatus::TimedOut,
            // Interrupted by a signal handler; report it as a spurious wake so the caller
            // re-checks the word and waits again against the same deadline.
            EINTR => WaitStatus::Woken,
            _ => WaitStatus::Invalid,
        }
    }

    fn wake(word: &AtomicI32, count: u32) -> usize {
        let r = unsafe {
            syscall(
                SYS_futex,
                addr(word),
                FUTEX_WAKE | FUTEX_PRIVATE_FLAG,
                clamp(count),
            )
        };
        debug_assert!(r >= 0);
        r.max(0) as usize
    }

    fn requeue(from: &AtomicI32, expected: i32, to: &AtomicI32, count: u32) -> RequeueStatus {
        if ptr::eq(from, to) {
            return RequeueStatus::Invalid;
        }

        // FUTEX_CMP_REQUEUE passes the requeue limit in the slot normally holding the timeout.
        let r = unsafe {
            syscall(
                SYS_futex,
                addr(from),
                FUTEX_CMP_REQUEUE | FUTEX_PRIVATE_FLAG,
                0,
                clamp(count) as usize,
                addr(to),
                expected,
            )
        };
        if r >= 0 {
            return RequeueStatus::Requeued(r as usize);
        }

        match errno() {
            EAGAIN => RequeueStatus::StateChanged,
            _ => RequeueStatus::Invalid,
        }
    }
}
