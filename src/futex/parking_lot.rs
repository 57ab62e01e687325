use super::{Futex, RequeueStatus, WaitStatus, WAKE_ALL};
use crate::Deadline;
use parking_lot_core as plc;
use parking_lot_core::{FilterOp, ParkResult, RequeueOp};
use std::sync::atomic::{AtomicI32, Ordering};

/// A portable [`Futex`] that parks threads in `parking_lot_core`'s global hash table, keyed by
/// the address of the wait word.
///
/// The value check runs under the bucket lock for that address, which is also taken by every
/// unpark and requeue targeting it, so a store-then-wake can never fall between a waiter's check
/// and its sleep.
#[derive(Debug)]
pub enum ParkingLot {}

fn key(word: &AtomicI32) -> usize {
    word as *const AtomicI32 as usize
}

unsafe impl Futex for ParkingLot {
    fn wait_if_equal(word: &AtomicI32, expected: i32, deadline: Deadline) -> WaitStatus {
        let result = unsafe {
            plc::park(
                key(word),
                || word.load(Ordering::SeqCst) == expected,
                || {},
                |_, _| {},
                plc::DEFAULT_PARK_TOKEN,
                deadline.instant(),
            )
        };

        match result {
            ParkResult::Unparked(_) => WaitStatus::Woken,
            ParkResult::Invalid => WaitStatus::StateChanged,
            ParkResult::TimedOut => WaitStatus::TimedOut,
        }
    }

    fn wake(word: &AtomicI32, count: u32) -> usize {
        if count == WAKE_ALL {
            return unsafe { plc::unpark_all(key(word), plc::DEFAULT_UNPARK_TOKEN) };
        }

        let mut remaining = count;
        let result = unsafe {
            plc::unpark_filter(
                key(word),
                |_| {
                    if remaining == 0 {
                        FilterOp::Stop
                    } else {
                        remaining -= 1;
                        FilterOp::Unpark
                    }
                },
                |_| plc::DEFAULT_UNPARK_TOKEN,
            )
        };
        result.unparked_threads
    }

    fn requeue(from: &AtomicI32, expected: i32, to: &AtomicI32, count: u32) -> RequeueStatus {
        if key(from) == key(to) {
            return RequeueStatus::Invalid;
        }

        // parking_lot_core can move either one waiter or all of them per call, so bounded counts
        // are served one waiter at a time, re-checking the source value each time.
        let mut moved = 0;
        loop {
            let batch = count - moved as u32;
            if batch == 0 {
                return RequeueStatus::Requeued(moved);
            }

            let mut aborted = false;
            let result = unsafe {
                plc::unpark_requeue(
                    key(from),
                    key(to),
                    || {
                        if from.load(Ordering::SeqCst) != expected {
                            aborted = true;
                            RequeueOp::Abort
                        } else if count == WAKE_ALL {
                            RequeueOp::RequeueAll
                        } else {
                            RequeueOp::RequeueOne
                        }
                    },
                    |_, _| plc::DEFAULT_UNPARK_TOKEN,
                )
            };

            if aborted {
                // A later round can only abort if the value changed after some waiters moved.
                return match moved {
                    0 => RequeueStatus::StateChanged,
                    moved => RequeueStatus::Requeued(moved),
                };
            }

            moved += result.requeued_threads;
            if count == WAKE_ALL || result.requeued_threads == 0 || !result.have_more_threads {
                return RequeueStatus::Requeued(moved);
            }
        }
    }
}
