//! This example illustrates the use of [`Completion`] as a start gate for a pool of worker
//! threads: the main thread publishes a batch of work and releases every worker with a single
//! signal, then waits on a per-worker completion for each of them to report back.
//!
//! [`Completion`]: rscompletion::Completion

use rscompletion::Completion;
use std::time::Duration;

const THREAD_COUNT: usize = 3;

// Completions are cheap: each one is a single 32-bit word.
static WORK_READY: Completion = Completion::new();
static FINISHED: [Completion; THREAD_COUNT] = [Completion::new(), Completion::new(), Completion::new()];

pub fn main() {
    // WORK_READY guards this shared state: it is written before the signal and only read after a
    // successful wait.
    static mut BATCH: [u32; 6] = [0; 6];

    let mut threads = Vec::with_capacity(THREAD_COUNT);
    for thread_idx in 0..THREAD_COUNT {
        let join_handle = std::thread::spawn(move || {
            if WORK_READY.wait_for(Duration::from_secs(5)).is_err() {
                eprintln!("Thread {thread_idx} gave up waiting for work");
                return;
            }

            // Safe because nothing writes to BATCH after WORK_READY is signaled, and the signal
            // makes the writes before it visible here.
            let batch = unsafe { *std::ptr::addr_of!(BATCH) };
            let sum: u32 = batch.iter().skip(thread_idx).step_by(THREAD_COUNT).sum();
            eprintln!("Thread {thread_idx} summed its share to {sum}");

            FINISHED[thread_idx].signal();
        });
        threads.push(join_handle);
    }

    unsafe {
        *std::ptr::addr_of_mut!(BATCH) = [4, 8, 15, 16, 23, 42];
    }

    // One signal releases every worker, whether it is already parked or not yet waiting.
    WORK_READY.signal();

    for finished in FINISHED.iter() {
        finished.wait();
    }
    for jh in threads {
        jh.join().expect("Worker thread panicked!");
    }
    eprintln!("All work completed - exiting!")
}
