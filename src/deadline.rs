use std::time::{Duration, Instant};

/// An absolute point in time after which a wait gives up, or [`Deadline::INFINITE`] for a wait
/// that never times out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never elapses.
    pub const INFINITE: Deadline = Deadline(None);

    /// A deadline at the given instant. An instant in the past makes for a deadline that has
    /// already elapsed, which is still a valid argument to every wait.
    pub fn at(instant: Instant) -> Deadline {
        Deadline(Some(instant))
    }

    /// A deadline `timeout` from now. [`INFINITE`](crate::INFINITE) (i.e. `Duration::MAX`), or
    /// any other timeout too large to be represented as an `Instant`, yields
    /// [`Deadline::INFINITE`].
    pub fn after(timeout: Duration) -> Deadline {
        if timeout == crate::INFINITE {
            return Deadline::INFINITE;
        }
        Deadline(Instant::now().checked_add(timeout))
    }

    /// Whether this deadline never elapses.
    pub fn is_infinite(&self) -> bool {
        self.0.is_none()
    }

    /// The instant this deadline elapses at, or `None` if it is infinite.
    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// The time left until this deadline elapses (zero if it already has), or `None` if it is
    /// infinite.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    /// Whether this deadline has already passed. Always `false` for an infinite deadline.
    pub fn has_elapsed(&self) -> bool {
        match self.0 {
            Some(instant) => Instant::now() >= instant,
            None => false,
        }
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Deadline {
        Deadline::at(instant)
    }
}
