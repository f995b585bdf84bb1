use parking_lot::{Condvar, Mutex};

/// Completion counter for a training round.
///
/// The coordinator adds one unit per dispatched sample and blocks in [`Countdown::wait`]
/// until every worker has reported back. Waits are unbounded.
#[derive(Debug, Default)]
pub(crate) struct Countdown {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl Countdown {
    pub(crate) fn add(&self, n: usize) {
        *self.remaining.lock() += n;
    }

    /// Remove `n` units, waking waiters when the count reaches zero.
    pub(crate) fn sub(&self, n: usize) {
        let mut remaining = self.remaining.lock();
        debug_assert!(*remaining >= n, "countdown underflow");
        *remaining = remaining.saturating_sub(n);
        if *remaining == 0 {
            self.zero.notify_all();
        }
    }

    /// Block until the count is zero.
    pub(crate) fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining != 0 {
            self.zero.wait(&mut remaining);
        }
    }

    /// One unit of work; reported as done when the guard drops, unwinding included.
    pub(crate) fn guard(&self) -> CountdownGuard<'_> {
        CountdownGuard { countdown: self }
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}

pub(crate) struct CountdownGuard<'a> {
    countdown: &'a Countdown,
}

impl Drop for CountdownGuard<'_> {
    fn drop(&mut self) {
        self.countdown.sub(1);
    }
}
