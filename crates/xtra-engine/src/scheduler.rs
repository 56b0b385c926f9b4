//! Deterministic timer queue.
//!
//! The engine is single-threaded and host-driven: the host advances a
//! monotonic millisecond clock with [`crate::Engine::advance`] and due
//! tasks fire in (due-time, insertion) order. Debounce, poll,
//! delayed-load, and coalesced persistence saves all go through here.

/// A deferred unit of work. HTTP tasks index into the engine's binding
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// Flush the pending store serialization.
    Save,
    /// Fire an HTTP binding once (debounced event or delayed load).
    HttpFire(usize),
    /// Fire a polling HTTP binding and re-arm its interval.
    HttpPoll(usize),
}

#[derive(Debug)]
struct Timer {
    id: u64,
    due: u64,
    seq: u64,
    task: Task,
}

/// The timer queue plus the clock it runs against.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    now: u64,
    next_id: u64,
    timers: Vec<Timer>,
}

impl Scheduler {
    /// Arm a timer `delay` ms from now. Returns its id for cancellation.
    pub(crate) fn schedule(&mut self, delay: u64, task: Task) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            seq: id,
            task,
        });
        id
    }

    /// Disarm a timer. Unknown ids (already fired or cancelled) are a
    /// no-op.
    pub(crate) fn cancel(&mut self, id: u64) {
        self.timers.retain(|t| t.id != id);
    }

    pub(crate) fn advance_clock(&mut self, ms: u64) {
        self.now += ms;
    }

    /// Remove and return the earliest due timer's task, if any is due.
    pub(crate) fn pop_due(&mut self) -> Option<Task> {
        let at = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= self.now)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(at).task)
    }
}
