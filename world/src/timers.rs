//! Delayed effects scheduled against the room clock.

use std::time::Duration;

/// Effect applied once its timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Returns control to the player after a resurrection freeze.
    ResumePlayer,
}

#[derive(Clone, Copy, Debug)]
struct DeferredTimer {
    fires_at: Duration,
    kind: TimerKind,
}

/// Pending timers ordered by the time they fire.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    timers: Vec<DeferredTimer>,
}

impl TimerQueue {
    /// Schedules `kind` to fire once the clock reaches `fires_at`.
    pub(crate) fn schedule(&mut self, fires_at: Duration, kind: TimerKind) {
        let index = self
            .timers
            .partition_point(|timer| timer.fires_at <= fires_at);
        self.timers.insert(index, DeferredTimer { fires_at, kind });
    }

    /// Removes and returns every timer due at `now`, earliest first.
    pub(crate) fn drain_due(&mut self, now: Duration) -> Vec<TimerKind> {
        let due = self.timers.partition_point(|timer| timer.fires_at <= now);
        self.timers.drain(..due).map(|timer| timer.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_once_when_due() {
        let mut queue = TimerQueue::default();
        queue.schedule(Duration::from_secs(2), TimerKind::ResumePlayer);
        queue.schedule(Duration::from_secs(1), TimerKind::ResumePlayer);

        assert!(queue.drain_due(Duration::from_millis(500)).is_empty());
        assert_eq!(
            queue.drain_due(Duration::from_secs(1)),
            vec![TimerKind::ResumePlayer]
        );
        assert_eq!(
            queue.drain_due(Duration::from_secs(5)),
            vec![TimerKind::ResumePlayer]
        );
        assert!(queue.drain_due(Duration::MAX).is_empty());
    }
}
