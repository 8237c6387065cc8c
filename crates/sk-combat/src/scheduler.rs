use std::fmt;

use tracing::warn;

/// A task waiting for its delay to run out.
#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    task: T,
    ticks_remaining: u32,
}

/// What a [`TurnScheduler::tick_with`] call ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks that completed.
    pub executed: usize,
    /// Tasks whose action failed and were dropped.
    pub failed: usize,
}

/// Delayed task queue driven by the host's tick.
///
/// Each [`tick`](TurnScheduler::tick) decrements every pending delay by
/// one and hands back the tasks that reached zero, in insertion order. A
/// task scheduled with delay 0 or 1 fires on the next tick.
#[derive(Debug, Clone)]
pub struct TurnScheduler<T> {
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for TurnScheduler<T> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<T> TurnScheduler<T> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task` to fire after `delay_ticks` ticks.
    pub fn schedule_after_delay(&mut self, task: T, delay_ticks: u32) {
        self.tasks.push(ScheduledTask {
            task,
            ticks_remaining: delay_ticks,
        });
    }

    /// Drop every pending task. Returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    /// Whether any task is waiting.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Number of waiting tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Advance one tick and return the tasks that came due.
    pub fn tick(&mut self) -> Vec<T> {
        let mut due = Vec::new();
        let mut waiting = Vec::with_capacity(self.tasks.len());
        for mut scheduled in self.tasks.drain(..) {
            scheduled.ticks_remaining = scheduled.ticks_remaining.saturating_sub(1);
            if scheduled.ticks_remaining == 0 {
                due.push(scheduled.task);
            } else {
                waiting.push(scheduled);
            }
        }
        self.tasks = waiting;
        due
    }

    /// Advance one tick and run each due task through `run`.
    ///
    /// A failing task is logged and dropped; the rest still run.
    pub fn tick_with<E, F>(&mut self, run: F) -> TickReport
    where
        E: fmt::Display,
        F: FnMut(T) -> Result<(), E>,
    {
        let due = self.tick();
        run_due(due, run)
    }
}

/// Run already-drained tasks, logging and counting failures.
pub fn run_due<T, E, F>(due: Vec<T>, mut run: F) -> TickReport
where
    E: fmt::Display,
    F: FnMut(T) -> Result<(), E>,
{
    let mut report = TickReport::default();
    for task in due {
        match run(task) {
            Ok(()) => report.executed += 1,
            Err(err) => {
                warn!(error = %err, "scheduled action failed");
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_n<T>(scheduler: &mut TurnScheduler<T>, n: usize) -> Vec<T> {
        let mut fired = Vec::new();
        for _ in 0..n {
            fired.extend(scheduler.tick());
        }
        fired
    }

    #[test]
    fn fires_after_exactly_the_delay() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay("a", 3);
        assert!(scheduler.tick().is_empty());
        assert!(scheduler.tick().is_empty());
        assert_eq!(scheduler.tick(), vec!["a"]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn zero_delay_fires_on_next_tick() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay(1, 0);
        assert_eq!(scheduler.tick(), vec![1]);
    }

    #[test]
    fn equal_delays_fire_in_insertion_order() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay("first", 2);
        scheduler.schedule_after_delay("second", 2);
        scheduler.schedule_after_delay("early", 1);
        assert_eq!(scheduler.tick(), vec!["early"]);
        assert_eq!(scheduler.tick(), vec!["first", "second"]);
    }

    #[test]
    fn cancel_all_prevents_every_pending_task() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay(5, 5);
        scheduler.schedule_after_delay(10, 10);
        scheduler.schedule_after_delay(15, 15);
        assert_eq!(scheduler.pending_count(), 3);
        assert_eq!(scheduler.cancel_all(), 3);
        assert!(tick_n(&mut scheduler, 20).is_empty());
    }

    #[test]
    fn tasks_scheduled_after_a_tick_start_fresh() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay("old", 2);
        scheduler.tick();
        scheduler.schedule_after_delay("new", 2);
        assert_eq!(scheduler.tick(), vec!["old"]);
        assert_eq!(scheduler.tick(), vec!["new"]);
    }

    #[test]
    fn failing_task_does_not_stop_the_rest() {
        let mut scheduler = TurnScheduler::new();
        scheduler.schedule_after_delay(1, 1);
        scheduler.schedule_after_delay(2, 1);
        scheduler.schedule_after_delay(3, 1);
        let mut ran = Vec::new();
        let report = scheduler.tick_with(|n| {
            if n == 2 {
                return Err("boom");
            }
            ran.push(n);
            Ok(())
        });
        assert_eq!(ran, vec![1, 3]);
        assert_eq!(
            report,
            TickReport {
                executed: 2,
                failed: 1
            }
        );
        assert!(!scheduler.has_pending());
    }
}
