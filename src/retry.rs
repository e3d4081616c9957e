//! Delayed retries for platform operations.
//!
//! GitHub's REST read path is eventually consistent: right after a push the
//! commit listing can 404 or still end at the old head, and a merge can be
//! rejected because the head moved. Operations that hit such a condition are
//! retried on a caller-supplied schedule of delays.
//!
//! - A zero first delay runs the first try inline, so the caller gets a
//!   synchronous outcome unless that try asks to be retried.
//! - Every remaining try runs in a background task tracked by the scheduler.
//!   One task drives the whole chain of tries for an operation.
//! - [`RetryScheduler::interrupt`] wakes every pending wait immediately so a
//!   shutting-down process flushes its retries instead of waiting them out.
//! - [`RetryScheduler::drain`] waits until no scheduled task is in flight.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// The result of one try, plus whether the operation wants another try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt<T> {
    pub outcome: T,
    pub retryable: bool,
}

impl<T> Attempt<T> {
    /// A final outcome; no further tries are made.
    pub fn done(outcome: T) -> Self {
        Attempt {
            outcome,
            retryable: false,
        }
    }

    /// An outcome that should be retried if the schedule has delays left.
    ///
    /// If the schedule is exhausted, `outcome` becomes the final result.
    pub fn retry(outcome: T) -> Self {
        Attempt {
            outcome,
            retryable: true,
        }
    }
}

/// Position of a try within its schedule, passed to the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryInfo {
    /// 1-based number of this try.
    pub number: usize,
    /// Tries still scheduled after this one.
    pub remaining: usize,
}

impl TryInfo {
    /// Returns true if a retryable outcome of this try will not be retried.
    pub fn is_last(&self) -> bool {
        self.remaining == 0
    }
}

/// How an operation ended, from the caller's point of view.
#[derive(Debug)]
pub enum Eventual<T> {
    /// The operation finished inline with this outcome.
    Completed(T),

    /// The operation continues in a tracked background task.
    ///
    /// Awaiting the handle yields the final outcome. Dropping it detaches
    /// the task; it still counts towards [`RetryScheduler::drain`].
    InProgress(JoinHandle<T>),
}

/// Errors reported synchronously when an operation cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("cannot schedule an operation with an empty list of try delays")]
    EmptySchedule,
}

/// Schedules operations on delay lists and tracks the background tries.
///
/// Cloning is cheap and all clones share the same interrupt signal and
/// in-flight accounting.
#[derive(Debug, Clone, Default)]
pub struct RetryScheduler {
    tracker: TaskTracker,
    interrupt: CancellationToken,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `operation` according to `delays`.
    ///
    /// `delays[i]` is the wait before try `i + 1`. The operation is tried
    /// until it returns a non-retryable [`Attempt`] or the delays run out.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::EmptySchedule`] without invoking the
    /// operation if `delays` is empty.
    pub async fn run_with_retries<T, F, Fut>(
        &self,
        delays: &[Duration],
        operation: F,
    ) -> Result<Eventual<T>, ScheduleError>
    where
        T: Debug + Send + 'static,
        F: FnMut(TryInfo) -> Fut + Send + 'static,
        Fut: Future<Output = Attempt<T>> + Send + 'static,
    {
        let mut task = RetryTask {
            remaining: delays.iter().copied().collect(),
            operation,
            tries: 0,
        };
        let first = task
            .remaining
            .pop_front()
            .ok_or(ScheduleError::EmptySchedule)?;

        if !first.is_zero() {
            return Ok(Eventual::InProgress(self.spawn(task, first)));
        }

        let attempt = task.try_once().await;
        match task.remaining.pop_front() {
            Some(next) if attempt.retryable => {
                debug!(outcome = ?attempt.outcome, "Operation will be retried");
                Ok(Eventual::InProgress(self.spawn(task, next)))
            }
            _ => Ok(Eventual::Completed(attempt.outcome)),
        }
    }

    fn spawn<T, F, Fut>(&self, task: RetryTask<F>, delay: Duration) -> JoinHandle<T>
    where
        T: Debug + Send + 'static,
        F: FnMut(TryInfo) -> Fut + Send + 'static,
        Fut: Future<Output = Attempt<T>> + Send + 'static,
    {
        info!(delay = %humantime::format_duration(delay), "Scheduled an asynchronous try");
        let interrupt = self.interrupt.clone();
        self.tracker.spawn(task.run(delay, interrupt))
    }

    /// Wakes every pending and future wait immediately.
    ///
    /// Scheduled tries still run; they just stop waiting for their delay.
    pub fn interrupt(&self) {
        self.interrupt.cancel();
    }

    /// Returns true once [`interrupt`](Self::interrupt) has been called.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Returns the number of scheduled tasks that have not finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every scheduled task has finished.
    ///
    /// Tasks scheduled while draining are waited for as well.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// The remaining schedule of one operation. Consumed one delay per try.
struct RetryTask<F> {
    remaining: VecDeque<Duration>,
    operation: F,
    tries: usize,
}

impl<F> RetryTask<F> {
    async fn try_once<T, Fut>(&mut self) -> Attempt<T>
    where
        F: FnMut(TryInfo) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        self.tries += 1;
        let info = TryInfo {
            number: self.tries,
            remaining: self.remaining.len(),
        };
        (self.operation)(info).await
    }

    async fn run<T, Fut>(mut self, first_delay: Duration, interrupt: CancellationToken) -> T
    where
        T: Debug,
        F: FnMut(TryInfo) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut delay = first_delay;
        loop {
            wait(delay, &interrupt).await;
            let attempt = self.try_once().await;
            match self.remaining.pop_front() {
                Some(next) if attempt.retryable => {
                    debug!(
                        try_number = self.tries,
                        outcome = ?attempt.outcome,
                        next_delay = %humantime::format_duration(next),
                        "Asynchronous try will be retried"
                    );
                    delay = next;
                }
                _ => {
                    info!(
                        try_number = self.tries,
                        outcome = ?attempt.outcome,
                        "Finishing an asynchronous operation"
                    );
                    return attempt.outcome;
                }
            }
        }
    }
}

/// Sleeps for `delay`, returning early if `interrupt` fires.
async fn wait(delay: Duration, interrupt: &CancellationToken) {
    if delay.is_zero() || interrupt.is_cancelled() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = interrupt.cancelled() => {
            info!("Received an interrupt; starting a scheduled try immediately");
        }
    }
}
