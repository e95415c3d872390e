// src/pipeline/scheduler.rs

//! Periodic driver for the poll and tick cycles.
//!
//! Each cadence is its own task on a `tokio::time::interval`. A cadence
//! awaits its cycle before the next tick, so it never overlaps itself, while
//! the two cadences interleave freely. Every cycle runs in a spawned task so
//! that a panic is caught at the join handle and reported like an error.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::{PollCycle, TickCycle};
use crate::services::ErrorReporter;

pub const NEWS_CONTEXT: &str = "news_loop 에러";
pub const TICK_CONTEXT: &str = "tick_loop 에러";

/// Owns both cadences and the bootstrap timer.
pub struct Scheduler {
    poll: Arc<PollCycle>,
    tick: Arc<TickCycle>,
    reporter: Arc<ErrorReporter>,
    poll_period: Duration,
    tick_period: Duration,
    bootstrap_delay: Duration,
}

impl Scheduler {
    pub fn new(
        poll: Arc<PollCycle>,
        tick: Arc<TickCycle>,
        reporter: Arc<ErrorReporter>,
        config: &Config,
    ) -> Self {
        Self {
            poll,
            tick,
            reporter,
            poll_period: Duration::from_secs(config.poller.interval_secs),
            tick_period: Duration::from_secs(config.ticker.interval_secs),
            bootstrap_delay: Duration::from_secs(config.poller.bootstrap_delay_secs),
        }
    }

    /// Spawn both cadences. The first invocation of each runs immediately.
    pub fn start(&self) -> SchedulerHandle {
        let tick = self.tick.clone();
        let tick_task = run_periodic(
            TICK_CONTEXT,
            self.tick_period,
            self.reporter.clone(),
            move || {
                let tick = tick.clone();
                async move {
                    let sent = tick.run().await?;
                    if !sent.is_empty() {
                        log::debug!("[tick] sent {} alert(s)", sent.len());
                    }
                    Ok::<(), AppError>(())
                }
            },
        );

        let poll = self.poll.clone();
        let poll_task = run_periodic(
            NEWS_CONTEXT,
            self.poll_period,
            self.reporter.clone(),
            move || {
                let poll = poll.clone();
                async move {
                    let report = poll.run().await?;
                    if !report.skipped {
                        log::debug!(
                            "[news] cycle done: {} new, {} announced",
                            report.new_items(),
                            report.announced()
                        );
                    }
                    Ok::<(), AppError>(())
                }
            },
        );
        let gate_timer = self.poll.gate().arm(self.bootstrap_delay);

        log::info!(
            "Scheduler started (news every {:?}, ticks every {:?}, bootstrap {:?})",
            self.poll_period,
            self.tick_period,
            self.bootstrap_delay
        );

        SchedulerHandle {
            tasks: vec![tick_task, poll_task, gate_timer],
        }
    }
}

/// Running cadences. Dropping the handle leaves them running.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop every cadence and wait for the tasks to wind down.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            let _ = task.await;
        }
        log::info!("Scheduler stopped");
    }
}

/// Run `job` every `period`, reporting failures under `context`.
pub fn run_periodic<F, Fut>(
    context: &'static str,
    period: Duration,
    reporter: Arc<ErrorReporter>,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_guarded(context, &reporter, job()).await;
        }
    })
}

/// Run one cycle in its own task. Returns `true` on success.
pub async fn run_guarded<Fut>(context: &str, reporter: &ErrorReporter, cycle: Fut) -> bool
where
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    match tokio::spawn(cycle).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            reporter.report(context, &e).await;
            false
        }
        Err(e) if e.is_panic() => {
            let err = AppError::Panic(panic_message(e.into_panic()));
            reporter.report(context, &err).await;
            false
        }
        Err(e) => {
            log::debug!("{context}: cycle cancelled: {e}");
            false
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
