use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::{
    sync::watch,
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{debug, error, info, warn};

use super::{Job, schedule::Schedule};
use crate::usecases::JobReport;

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives one [`Job`] on a [`Schedule`]. A tick never waits for the previous run, so a slow
/// run overlaps the next one and jobs must tolerate that.
pub struct ScheduledWorker {
    job: Arc<dyn Job>,
    schedule: Schedule,
    tz: Tz,
    running: Option<Running>,
}

impl ScheduledWorker {
    pub fn new(job: Arc<dyn Job>, schedule: Schedule, tz: Tz) -> Self {
        Self {
            job,
            schedule,
            tz,
            running: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    pub fn job(&self) -> Arc<dyn Job> {
        Arc::clone(&self.job)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start(&mut self) {
        if self.running.is_some() {
            warn!(worker = self.name(), "scheduler: start called twice, ignoring");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.job),
            self.schedule,
            self.tz,
            stop_rx,
        ));
        info!(worker = self.name(), schedule = ?self.schedule, tz = %self.tz, "scheduler: started");

        self.running = Some(Running { stop_tx, handle });
    }

    /// Prevents new ticks and waits for runs already in flight.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.stop_tx.send(true);
        if let Err(err) = running.handle.await {
            error!(worker = self.name(), error = %err, "scheduler: loop task failed");
        }
        info!(worker = self.name(), "scheduler: stopped");
    }

    /// Runs the job once in the caller's task, outside the schedule.
    pub async fn run_now(&self) -> Result<JobReport> {
        self.job.run().await
    }
}

async fn run_loop(job: Arc<dyn Job>, schedule: Schedule, tz: Tz, mut stop_rx: watch::Receiver<bool>) {
    let name = job.name();
    let mut in_flight: JoinSet<Result<JobReport>> = JoinSet::new();
    let mut next = schedule.next_after(Utc::now(), tz);
    debug!(worker = name, next = %next, "scheduler: next tick");

    loop {
        let wait = (next - Utc::now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let job = Arc::clone(&job);
                in_flight.spawn(async move { job.run().await });
                next = schedule.next_after(Utc::now(), tz);
                debug!(worker = name, next = %next, in_flight = in_flight.len(), "scheduler: tick spawned");
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_run(name, joined);
            }
        }
    }

    if !in_flight.is_empty() {
        info!(worker = name, in_flight = in_flight.len(), "scheduler: draining in-flight runs");
    }
    while let Some(joined) = in_flight.join_next().await {
        log_run(name, joined);
    }
}

fn log_run(name: &'static str, joined: Result<Result<JobReport>, JoinError>) {
    match joined {
        Ok(Ok(report)) => info!(worker = name, report = ?report, "scheduler: run finished"),
        Ok(Err(err)) => error!(worker = name, error = ?err, "scheduler: run failed"),
        Err(err) if err.is_panic() => error!(worker = name, error = %err, "scheduler: run panicked"),
        Err(err) => warn!(worker = name, error = %err, "scheduler: run cancelled"),
    }
}
