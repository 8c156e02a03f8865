//! Rotation scheduler
//!
//! Each configured database gets three recurring jobs (day, week, month),
//! driven by 6-field cron expressions. A single-threaded loop polls the
//! table every tick and runs due jobs inline, one after another. A job that
//! returns an error is dropped from the table for the rest of the process;
//! the other jobs keep running.

use crate::config::{Bucket, DatabaseConfig, ScheduleConfig};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use cron::Schedule;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Executes one scheduled backup
#[cfg_attr(test, mockall::automock)]
pub trait JobRunner {
    fn run_job(&mut self, database: &str, bucket: Bucket, now: NaiveDateTime) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub database: String,
    pub bucket: Bucket,
    schedule: Schedule,
    pub next_run: Option<DateTime<Local>>,
}

impl ScheduledJob {
    fn is_due(&self, now: &DateTime<Local>) -> bool {
        self.next_run.map_or(false, |next| next <= *now)
    }
}

pub struct Scheduler {
    /// Registration order: databases in config order, then day, week, month
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    /// Register the three jobs of every database, first runs computed from `now`
    pub fn new(schedule: &ScheduleConfig, databases: &[DatabaseConfig], now: DateTime<Local>) -> Result<Self> {
        let mut jobs = Vec::with_capacity(databases.len() * Bucket::ALL.len());

        for database in databases {
            for bucket in Bucket::ALL {
                let expression = schedule.expression(bucket);
                let parsed = Schedule::from_str(expression)
                    .map_err(|e| anyhow::anyhow!("{}", e))
                    .with_context(|| format!("Invalid {} schedule '{}'", bucket, expression))?;

                let next_run = parsed.after(&now).next();
                if next_run.is_none() {
                    warn!("{} job for '{}' will never fire ('{}')", bucket, database.db_name, expression);
                }

                jobs.push(ScheduledJob {
                    database: database.db_name.clone(),
                    bucket,
                    schedule: parsed,
                    next_run,
                });
            }
        }

        Ok(Self { jobs })
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Jobs of one database
    pub fn jobs_for<'s>(&'s self, database: &'s str) -> impl Iterator<Item = &'s ScheduledJob> + 's {
        self.jobs.iter().filter(move |job| job.database == database)
    }

    /// Earliest upcoming run across all jobs
    pub fn next_due(&self) -> Option<DateTime<Local>> {
        self.jobs.iter().filter_map(|job| job.next_run).min()
    }

    /// Run every job due at `now`, earliest due time first, ties in
    /// registration order. Returns how many jobs ran.
    pub fn run_pending(&mut self, now: DateTime<Local>, runner: &mut dyn JobRunner) -> usize {
        let mut due: Vec<usize> = (0..self.jobs.len())
            .filter(|&i| self.jobs[i].is_due(&now))
            .collect();
        due.sort_by_key(|&i| (self.jobs[i].next_run, i));

        let mut cancelled = Vec::new();
        for &i in &due {
            let job = &mut self.jobs[i];
            debug!("Running {} job for '{}'", job.bucket, job.database);

            match runner.run_job(&job.database, job.bucket, now.naive_local()) {
                Ok(()) => {
                    job.next_run = job.schedule.after(&now).next();
                }
                Err(e) => {
                    error!(
                        "{} job for '{}' failed and is cancelled: {:#}",
                        job.bucket, job.database, e
                    );
                    cancelled.push(i);
                }
            }
        }

        if !cancelled.is_empty() {
            let mut index = 0;
            self.jobs.retain(|_| {
                let keep = !cancelled.contains(&index);
                index += 1;
                keep
            });
        }

        due.len()
    }

    /// Poll forever, sleeping `tick` between passes
    pub fn run_forever(&mut self, runner: &mut dyn JobRunner, tick: Duration) {
        info!("Scheduler started with {} job(s)", self.jobs.len());
        if let Some(next) = self.next_due() {
            info!("Next run at {}", next.format("%Y-%m-%d %H:%M:%S"));
        }

        loop {
            self.run_pending(Local::now(), runner);
            thread::sleep(tick);
        }
    }
}
