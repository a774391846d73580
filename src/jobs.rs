use crate::status::ExitStatus;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A child started with `&` that the shell has not yet seen terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundJob {
    pub pid: Pid,
    /// Command line the job was started from, for reporting.
    pub command: String,
}

/// Background jobs owned by one shell session.
///
/// New jobs go to the front, so iteration yields the most recent job first.
/// The order carries no meaning beyond that.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: VecDeque<BackgroundJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly spawned background child.
    pub fn insert(&mut self, pid: Pid, command: &str) {
        debug!(%pid, command, "tracking background job");
        self.jobs.push_front(BackgroundJob {
            pid,
            command: command.to_owned(),
        });
    }

    /// Stop tracking `pid`. Unknown pids are ignored.
    pub fn remove(&mut self, pid: Pid) -> Option<BackgroundJob> {
        let idx = self.jobs.iter().position(|job| job.pid == pid)?;
        self.jobs.remove(idx)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.iter().any(|job| job.pid == pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackgroundJob> {
        self.jobs.iter()
    }

    /// Remove and yield every tracked job.
    pub fn drain(&mut self) -> impl Iterator<Item = BackgroundJob> + '_ {
        self.jobs.drain(..)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Collect every job that has terminated, without blocking.
    ///
    /// Finished jobs are removed and returned with their real (uncollapsed)
    /// status. A pid the kernel no longer considers our child is dropped
    /// without a report.
    pub fn reap(&mut self) -> Vec<(BackgroundJob, ExitStatus)> {
        let mut finished = Vec::new();
        let mut still_running = VecDeque::with_capacity(self.jobs.len());

        for job in self.jobs.drain(..) {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(wait_status) => match ExitStatus::from_wait(wait_status) {
                    Some(status) => {
                        debug!(pid = %job.pid, %status, "background job finished");
                        finished.push((job, status));
                    }
                    None => still_running.push_back(job),
                },
                Err(Errno::ECHILD) => {
                    debug!(pid = %job.pid, "background job already reaped elsewhere");
                }
                Err(err) => {
                    warn!(pid = %job.pid, %err, "polling background job failed");
                    still_running.push_back(job);
                }
            }
        }

        self.jobs = still_running;
        finished
    }
}
