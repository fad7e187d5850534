//! Bounded worker pool for component generation.
//!
//! Each job's result lands in its own slot, so the collected results keep the
//! input order regardless of completion order. Parallel mode runs every job;
//! sequential mode stops at the first failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use stackforge_config::MAX_WORKERS;
use stackforge_utils::types::ComponentResult;

/// Pool sizing and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub parallel: bool,
    pub max_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: MAX_WORKERS,
        }
    }
}

impl PoolConfig {
    /// Workers actually spawned for `jobs` jobs: `min(MAX_WORKERS, max_workers, jobs)`,
    /// at least one.
    #[must_use]
    pub fn worker_count(&self, jobs: usize) -> usize {
        if self.parallel {
            self.max_workers.min(MAX_WORKERS).min(jobs).max(1)
        } else {
            1
        }
    }
}

/// What a pool run produced.
#[derive(Debug, Clone, Default)]
pub struct PoolOutcome {
    /// One slot per input job, in input order; `None` for skipped jobs
    pub results: Vec<Option<ComponentResult>>,
    /// Input index of the first job to fail, by completion order
    pub first_failure: Option<usize>,
    /// Input indices of jobs never started
    pub skipped: Vec<usize>,
}

impl PoolOutcome {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty() && self.results.iter().flatten().all(|r| r.success)
    }

    /// Results of jobs that ran, in input order.
    pub fn completed(&self) -> impl Iterator<Item = &ComponentResult> {
        self.results.iter().flatten()
    }

    #[must_use]
    pub fn into_completed(self) -> Vec<ComponentResult> {
        self.results.into_iter().flatten().collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    #[must_use]
    pub const fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    /// Run `work` over every job.
    ///
    /// `work` receives the job's input index. A panic in `work` propagates to
    /// the caller once every worker has stopped.
    pub fn run<J, F>(&self, jobs: &[J], work: F) -> PoolOutcome
    where
        J: Sync,
        F: Fn(usize, &J) -> ComponentResult + Sync,
    {
        let workers = self.config.worker_count(jobs.len());
        if jobs.is_empty() {
            return PoolOutcome::default();
        }
        if workers == 1 {
            return Self::run_sequential(jobs, &work, self.config.parallel);
        }

        tracing::debug!(jobs = jobs.len(), workers, "Starting worker pool");

        let next = AtomicUsize::new(0);
        let slots: Vec<OnceLock<ComponentResult>> = jobs.iter().map(|_| OnceLock::new()).collect();
        let first_failure: Mutex<Option<usize>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let next = &next;
                let slots = &slots;
                let first_failure = &first_failure;
                let work = &work;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(job) = jobs.get(index) else {
                            break;
                        };
                        tracing::trace!(worker, index, "Worker picked job");
                        let result = work(index, job);
                        if !result.success {
                            first_failure
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .get_or_insert(index);
                        }
                        // each index is claimed by exactly one worker
                        let _ = slots[index].set(result);
                    }
                });
            }
        });

        let first_failure = first_failure.into_inner().unwrap_or_else(PoisonError::into_inner);
        PoolOutcome {
            results: slots.into_iter().map(OnceLock::into_inner).collect(),
            first_failure,
            skipped: Vec::new(),
        }
    }

    fn run_sequential<J, F>(jobs: &[J], work: &F, run_all: bool) -> PoolOutcome
    where
        F: Fn(usize, &J) -> ComponentResult,
    {
        let mut outcome = PoolOutcome {
            results: Vec::with_capacity(jobs.len()),
            ..PoolOutcome::default()
        };
        for (index, job) in jobs.iter().enumerate() {
            if outcome.first_failure.is_some() && !run_all {
                outcome.results.push(None);
                outcome.skipped.push(index);
                continue;
            }
            let result = work(index, job);
            if !result.success && outcome.first_failure.is_none() {
                outcome.first_failure = Some(index);
            }
            outcome.results.push(Some(result));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_utils::types::ComponentType;
    use std::time::Duration;

    fn result(name: &str, success: bool) -> ComponentResult {
        let mut r = ComponentResult::pending(ComponentType::GoBackend, name);
        r.success = success;
        r
    }

    #[test]
    fn test_worker_count() {
        let cfg = PoolConfig {
            parallel: true,
            max_workers: 4,
        };
        assert_eq!(cfg.worker_count(2), 2);
        assert_eq!(cfg.worker_count(10), 4);
        assert_eq!(cfg.worker_count(0), 1);
        let seq = PoolConfig {
            parallel: false,
            max_workers: 8,
        };
        assert_eq!(seq.worker_count(10), 1);
    }

    #[test]
    fn test_worker_count_never_exceeds_max_workers() {
        let cfg = PoolConfig {
            parallel: true,
            max_workers: 8,
        };
        assert_eq!(cfg.worker_count(10), MAX_WORKERS);
        assert_eq!(cfg.worker_count(3), 3);

        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let jobs: Vec<usize> = (0..12).collect();
        let outcome = WorkerPool::new(cfg).run(&jobs, |i, _| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            active.fetch_sub(1, Ordering::SeqCst);
            result(&format!("c{i}"), true)
        });

        assert!(outcome.all_succeeded());
        assert!(peak.load(Ordering::SeqCst) <= MAX_WORKERS);
    }

    #[test]
    fn test_parallel_results_keep_input_order() {
        let pool = WorkerPool::new(PoolConfig::default());
        let jobs: Vec<u64> = vec![30, 0, 20, 5, 10];
        let outcome = pool.run(&jobs, |i, delay| {
            std::thread::sleep(Duration::from_millis(*delay));
            result(&format!("c{i}"), true)
        });

        let names: Vec<_> = outcome.completed().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["c0", "c1", "c2", "c3", "c4"]);
        assert!(outcome.all_succeeded());
    }

    #[test]
    fn test_parallel_runs_every_job_after_a_failure() {
        let pool = WorkerPool::new(PoolConfig::default());
        let ran = AtomicUsize::new(0);
        let jobs = vec![true, false, true, true];
        let outcome = pool.run(&jobs, |i, ok| {
            ran.fetch_add(1, Ordering::SeqCst);
            result(&format!("c{i}"), *ok)
        });

        assert_eq!(ran.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.first_failure, Some(1));
        assert!(outcome.skipped.is_empty());
        assert!(!outcome.all_succeeded());
    }

    #[test]
    fn test_sequential_stops_at_first_failure() {
        let pool = WorkerPool::new(PoolConfig {
            parallel: false,
            max_workers: 4,
        });
        let jobs = vec![true, false, true];
        let outcome = pool.run(&jobs, |i, ok| result(&format!("c{i}"), *ok));

        assert_eq!(outcome.first_failure, Some(1));
        assert_eq!(outcome.skipped, vec![2]);
        assert!(outcome.results[2].is_none());
        assert_eq!(outcome.completed().count(), 2);
    }

    #[test]
    fn test_single_worker_parallel_still_runs_everything() {
        let pool = WorkerPool::new(PoolConfig {
            parallel: true,
            max_workers: 1,
        });
        let jobs = vec![false, true];
        let outcome = pool.run(&jobs, |i, ok| result(&format!("c{i}"), *ok));
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.completed().count(), 2);
    }

    #[test]
    fn test_max_workers_bounds_concurrency() {
        let pool = WorkerPool::new(PoolConfig {
            parallel: true,
            max_workers: 2,
        });
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let jobs = vec![(); 6];
        pool.run(&jobs, |i, ()| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            active.fetch_sub(1, Ordering::SeqCst);
            result(&format!("c{i}"), true)
        });
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_empty_jobs() {
        let pool = WorkerPool::new(PoolConfig::default());
        let jobs: Vec<()> = Vec::new();
        let outcome = pool.run(&jobs, |i, ()| result(&format!("c{i}"), true));
        assert!(outcome.results.is_empty());
        assert!(outcome.all_succeeded());
    }
}
