//! Dependency-aware job queue
//!
//! Jobs are keyed by [`JobId`]. Enqueueing an id that is still queued or
//! running collapses into the existing job; once a job has finished the same
//! id may be enqueued again. A job starts only after every job it depends on
//! has run to an end state (success, failure or timeout) and a worker slot of
//! its queue is free.
//!
//! Dependencies are recorded in a DAG (edge: dependency -> dependent) used to
//! reject cycles and to report the execution order.
//!
//! Finished jobs are retained up to a cap, oldest forgotten first. A finished
//! job that a queued or running job still depends on is kept past the cap.

use crate::error::SchedulerError;
use crate::id::{JobId, JobKind};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

/// Future produced by a job body
pub type JobFuture = BoxFuture<'static, JobReport>;

type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for dependencies or a worker slot
    Queued,
    /// Body is executing
    Running,
    /// Body reported success
    Completed,
    /// Body reported failure or panicked
    Failed,
    /// Body exceeded the job timeout and was dropped
    TimedOut,
}

impl JobStatus {
    /// Whether the job has run to an end state
    #[inline]
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// What a job body returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    /// Whether the body succeeded
    pub success: bool,
    /// One-line summary
    pub summary: String,
}

impl JobReport {
    /// Successful run
    #[must_use]
    pub fn completed(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: summary.into(),
        }
    }

    /// Failed run
    #[must_use]
    pub fn failed(summary: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: summary.into(),
        }
    }
}

/// Job descriptor
pub struct JobSpec {
    /// Unique id
    pub id: JobId,
    /// Artifact produced
    pub kind: JobKind,
    /// Human-readable title
    pub title: String,
    /// Queue name
    pub queue: String,
    /// Upper bound on the body's run time
    pub timeout: Duration,
    /// Jobs that must have run first
    pub depends_on: Vec<JobId>,
    run: JobFn,
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("queue", &self.queue)
            .field("timeout", &self.timeout)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

impl JobSpec {
    /// Default queue of new job specs
    pub const DEFAULT_QUEUE: &'static str = "default";
    /// Default timeout of new job specs
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

    /// Create a job running `run` each time it executes
    pub fn new<F>(id: JobId, kind: JobKind, run: F) -> Self
    where
        F: Fn() -> JobFuture + Send + Sync + 'static,
    {
        Self {
            title: format!("{kind} job"),
            id,
            kind,
            queue: Self::DEFAULT_QUEUE.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            depends_on: Vec::new(),
            run: Arc::new(run),
        }
    }

    /// Set title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set queue
    #[inline]
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Set timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a dependency
    #[inline]
    #[must_use]
    pub fn depends_on(mut self, job: JobId) -> Self {
        self.depends_on.push(job);
        self
    }
}

/// Snapshot of a job's bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub title: String,
    pub queue: String,
    pub depends_on: Vec<JobId>,
    pub status: JobStatus,
    pub timeout_secs: u64,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    /// Number of times this id has been enqueued
    pub runs: u32,
}

/// Result of [`JobQueue::enqueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new run was scheduled
    Enqueued(JobId),
    /// A run with this id is already queued or running
    Duplicate(JobId),
}

impl EnqueueOutcome {
    /// Job id either way
    #[must_use]
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Enqueued(id) | Self::Duplicate(id) => id,
        }
    }

    /// Whether a new run was scheduled
    #[must_use]
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued(_))
    }
}

struct JobEntry {
    record: JobRecord,
    status: Arc<watch::Sender<JobStatus>>,
}

#[derive(Default)]
struct QueueState {
    graph: DiGraph<JobId, ()>,
    nodes: HashMap<JobId, NodeIndex>,
    entries: HashMap<JobId, JobEntry>,
}

impl QueueState {
    fn node(&mut self, id: &JobId) -> NodeIndex {
        if let Some(&node) = self.nodes.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), node);
        node
    }

    fn has_waiting_dependent(&self, id: &JobId) -> bool {
        let Some(&node) = self.nodes.get(id) else {
            return false;
        };
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .any(|n| {
                self.entries
                    .get(&self.graph[n])
                    .is_some_and(|e| !e.record.status.is_finished())
            })
    }

    fn forget(&mut self, id: &JobId) {
        self.entries.remove(id);
        if let Some(node) = self.nodes.remove(id) {
            self.graph.remove_node(node);
            // the last node was swapped into the freed index
            if let Some(moved) = self.graph.node_weight(node) {
                self.nodes.insert(moved.clone(), node);
            }
        }
    }

    /// Forget the oldest finished jobs beyond `keep`
    fn prune_finished(&mut self, keep: usize) -> usize {
        let mut finished: Vec<(DateTime<Utc>, JobId)> = self
            .entries
            .values()
            .filter(|e| e.record.status.is_finished())
            .map(|e| (e.record.finished_at.unwrap_or(e.record.enqueued_at), e.record.id.clone()))
            .collect();
        if finished.len() <= keep {
            return 0;
        }
        finished.sort();
        let mut excess = finished.len() - keep;
        let mut pruned = 0;
        for (_, id) in finished {
            if excess == 0 {
                break;
            }
            if self.has_waiting_dependent(&id) {
                continue;
            }
            self.forget(&id);
            excess -= 1;
            pruned += 1;
        }
        pruned
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    semaphores: DashMap<String, Arc<Semaphore>>,
    workers_per_queue: usize,
    retained: usize,
    active: watch::Sender<usize>,
}

impl QueueInner {
    fn semaphore(&self, queue: &str) -> Arc<Semaphore> {
        self.semaphores
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.workers_per_queue)))
            .clone()
    }

    fn update<F: FnOnce(&mut JobRecord)>(&self, id: &JobId, f: F) {
        if let Some(entry) = self.state.lock().entries.get_mut(id) {
            f(&mut entry.record);
        }
    }

    fn finish(&self, id: &JobId, status: JobStatus, summary: &str) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(id) {
            entry.record.status = status;
            entry.record.finished_at = Some(Utc::now());
            entry.record.summary = Some(summary.to_string());
        }
        let pruned = state.prune_finished(self.retained);
        if pruned > 0 {
            tracing::debug!(pruned, retained = self.retained, "finished jobs forgotten");
        }
    }
}

/// Shared handle to the job queue
///
/// Cloning is cheap; all clones schedule into the same queue. Methods that
/// start jobs must be called within a Tokio runtime.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("JobQueue")
            .field("jobs", &state.entries.len())
            .field("workers_per_queue", &self.inner.workers_per_queue)
            .field("retained", &self.inner.retained)
            .finish()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

impl JobQueue {
    /// Finished jobs kept by default
    pub const DEFAULT_RETAINED: usize = 1024;

    /// Queue running up to `workers_per_queue` jobs per queue name
    #[must_use]
    pub fn new(workers_per_queue: usize) -> Self {
        Self::with_limits(workers_per_queue, Self::DEFAULT_RETAINED)
    }

    /// Queue keeping at most `retained` finished jobs (at least one)
    #[must_use]
    pub fn with_limits(workers_per_queue: usize, retained: usize) -> Self {
        let (active, _) = watch::channel(0);
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                semaphores: DashMap::new(),
                workers_per_queue: workers_per_queue.max(1),
                retained: retained.max(1),
                active,
            }),
        }
    }

    /// Override the worker count of one queue
    #[must_use]
    pub fn with_queue_workers(self, queue: &str, workers: usize) -> Self {
        self.inner
            .semaphores
            .insert(queue.to_string(), Arc::new(Semaphore::new(workers.max(1))));
        self
    }

    /// Schedule a job
    ///
    /// # Errors
    /// Unknown or self dependencies, or dependencies that would form a cycle.
    /// Nothing is scheduled on error.
    pub fn enqueue(&self, spec: JobSpec) -> Result<EnqueueOutcome, SchedulerError> {
        let mut state = self.inner.state.lock();

        let previous_runs = match state.entries.get(&spec.id) {
            Some(entry) if !entry.record.status.is_finished() => {
                tracing::debug!(job_id = %spec.id, status = ?entry.record.status, "duplicate enqueue collapsed");
                return Ok(EnqueueOutcome::Duplicate(spec.id));
            }
            Some(entry) => entry.record.runs,
            None => 0,
        };

        let mut waits = Vec::with_capacity(spec.depends_on.len());
        for dep in &spec.depends_on {
            if *dep == spec.id {
                return Err(SchedulerError::SelfDependency(spec.id.clone()));
            }
            let entry = state
                .entries
                .get(dep)
                .ok_or_else(|| SchedulerError::UnknownDependency {
                    job: spec.id.clone(),
                    dependency: dep.clone(),
                })?;
            waits.push(entry.status.subscribe());
        }

        if let Some(&node) = state.nodes.get(&spec.id) {
            for dep in &spec.depends_on {
                let dep_node = state.nodes[dep];
                if has_path_connecting(&state.graph, node, dep_node, None) {
                    return Err(SchedulerError::CycleDetected(spec.id.clone()));
                }
            }
        }

        let node = state.node(&spec.id);
        while let Some(edge) = state.graph.first_edge(node, Direction::Incoming) {
            state.graph.remove_edge(edge);
        }
        for dep in &spec.depends_on {
            let dep_node = state.nodes[dep];
            state.graph.update_edge(dep_node, node, ());
        }

        let (tx, _) = watch::channel(JobStatus::Queued);
        let status = Arc::new(tx);
        let record = JobRecord {
            id: spec.id.clone(),
            kind: spec.kind,
            title: spec.title.clone(),
            queue: spec.queue.clone(),
            depends_on: spec.depends_on.clone(),
            status: JobStatus::Queued,
            timeout_secs: spec.timeout.as_secs(),
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            summary: None,
            runs: previous_runs + 1,
        };
        state.entries.insert(
            spec.id.clone(),
            JobEntry {
                record,
                status: Arc::clone(&status),
            },
        );
        drop(state);

        self.inner.active.send_modify(|n| *n += 1);
        tracing::info!(
            job_id = %spec.id,
            queue = %spec.queue,
            depends_on = spec.depends_on.len(),
            "job enqueued"
        );
        let id = spec.id.clone();
        tokio::spawn(drive(Arc::clone(&self.inner), spec, waits, status));
        Ok(EnqueueOutcome::Enqueued(id))
    }

    /// Current status of a job
    #[must_use]
    pub fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.inner.state.lock().entries.get(id).map(|e| e.record.status)
    }

    /// Bookkeeping of a job
    #[must_use]
    pub fn record(&self, id: &JobId) -> Option<JobRecord> {
        self.inner.state.lock().entries.get(id).map(|e| e.record.clone())
    }

    /// All known jobs, oldest first
    #[must_use]
    pub fn jobs(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self
            .inner
            .state
            .lock()
            .entries
            .values()
            .map(|e| e.record.clone())
            .collect();
        jobs.sort_by(|a, b| a.enqueued_at.cmp(&b.enqueued_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Number of known jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Whether no job is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Job ids in an order that respects every dependency
    ///
    /// # Errors
    /// [`SchedulerError::CycleDetected`] if the recorded edges form a cycle
    pub fn execution_order(&self) -> Result<Vec<JobId>, SchedulerError> {
        let state = self.inner.state.lock();
        toposort(&state.graph, None)
            .map(|order| order.into_iter().map(|n| state.graph[n].clone()).collect())
            .map_err(|cycle| SchedulerError::CycleDetected(state.graph[cycle.node_id()].clone()))
    }

    /// Wait until the current run of `id` has finished
    ///
    /// # Errors
    /// [`SchedulerError::JobNotFound`] for unknown ids, or when the finished
    /// job was already forgotten
    pub async fn wait(&self, id: &JobId) -> Result<JobRecord, SchedulerError> {
        let mut rx = {
            let state = self.inner.state.lock();
            state
                .entries
                .get(id)
                .ok_or_else(|| SchedulerError::JobNotFound(id.clone()))?
                .status
                .subscribe()
        };
        // the entry keeps its sender alive until the job is replaced
        let _ = rx.wait_for(|s| s.is_finished()).await;
        self.record(id).ok_or_else(|| SchedulerError::JobNotFound(id.clone()))
    }

    /// Wait until no job is queued or running
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.active.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn drive(
    inner: Arc<QueueInner>,
    spec: JobSpec,
    dependencies: Vec<watch::Receiver<JobStatus>>,
    status: Arc<watch::Sender<JobStatus>>,
) {
    for mut dep in dependencies {
        let _ = dep.wait_for(|s| s.is_finished()).await;
    }

    let semaphore = inner.semaphore(&spec.queue);
    let (final_status, summary) = match semaphore.acquire_owned().await {
        Ok(_permit) => {
            inner.update(&spec.id, |r| {
                r.status = JobStatus::Running;
                r.started_at = Some(Utc::now());
            });
            status.send_replace(JobStatus::Running);
            tracing::debug!(job_id = %spec.id, queue = %spec.queue, "job started");

            let body = AssertUnwindSafe((spec.run)()).catch_unwind();
            match tokio::time::timeout(spec.timeout, body).await {
                Ok(Ok(report)) if report.success => (JobStatus::Completed, report.summary),
                Ok(Ok(report)) => (JobStatus::Failed, report.summary),
                Ok(Err(panic)) => (
                    JobStatus::Failed,
                    format!("job panicked: {}", panic_message(panic.as_ref())),
                ),
                Err(_) => (
                    JobStatus::TimedOut,
                    format!("timed out after {}s", spec.timeout.as_secs()),
                ),
            }
        }
        Err(_) => (JobStatus::Failed, "queue closed".to_string()),
    };

    inner.finish(&spec.id, final_status, &summary);
    match final_status {
        JobStatus::Completed => {
            tracing::info!(job_id = %spec.id, queue = %spec.queue, %summary, "job completed");
        }
        _ => {
            tracing::warn!(job_id = %spec.id, queue = %spec.queue, status = ?final_status, %summary, "job did not complete");
        }
    }
    status.send_replace(final_status);
    inner.active.send_modify(|n| *n = n.saturating_sub(1));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(id: &str, counter: &Arc<AtomicUsize>) -> JobSpec {
        let counter = Arc::clone(counter);
        JobSpec::new(JobId::new(id), JobKind::Preview, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                JobReport::completed("ok")
            }
            .boxed()
        })
    }

    fn gated_job(id: &str, gate: &Arc<tokio::sync::Notify>) -> JobSpec {
        let gate = Arc::clone(gate);
        JobSpec::new(JobId::new(id), JobKind::Condense, move || {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                JobReport::completed("released")
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn duplicate_enqueue_collapses() {
        let queue = JobQueue::new(1);
        let gate = Arc::new(tokio::sync::Notify::new());
        assert!(queue.enqueue(gated_job("a", &gate)).unwrap().is_enqueued());
        let second = queue.enqueue(gated_job("a", &gate)).unwrap();
        assert_eq!(second, EnqueueOutcome::Duplicate(JobId::new("a")));
        gate.notify_one();
        let record = queue.wait(&JobId::new("a")).await.unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.runs, 1);
    }

    #[tokio::test]
    async fn finished_job_can_run_again() {
        let queue = JobQueue::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        queue.enqueue(counting_job("a", &counter)).unwrap();
        queue.wait_idle().await;
        assert!(queue.enqueue(counting_job("a", &counter)).unwrap().is_enqueued());
        queue.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(queue.record(&JobId::new("a")).unwrap().runs, 2);
    }

    #[tokio::test]
    async fn dependent_waits_for_dependency() {
        let queue = JobQueue::new(4);
        let gate = Arc::new(tokio::sync::Notify::new());
        let counter = Arc::new(AtomicUsize::new(0));
        queue.enqueue(gated_job("p_0_condense", &gate)).unwrap();
        queue
            .enqueue(counting_job("p_0_preview", &counter).depends_on(JobId::new("p_0_condense")))
            .unwrap();

        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(queue.status(&JobId::new("p_0_preview")), Some(JobStatus::Queued));

        gate.notify_one();
        queue.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_dependency_still_releases_dependent() {
        let queue = JobQueue::new(1);
        let failing = JobSpec::new(JobId::new("dep"), JobKind::Condense, || {
            async { JobReport::failed("boom") }.boxed()
        });
        let counter = Arc::new(AtomicUsize::new(0));
        queue.enqueue(failing).unwrap();
        queue
            .enqueue(counting_job("job", &counter).depends_on(JobId::new("dep")))
            .unwrap();
        queue.wait_idle().await;
        assert_eq!(queue.status(&JobId::new("dep")), Some(JobStatus::Failed));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_and_self_dependencies_are_rejected() {
        let queue = JobQueue::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        let err = queue
            .enqueue(counting_job("a", &counter).depends_on(JobId::new("missing")))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownDependency { .. }));
        let err = queue
            .enqueue(counting_job("a", &counter).depends_on(JobId::new("a")))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::SelfDependency(_)));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn cycles_are_rejected() {
        let queue = JobQueue::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        queue.enqueue(counting_job("a", &counter)).unwrap();
        queue.wait_idle().await;
        queue
            .enqueue(counting_job("b", &counter).depends_on(JobId::new("a")))
            .unwrap();
        queue.wait_idle().await;
        let err = queue
            .enqueue(counting_job("a", &counter).depends_on(JobId::new("b")))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::CycleDetected(_)));
        assert_eq!(
            queue.execution_order().unwrap(),
            vec![JobId::new("a"), JobId::new("b")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_job() {
        let queue = JobQueue::new(1);
        let slow = JobSpec::new(JobId::new("slow"), JobKind::Preview, || {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                JobReport::completed("never")
            }
            .boxed()
        })
        .with_timeout(Duration::from_secs(60));
        queue.enqueue(slow).unwrap();
        let record = queue.wait(&JobId::new("slow")).await.unwrap();
        assert_eq!(record.status, JobStatus::TimedOut);
    }

    #[tokio::test]
    async fn panicking_job_fails_without_poisoning_queue() {
        let queue = JobQueue::new(1);
        fn explode() -> JobReport {
            panic!("renderer exploded")
        }
        let bad = JobSpec::new(JobId::new("bad"), JobKind::Preview, || async { explode() }.boxed());
        queue.enqueue(bad).unwrap();
        let record = queue.wait(&JobId::new("bad")).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.summary.unwrap().contains("renderer exploded"));

        let counter = Arc::new(AtomicUsize::new(0));
        queue.enqueue(counting_job("good", &counter)).unwrap();
        queue.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queue_limits_concurrency() {
        let queue = JobQueue::new(1).with_queue_workers("wide", 3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for i in 0..6 {
            let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
            let spec = JobSpec::new(JobId::new(format!("j{i}")), JobKind::Preview, move || {
                let (running, peak) = (Arc::clone(&running), Arc::clone(&peak));
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    JobReport::completed("ok")
                }
                .boxed()
            })
            .with_queue("narrow");
            queue.enqueue(spec).unwrap();
        }
        queue.wait_idle().await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finished_jobs_are_pruned_unless_still_depended_on() {
        let queue = JobQueue::with_limits(1, 1);
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        queue.enqueue(counting_job("a", &counter)).unwrap();
        queue.wait_idle().await;
        queue.enqueue(counting_job("dep", &counter)).unwrap();
        queue.wait_idle().await;
        assert_eq!(queue.status(&JobId::new("a")), None);
        assert_eq!(queue.status(&JobId::new("dep")), Some(JobStatus::Completed));

        queue.enqueue(gated_job("gate", &gate)).unwrap();
        while queue.status(&JobId::new("gate")) != Some(JobStatus::Running) {
            tokio::task::yield_now().await;
        }
        let child = counting_job("child", &counter)
            .with_queue(JobSpec::DEFAULT_QUEUE)
            .depends_on(JobId::new("dep"));
        queue.enqueue(child).unwrap();
        queue.enqueue(counting_job("other", &counter).with_queue("side")).unwrap();
        let _ = queue.wait(&JobId::new("other")).await;

        // child is waiting for a worker, so its dependency stays
        assert_eq!(queue.status(&JobId::new("child")), Some(JobStatus::Queued));
        assert_eq!(queue.status(&JobId::new("dep")), Some(JobStatus::Completed));
        assert_eq!(queue.status(&JobId::new("other")), None);
        let order = queue.execution_order().unwrap();
        let position = |id: &str| order.iter().position(|j| j.as_str() == id).unwrap();
        assert!(position("dep") < position("child"));

        gate.notify_one();
        queue.wait_idle().await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.status(&JobId::new("child")), Some(JobStatus::Completed));
        assert_eq!(queue.execution_order().unwrap(), vec![JobId::new("child")]);
    }

    #[tokio::test]
    async fn wait_on_unknown_job() {
        let queue = JobQueue::new(1);
        assert!(matches!(
            queue.wait(&JobId::new("nope")).await,
            Err(SchedulerError::JobNotFound(_))
        ));
    }
}
