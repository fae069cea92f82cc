//! Bounded task queue and worker pool
//!
//! A [`Pipeline`] owns one bounded FIFO queue and a fixed set of workers.
//! Lifecycle: [`Pipeline::start`] → [`Pipeline::submit`]* → [`Pipeline::close_and_join`].
//!
//! - `submit` waits while the queue is full, throttling a fast producer.
//! - Closing the queue stops admission only. Workers keep draining what is
//!   queued and exit once the queue is closed and empty.
//! - `close_and_join` returns after every worker has exited.
//!
//! Each task runs on its own tokio task, so an error, a panic or a timeout in
//! one task is counted and logged without touching its siblings or the pool.

pub mod enumerate;
pub mod vocabulary;

pub use enumerate::for_each_spec;
pub use vocabulary::{compute_vocabularies, ComputeVocabularyTask};

use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 64;

/// Default queue bound
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// One unit of pipeline work
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Task identity used in logs
    fn name(&self) -> String;

    async fn run(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Per-task deadline; `None` lets tasks run indefinitely
    pub task_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_timeout: None,
        }
    }
}

/// Outcome counts of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl PipelineReport {
    /// Tasks that were queued but never picked up (after cancellation)
    pub fn not_run(&self) -> usize {
        self.submitted
            .saturating_sub(self.succeeded + self.failed + self.timed_out)
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    timed_out: AtomicUsize,
}

impl Counters {
    fn report(&self) -> PipelineReport {
        PipelineReport {
            submitted: self.submitted.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
        }
    }
}

type Queue = Arc<Mutex<mpsc::Receiver<Box<dyn Task>>>>;

/// Running worker pool
pub struct Pipeline {
    tx: mpsc::Sender<Box<dyn Task>>,
    workers: JoinSet<()>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Spawn the workers; they idle until tasks arrive
    pub fn start(config: PipelineConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(RegistryError::invalid("pipeline needs at least one worker"));
        }
        if config.queue_capacity == 0 {
            return Err(RegistryError::invalid("pipeline queue capacity must be positive"));
        }

        let (tx, rx) = mpsc::channel::<Box<dyn Task>>(config.queue_capacity);
        let queue: Queue = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();

        let mut workers = JoinSet::new();
        for id in 0..config.workers {
            workers.spawn(worker(
                id,
                queue.clone(),
                counters.clone(),
                cancel.clone(),
                config.task_timeout,
            ));
        }
        info!(
            "Pipeline started: {} workers, queue capacity {}",
            config.workers, config.queue_capacity
        );

        Ok(Self {
            tx,
            workers,
            counters,
            cancel,
        })
    }

    /// Enqueue a task, waiting while the queue is full
    pub async fn submit<T: Task>(&self, task: T) -> Result<()> {
        self.tx
            .send(Box::new(task))
            .await
            .map_err(|_| RegistryError::internal("pipeline is no longer accepting tasks"))?;
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Token that stops workers from picking up further tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Close the queue and wait for every worker to exit
    pub async fn close_and_join(self) -> PipelineReport {
        let Pipeline {
            tx,
            mut workers,
            counters,
            ..
        } = self;
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Pipeline worker exited abnormally: {}", e);
            }
        }

        let report = counters.report();
        info!(
            "Pipeline finished: {} submitted, {} succeeded, {} failed, {} timed out",
            report.submitted, report.succeeded, report.failed, report.timed_out
        );
        report
    }
}

async fn worker(
    id: usize,
    queue: Queue,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    task_timeout: Option<Duration>,
) {
    debug!("Worker {} started", id);
    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                task = rx.recv() => task,
            }
        };
        let Some(task) = next else {
            break;
        };
        run_task(task, &counters, task_timeout).await;
    }
    debug!("Worker {} exited", id);
}

async fn run_task(task: Box<dyn Task>, counters: &Counters, task_timeout: Option<Duration>) {
    let name = task.name();
    let mut handle = tokio::spawn(async move { task.run().await });

    let joined = match task_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!("{} timed out after {:?}", name, limit);
                counters.timed_out.fetch_add(1, Ordering::SeqCst);
                return;
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(())) => {
            debug!("{} succeeded", name);
            counters.succeeded.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Err(e)) => {
            warn!("{} failed: {}", name, e);
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            warn!("{} panicked: {}", name, e);
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
