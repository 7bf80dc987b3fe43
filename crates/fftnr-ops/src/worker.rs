//! Persistent worker threads.
//!
//! Workers are spawned once per denoiser and parked on a command channel
//! between runs. A run hands every worker the same pair of queues; each
//! worker claims batches from "waiting" until it is empty, then parks again.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, trace};

use crate::fft::BlockTransform;
use crate::freq::FrequencyBlock;
use crate::job::JobQueue;
use crate::OpsResult;

/// Queues for one run.
#[derive(Clone)]
struct Assignment {
    waiting: Arc<JobQueue>,
    finished: Arc<JobQueue>,
    batch_percent: usize,
}

enum Command {
    Process(Assignment),
    Exit,
}

struct Worker {
    sender: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

/// Fixed set of worker threads sharing one block transform.
pub struct WorkerPool {
    workers: Vec<Worker>,
    batch_percent: usize,
}

impl WorkerPool {
    /// Spawns `count` workers.
    ///
    /// Each worker allocates its own [`FrequencyBlock`] once and reuses it
    /// for every block it processes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OpsError::Thread`] if a thread cannot be spawned.
    pub fn new(count: usize, transform: Arc<BlockTransform>, batch_percent: usize) -> OpsResult<Self> {
        let count = count.max(1);
        let mut workers = Vec::with_capacity(count);
        for id in 0..count {
            let (sender, receiver) = unbounded();
            let transform = Arc::clone(&transform);
            let handle = thread::Builder::new()
                .name(format!("fftnr-worker-{id}"))
                .spawn(move || worker_loop(id, &transform, receiver))?;
            workers.push(Worker {
                sender,
                handle: Some(handle),
            });
        }

        info!(
            workers = count,
            block_width = transform.width(),
            block_height = transform.height(),
            batch_percent,
            "worker pool started"
        );
        Ok(Self {
            workers,
            batch_percent: batch_percent.clamp(1, 100),
        })
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// `true` if the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Share of the waiting queue a worker claims at once.
    pub fn batch_percent(&self) -> usize {
        self.batch_percent
    }

    /// Starts every worker on `waiting`, pushing results to `finished`.
    ///
    /// Returns immediately; workers go idle again once `waiting` is empty.
    pub fn dispatch(&self, waiting: &Arc<JobQueue>, finished: &Arc<JobQueue>) {
        let assignment = Assignment {
            waiting: Arc::clone(waiting),
            finished: Arc::clone(finished),
            batch_percent: self.batch_percent,
        };
        for (id, worker) in self.workers.iter().enumerate() {
            if worker.sender.send(Command::Process(assignment.clone())).is_err() {
                error!(worker = id, "worker channel closed");
            }
        }
        trace!(workers = self.workers.len(), jobs = waiting.jobs_left(), "dispatched");
    }

    /// Index of the first worker whose thread has exited, if any.
    pub fn lost_worker(&self) -> Option<usize> {
        self.workers
            .iter()
            .position(|w| w.handle.as_ref().is_none_or(JoinHandle::is_finished))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.sender.send(Command::Exit);
        }
        for (id, worker) in self.workers.iter_mut().enumerate() {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    error!(worker = id, "worker panicked");
                }
            }
        }
        debug!(workers = self.workers.len(), "worker pool stopped");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("batch_percent", &self.batch_percent)
            .finish()
    }
}

fn worker_loop(id: usize, transform: &BlockTransform, commands: Receiver<Command>) {
    let mut block = FrequencyBlock::new(transform);
    // a closed channel means the pool is gone
    while let Ok(command) = commands.recv() {
        match command {
            Command::Process(assignment) => {
                let done = process(id, transform, &mut block, &assignment);
                trace!(worker = id, jobs = done, "worker idle");
            }
            Command::Exit => break,
        }
    }
}

fn process(
    id: usize,
    transform: &BlockTransform,
    block: &mut FrequencyBlock,
    assignment: &Assignment,
) -> usize {
    let mut done = 0;
    loop {
        let batch = assignment.waiting.get_jobs_percent(assignment.batch_percent);
        if batch.is_empty() {
            return done;
        }
        for mut job in batch {
            if let Err(err) = job.run(transform, block) {
                error!(worker = id, plane = job.plane(), ?err, "block failed, passing through");
                job.mark_skipped();
            }
            assignment.finished.add_job(job);
            done += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ComplexFilter, GridSample};
    use crate::job::Job;
    use crate::params::{ColorMode, DenoiseParams};
    use crate::planar::PlanarImage;
    use crate::tiling::tile_plane;
    use crate::window::{WindowKind, WindowSet};
    use fftnr_math::KernelSet;
    use std::time::Duration;

    const B: usize = 16;
    const OV: usize = 4;

    fn queue_jobs(queue: &JobQueue, transform: &BlockTransform) -> usize {
        let image = Arc::new(PlanarImage::new(60, 44, OV, ColorMode::Rgb));
        let window = Arc::new(WindowSet::new(WindowKind::HalfCosine, B, B, OV).unwrap());
        let grid = Arc::new(GridSample::new(transform, &window).unwrap());
        let settings = DenoiseParams::default().plane_settings(0);
        let filter =
            Arc::new(ComplexFilter::build(B, B, &settings, &grid, KernelSet::detect()).unwrap());
        let (pw, ph) = image.padded_dimensions();
        let tiles = tile_plane(pw, ph, B, B, OV);
        let count = tiles.len() * 3;
        queue.add_jobs((0..3).flat_map(|plane| {
            let image = Arc::clone(&image);
            let filter = Arc::clone(&filter);
            let window = Arc::clone(&window);
            tiles.clone().into_iter().map(move |t| {
                Job::new(Arc::clone(&image), plane, t, Arc::clone(&filter), Arc::clone(&window))
            })
        }));
        count
    }

    fn collect(finished: &JobQueue, count: usize) -> Vec<Job> {
        (0..count)
            .map(|_| {
                finished
                    .wait_for_job_timeout(Duration::from_secs(10))
                    .expect("worker stalled")
            })
            .collect()
    }

    #[test]
    fn test_pool_processes_every_job() {
        let transform = Arc::new(BlockTransform::new(B, B).unwrap());
        let pool = WorkerPool::new(3, Arc::clone(&transform), 10).unwrap();
        assert_eq!(pool.len(), 3);

        let waiting = Arc::new(JobQueue::new());
        let finished = Arc::new(JobQueue::new());
        let count = queue_jobs(&waiting, &transform);
        pool.dispatch(&waiting, &finished);

        let done = collect(&finished, count);
        assert!(done.iter().all(|j| j.output().is_allocated()));
        assert!(waiting.is_empty());
        assert!(pool.lost_worker().is_none());
    }

    #[test]
    fn test_pool_is_reusable() {
        let transform = Arc::new(BlockTransform::new(B, B).unwrap());
        let pool = WorkerPool::new(2, Arc::clone(&transform), 50).unwrap();
        for _ in 0..3 {
            let waiting = Arc::new(JobQueue::new());
            let finished = Arc::new(JobQueue::new());
            let count = queue_jobs(&waiting, &transform);
            pool.dispatch(&waiting, &finished);
            assert_eq!(collect(&finished, count).len(), count);
        }
    }

    #[test]
    fn test_drop_joins_idle_workers() {
        let transform = Arc::new(BlockTransform::new(B, B).unwrap());
        let pool = WorkerPool::new(4, transform, 10).unwrap();
        drop(pool);
    }
}
